//! One configured, not-yet-sent HTTP exchange on a libcurl easy handle.

use std::cell::RefCell;

use curl::easy::Easy;
use url::Url;

use super::response::{HeaderCollector, Response};
use super::Transport;
use crate::control::CancelToken;
use crate::error::FetchError;
use crate::sink::{BodyHead, BodySink};

/// Owns its easy handle; performing consumes it, so the connection is
/// released on every path out of `perform`, errors included.
pub struct Connection {
    easy: Easy,
    url: Url,
    transport: Transport,
    cancel: Option<CancelToken>,
}

impl Connection {
    /// With `cancel`, the handle must have progress callbacks enabled.
    pub(crate) fn new(easy: Easy, url: Url, transport: Transport, cancel: Option<CancelToken>) -> Self {
        Self {
            easy,
            url,
            transport,
            cancel,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Send the request and read the response. Body bytes of 2xx responses go
    /// to `sink`; bodies of redirects and error pages are discarded.
    pub fn perform<'s>(
        mut self,
        mut sink: Option<&mut (dyn BodySink + 's)>,
    ) -> Result<Response, FetchError> {
        let collector = RefCell::new(HeaderCollector::default());
        let failure: RefCell<Option<FetchError>> = RefCell::new(None);
        let cancel = self.cancel.take();

        let performed = {
            let mut transfer = self.easy.transfer();
            transfer.header_function(|data| {
                collector.borrow_mut().push_line(data);
                true
            })?;
            transfer.write_function(|data| {
                let head = {
                    let c = collector.borrow();
                    BodyHead {
                        status: c.status(),
                        range_start: c.range_start(),
                    }
                };
                if !(200..300).contains(&head.status) {
                    return Ok(data.len());
                }
                let Some(s) = sink.as_deref_mut() else {
                    return Ok(data.len());
                };
                match s.write(head, data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        *failure.borrow_mut() = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })?;
            if let Some(token) = &cancel {
                // Runs about once a second even while the socket is idle.
                transfer.progress_function(|_, _, _, _| !token.is_cancelled())?;
            }
            transfer.perform()
        };

        if let Err(e) = performed {
            if let Some(cause) = failure.into_inner() {
                return Err(cause);
            }
            if e.is_aborted_by_callback() && cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
                return Err(FetchError::Interrupted);
            }
            return Err(FetchError::Connection(e));
        }

        let (mut status, headers) = collector.into_inner().into_parts();
        if status == 0 {
            status = self.easy.response_code()?;
        }
        Ok(Response::new(self.url, self.transport, status, headers))
    }
}
