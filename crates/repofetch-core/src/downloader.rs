//! Transport-independent downloader capability.
//!
//! Callers hold a `Box<dyn Downloader>` from `downloader_for` and do not care
//! whether the bytes come over HTTP or from a local path.

use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;

use crate::control::CancelToken;
use crate::error::FetchError;
use crate::request::FetchRequest;
use crate::route::{NetworkEnv, TRANSFER_BUFFER_SIZE};
use crate::session::{DownloadOutcome, DownloadSession, SessionState};
use crate::sink::{BodyHead, BodySink, FileSink, ProgressListener};

pub trait Downloader {
    /// Bring the destination up to date with the source.
    fn download(&mut self) -> Result<DownloadOutcome, FetchError>;

    /// Full size of the last download, when known.
    fn total_download_size(&self) -> Option<u64>;

    /// Whether the last download made a new file available.
    fn has_changed(&self) -> bool;

    /// Abort a transfer in progress and refuse further transfers.
    fn close(&self);
}

/// HTTP(S) transport running the probe/resume/transfer protocol.
pub struct HttpDownloader {
    request: FetchRequest,
    env: Arc<NetworkEnv>,
    cancel: CancelToken,
    progress: Option<Arc<dyn ProgressListener>>,
    last: Option<DownloadOutcome>,
}

impl HttpDownloader {
    pub fn new(request: FetchRequest, env: Arc<NetworkEnv>) -> Self {
        Self {
            request,
            env,
            cancel: CancelToken::new(),
            progress: None,
            last: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressListener>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Handle another thread can use to cancel the transfer.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    pub fn last_outcome(&self) -> Option<&DownloadOutcome> {
        self.last.as_ref()
    }
}

impl Downloader for HttpDownloader {
    fn download(&mut self) -> Result<DownloadOutcome, FetchError> {
        self.last = None;
        let outcome = DownloadSession::new(
            &self.request,
            &self.env,
            &self.cancel,
            self.progress.as_deref(),
        )
        .run()?;
        self.last = Some(outcome.clone());
        Ok(outcome)
    }

    fn total_download_size(&self) -> Option<u64> {
        self.last.as_ref().and_then(|o| o.total_size)
    }

    fn has_changed(&self) -> bool {
        self.last.as_ref().map(|o| o.has_changed).unwrap_or(false)
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}

/// `file://` transport: copies a local file through the same sink.
pub struct FileDownloader {
    request: FetchRequest,
    cancel: CancelToken,
    progress: Option<Arc<dyn ProgressListener>>,
    last: Option<DownloadOutcome>,
}

impl FileDownloader {
    pub fn new(request: FetchRequest) -> Self {
        Self {
            request,
            cancel: CancelToken::new(),
            progress: None,
            last: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressListener>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn copy(&self) -> Result<DownloadOutcome, FetchError> {
        let url = self.request.url();
        let source = url
            .to_file_path()
            .map_err(|_| FetchError::malformed(url.as_str(), "not a local file path"))?;
        let mut input = match File::open(&source) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(DownloadOutcome {
                    has_changed: false,
                    not_found: true,
                    change_identifier: None,
                    total_size: None,
                    bytes_transferred: 0,
                    state: SessionState::NotFound,
                });
            }
            Err(e) => return Err(FetchError::Storage(e)),
        };
        let total = input.metadata()?.len();
        if self.cancel.is_cancelled() {
            return Err(FetchError::Interrupted);
        }

        let mut sink = FileSink::new(
            self.request.dest(),
            0,
            Some(total),
            &self.cancel,
            self.progress.as_deref(),
        );
        let mut buf = vec![0u8; TRANSFER_BUFFER_SIZE];
        loop {
            let n = input.read(&mut buf)?;
            if n == 0 {
                break;
            }
            sink.write(BodyHead::full(200), &buf[..n])?;
        }
        sink.finish(BodyHead::full(200))?;

        Ok(DownloadOutcome {
            has_changed: true,
            not_found: false,
            change_identifier: None,
            total_size: Some(total),
            bytes_transferred: sink.bytes_written(),
            state: SessionState::Done,
        })
    }
}

impl Downloader for FileDownloader {
    fn download(&mut self) -> Result<DownloadOutcome, FetchError> {
        self.last = None;
        let outcome = self.copy()?;
        self.last = Some(outcome.clone());
        Ok(outcome)
    }

    fn total_download_size(&self) -> Option<u64> {
        self.last.as_ref().and_then(|o| o.total_size)
    }

    fn has_changed(&self) -> bool {
        self.last.as_ref().map(|o| o.has_changed).unwrap_or(false)
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}

/// Pick the transport for `request` by URL scheme.
pub fn downloader_for(
    request: FetchRequest,
    env: Arc<NetworkEnv>,
    progress: Option<Arc<dyn ProgressListener>>,
) -> Box<dyn Downloader> {
    if request.url().scheme() == "file" {
        let d = FileDownloader::new(request);
        match progress {
            Some(p) => Box::new(d.with_progress(p)),
            None => Box::new(d),
        }
    } else {
        let d = HttpDownloader::new(request, env);
        match progress {
            Some(p) => Box::new(d.with_progress(p)),
            None => Box::new(d),
        }
    }
}
