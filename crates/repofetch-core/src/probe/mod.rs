//! Change detection with a metadata-only (HEAD) probe.
//!
//! The stored change-identifier is never sent to the server: echoing it back
//! (`If-None-Match`) would let the server use it as a tracking cookie across
//! fetches. Instead the probe fetches the current ETag unconditionally and
//! the comparison happens locally.

mod classify;

use url::Url;

use crate::error::FetchError;
use crate::redirect::RedirectFollower;
use crate::route::{Method, Response};

pub use classify::RemoteState;

/// Status and metadata learned from the probe. Lives for one `download()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: u32,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
}

impl ProbeResult {
    pub(crate) fn from_response(response: &Response) -> Self {
        Self {
            status: response.status,
            content_length: response.content_length(),
            etag: response.etag().map(str::to_string),
        }
    }
}

pub struct ChangeDetector<'f, 'a> {
    follower: &'f RedirectFollower<'a>,
}

impl<'f, 'a> ChangeDetector<'f, 'a> {
    pub fn new(follower: &'f RedirectFollower<'a>) -> Self {
        Self { follower }
    }

    /// Send the HEAD probe. The connection is released before this returns;
    /// the body fetch always opens a new one.
    pub fn probe(&self, url: &Url) -> Result<ProbeResult, FetchError> {
        let followed = self.follower.execute(url, Method::Head, &[], None)?;
        let result = ProbeResult::from_response(&followed.response);
        tracing::debug!(
            status = result.status,
            content_length = ?result.content_length,
            hops = followed.hops,
            "probe finished"
        );
        Ok(result)
    }

    /// Probe and classify against the caller's stored change-identifier.
    pub fn detect(&self, url: &Url, stored_tag: Option<&str>) -> Result<(ProbeResult, RemoteState), FetchError> {
        let probe = self.probe(url)?;
        let state = probe.classify(stored_tag);
        Ok((probe, state))
    }
}
