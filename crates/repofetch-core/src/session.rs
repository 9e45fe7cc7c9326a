//! One `download()` call: probe, decide, transfer.
//!
//! ```text
//! Init -> Probing -> Cached                       (ETag unchanged)
//!                 -> NotFound                     (404)
//!                 -> Complete                     (local length == remote)
//!                 -> Resuming | FreshFetching -> Transferring -> Done
//!                                                             -> Interrupted | Failed
//! ```
//!
//! A session is created fresh per call and owns all per-call state, so
//! concurrent sessions on different destinations share nothing mutable.

use crate::control::CancelToken;
use crate::error::FetchError;
use crate::probe::{ChangeDetector, RemoteState};
use crate::redirect::RedirectFollower;
use crate::request::FetchRequest;
use crate::resume::{ResumeDecision, ResumePlanner};
use crate::route::{redacted, Method, NetworkEnv, RouteResolver};
use crate::sink::{BodyHead, BodySink, FileSink, ProgressListener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Probing,
    /// Remote ETag equals the stored one; nothing transferred.
    Cached,
    /// 404 from the probe or the transfer.
    NotFound,
    /// Local file already has the remote length; nothing transferred.
    Complete,
    Resuming { offset: u64 },
    FreshFetching,
    Transferring,
    Done,
    Interrupted,
    Failed,
}

/// What the caller learns from one `download()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// A new file is available at the destination.
    pub has_changed: bool,
    /// The resource does not exist remotely.
    pub not_found: bool,
    /// ETag to persist and pass back as the cache tag next time.
    pub change_identifier: Option<String>,
    /// Full resource length, when known.
    pub total_size: Option<u64>,
    /// Body bytes written by this call.
    pub bytes_transferred: u64,
    /// Terminal state reached.
    pub state: SessionState,
}

impl DownloadOutcome {
    fn untransferred(state: SessionState) -> Self {
        Self {
            has_changed: false,
            not_found: state == SessionState::NotFound,
            change_identifier: None,
            total_size: None,
            bytes_transferred: 0,
            state,
        }
    }
}

pub struct DownloadSession<'a> {
    request: &'a FetchRequest,
    follower: RedirectFollower<'a>,
    cancel: &'a CancelToken,
    progress: Option<&'a dyn ProgressListener>,
    state: SessionState,
}

impl<'a> DownloadSession<'a> {
    pub fn new(
        request: &'a FetchRequest,
        env: &'a NetworkEnv,
        cancel: &'a CancelToken,
        progress: Option<&'a dyn ProgressListener>,
    ) -> Self {
        let resolver = RouteResolver::new(env, request.credentials(), request.timeout())
            .with_cancel(cancel.clone());
        Self {
            request,
            follower: RedirectFollower::new(resolver),
            cancel,
            progress,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the whole protocol. Every connection opened on the way is released
    /// before this returns, on success and on error.
    pub fn run(&mut self) -> Result<DownloadOutcome, FetchError> {
        let result = self.run_inner();
        if let Err(e) = &result {
            let state = match e {
                FetchError::Interrupted => SessionState::Interrupted,
                _ => SessionState::Failed,
            };
            self.transition(state);
        }
        result
    }

    fn run_inner(&mut self) -> Result<DownloadOutcome, FetchError> {
        let request = self.request;
        let url = request.url();
        self.transition(SessionState::Probing);

        let detector = ChangeDetector::new(&self.follower);
        let (probe, remote) = detector.detect(url, request.cache_tag())?;

        match remote {
            RemoteState::Unchanged => {
                tracing::info!(url = %redacted(url), "unchanged since last fetch, not downloading");
                self.transition(SessionState::Cached);
                return Ok(DownloadOutcome {
                    change_identifier: probe.etag,
                    total_size: probe.content_length,
                    ..DownloadOutcome::untransferred(SessionState::Cached)
                });
            }
            RemoteState::NotFound => {
                tracing::info!(url = %redacted(url), "not found on server");
                self.transition(SessionState::NotFound);
                return Ok(DownloadOutcome::untransferred(SessionState::NotFound));
            }
            RemoteState::Unknown => {
                tracing::warn!(
                    url = %redacted(url),
                    status = probe.status,
                    "HEAD check inconclusive; fetching anyway"
                );
            }
            RemoteState::Changed { .. } => {}
        }

        let remote_size = remote.remote_size();
        let decision = ResumePlanner::plan(request.dest(), remote_size)?;
        match decision {
            ResumeDecision::AlreadyComplete => {
                tracing::info!(path = %request.dest().display(), "already complete");
                self.transition(SessionState::Complete);
                return Ok(DownloadOutcome {
                    has_changed: matches!(remote, RemoteState::Changed { .. }),
                    change_identifier: probe.etag,
                    total_size: remote_size,
                    ..DownloadOutcome::untransferred(SessionState::Complete)
                });
            }
            ResumeDecision::Resume(offset) => self.transition(SessionState::Resuming { offset }),
            ResumeDecision::Restart | ResumeDecision::ProceedFresh => {
                self.transition(SessionState::FreshFetching)
            }
        }

        self.transfer(decision, remote_size)
    }

    fn transfer(&mut self, decision: ResumeDecision, remote_size: Option<u64>) -> Result<DownloadOutcome, FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Interrupted);
        }
        let request = self.request;
        let url = request.url();
        let dest = request.dest();
        let offset = decision.offset();
        let extra: Vec<(String, String)> = offset
            .map(|o| vec![("Range".to_string(), format!("bytes={}-", o))])
            .unwrap_or_default();
        tracing::debug!(
            url = %redacted(url),
            resumable = offset.is_some(),
            "downloading"
        );

        self.transition(SessionState::Transferring);
        let mut sink = FileSink::new(dest, offset.unwrap_or(0), remote_size, self.cancel, self.progress);
        let followed = self
            .follower
            .execute(url, Method::Get, &extra, Some(&mut sink as &mut dyn BodySink))?;
        let response = &followed.response;

        if response.status == 404 {
            tracing::info!(url = %redacted(url), "not found on server");
            self.transition(SessionState::NotFound);
            return Ok(DownloadOutcome::untransferred(SessionState::NotFound));
        }
        if followed.exhausted() {
            return Err(FetchError::TooManyRedirects {
                hops: followed.hops,
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(FetchError::HttpStatus(response.status));
        }
        let content_range = response.content_range();
        sink.finish(BodyHead {
            status: response.status,
            range_start: content_range.map(|r| r.start),
        })?;

        let total_size = content_range
            .and_then(|r| r.total)
            .or_else(|| response.content_length().map(|len| sink.base_offset() + len))
            .or(remote_size);
        let outcome = DownloadOutcome {
            has_changed: true,
            not_found: false,
            change_identifier: response.etag().map(str::to_string),
            total_size,
            bytes_transferred: sink.bytes_written(),
            state: SessionState::Done,
        };
        self.transition(SessionState::Done);
        Ok(outcome)
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }
}

/// Convenience: run one session to completion.
pub fn download(
    request: &FetchRequest,
    env: &NetworkEnv,
    cancel: &CancelToken,
    progress: Option<&dyn ProgressListener>,
) -> Result<DownloadOutcome, FetchError> {
    DownloadSession::new(request, env, cancel, progress).run()
}
