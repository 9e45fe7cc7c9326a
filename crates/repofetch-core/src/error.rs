//! Error type for a failed `download()` call.
//!
//! A 404 is not an error: it is reported through `DownloadOutcome::not_found`.
//! No variant is retried internally; `is_retryable` lets callers build their own
//! retry policy on top.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Source URL or a redirect `Location` could not be parsed.
    #[error("malformed URL {target:?}: {reason}")]
    MalformedTarget { target: String, reason: String },

    /// URL parsed but uses a scheme this engine does not fetch.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Only one half of a username/password pair was supplied.
    #[error("credentials must include both username and password")]
    InvalidCredentials,

    /// Socket/connect-level failure reported by libcurl (includes timeouts).
    #[error("connection failed: {0}")]
    Connection(#[from] curl::Error),

    /// The cancellation token was set while the body was streaming.
    #[error("transfer interrupted")]
    Interrupted,

    /// Terminal response status outside 2xx on the transfer request.
    #[error("HTTP {0}")]
    HttpStatus(u32),

    /// Still redirecting after the hop bound was reached. Not a transport
    /// failure: the last hop completed, and its 3xx is the terminal status the
    /// server gave. Reported as an error only because there is no body to keep.
    /// The probe treats the same condition as an inconclusive status instead.
    #[error("gave up after {hops} redirects (last status {status})")]
    TooManyRedirects { hops: u32, status: u32 },

    /// A `206` reply to a resume started somewhere other than the requested
    /// offset. The destination is left as it was.
    #[error("server sent bytes from {got}, resume asked for {requested}")]
    RangeMismatch { requested: u64, got: u64 },

    /// Destination file could not be read, created, or written.
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
}

impl FetchError {
    pub(crate) fn malformed(target: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::MalformedTarget {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// True for transient network failures and throttling statuses a caller may retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Connection(e) => {
                e.is_operation_timedout()
                    || e.is_couldnt_connect()
                    || e.is_couldnt_resolve_host()
                    || e.is_couldnt_resolve_proxy()
                    || e.is_read_error()
                    || e.is_recv_error()
                    || e.is_send_error()
                    || e.is_got_nothing()
                    || e.is_partial_file()
            }
            FetchError::HttpStatus(code) => matches!(code, 429 | 500..=599),
            _ => false,
        }
    }
}
