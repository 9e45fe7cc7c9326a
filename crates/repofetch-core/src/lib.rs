//! Conditional, resumable, route-aware HTTP fetch engine.
//!
//! `download()` probes the remote resource with HEAD, skips the transfer when
//! the ETag matches the caller's stored one, reconciles a partial local file
//! with the remote size, and streams the body over either a direct LAN
//! connection (swap peers) or the privacy-preserving route.

pub mod config;
pub mod logging;

pub mod control;
pub mod downloader;
pub mod error;
pub mod probe;
pub mod redirect;
pub mod request;
pub mod resume;
pub mod route;
pub mod session;
pub mod sink;

pub use control::CancelToken;
pub use downloader::{downloader_for, Downloader, FileDownloader, HttpDownloader};
pub use error::FetchError;
pub use request::{Credentials, FetchRequest};
pub use route::{is_swap_url, NetworkEnv};
pub use session::{download, DownloadOutcome, DownloadSession, SessionState};
