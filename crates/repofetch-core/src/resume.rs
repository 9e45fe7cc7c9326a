//! Reconcile a possibly-partial destination file with the remote size.
//!
//! Only the length is compared; contents are never inspected.

use std::io;
use std::path::Path;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// Local file is longer than the remote resource: it was deleted, fetch from scratch.
    Restart,
    /// Request the remaining bytes starting at this offset.
    Resume(u64),
    /// Local file already has the full remote length.
    AlreadyComplete,
    /// Nothing on disk worth keeping; plain fetch.
    ProceedFresh,
}

impl ResumeDecision {
    /// `Range` start for the transfer, if any.
    pub fn offset(&self) -> Option<u64> {
        match self {
            ResumeDecision::Resume(off) => Some(*off),
            _ => None,
        }
    }
}

/// Pure decision. `local` is the destination length, `None` if it does not
/// exist; `remote` is `None` when the size is unknown.
pub fn decide(local: Option<u64>, remote: Option<u64>) -> ResumeDecision {
    let len = local.unwrap_or(0);
    match remote {
        Some(r) if len > r => ResumeDecision::Restart,
        Some(r) if local.is_some() && len == r => ResumeDecision::AlreadyComplete,
        _ if len > 0 => ResumeDecision::Resume(len),
        _ => ResumeDecision::ProceedFresh,
    }
}

pub struct ResumePlanner;

impl ResumePlanner {
    /// Inspect `dest`, decide, and delete a stale file on `Restart`.
    pub fn plan(dest: &Path, remote: Option<u64>) -> Result<ResumeDecision, FetchError> {
        let local = local_len(dest)?;
        let decision = decide(local, remote);
        if decision == ResumeDecision::Restart {
            tracing::debug!(
                path = %dest.display(),
                local = ?local,
                remote = ?remote,
                "local file longer than remote; discarding"
            );
            if let Err(e) = std::fs::remove_file(dest) {
                if e.kind() != io::ErrorKind::NotFound {
                    // The fresh fetch truncates anyway.
                    tracing::warn!(path = %dest.display(), "failed to remove stale file: {}", e);
                }
            }
        }
        Ok(decision)
    }
}

fn local_len(dest: &Path) -> Result<Option<u64>, FetchError> {
    match std::fs::metadata(dest) {
        Ok(m) if m.is_file() => Ok(Some(m.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FetchError::Storage(e)),
    }
}
