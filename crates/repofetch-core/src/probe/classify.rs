//! Map a probe result onto the remote resource state.

use super::ProbeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    /// 200 and the server's ETag matches the stored one: nothing to fetch.
    Unchanged,
    /// 200 with a different (or no) ETag.
    Changed { content_length: Option<u64> },
    /// 404: the resource does not exist remotely.
    NotFound,
    /// Any other status, e.g. servers that refuse HEAD but allow GET.
    /// Size is treated as unknown and the fetch proceeds optimistically.
    Unknown,
}

impl RemoteState {
    /// Remote size usable for resume planning; only a 200 probe provides one.
    pub fn remote_size(&self) -> Option<u64> {
        match self {
            RemoteState::Changed { content_length } => *content_length,
            _ => None,
        }
    }
}

impl ProbeResult {
    pub fn classify(&self, stored_tag: Option<&str>) -> RemoteState {
        match self.status {
            200 => {
                let current = self.etag.as_deref().filter(|t| !t.is_empty());
                match (current, stored_tag) {
                    (Some(cur), Some(stored)) if cur == stored => RemoteState::Unchanged,
                    _ => RemoteState::Changed {
                        content_length: self.content_length,
                    },
                }
            }
            404 => RemoteState::NotFound,
            _ => RemoteState::Unknown,
        }
    }
}
