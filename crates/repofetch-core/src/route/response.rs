//! Status and headers of one HTTP response (one hop).

use url::Url;

use super::Transport;

#[derive(Debug, Clone)]
pub struct Response {
    /// URL this hop was requested from.
    pub url: Url,
    pub transport: Transport,
    pub status: u32,
    headers: Vec<(String, String)>,
}

impl Response {
    pub(crate) fn new(url: Url, transport: Transport, status: u32, headers: Vec<(String, String)>) -> Self {
        Self {
            url,
            transport,
            status,
            headers,
        }
    }

    /// First header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length")
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Raw `ETag` value, quotes included; `None` when absent or blank.
    pub fn etag(&self) -> Option<&str> {
        self.header("ETag").filter(|v| !v.is_empty())
    }

    pub fn location(&self) -> Option<&str> {
        self.header("Location").filter(|v| !v.is_empty())
    }

    /// Parsed `Content-Range` of a partial response.
    pub fn content_range(&self) -> Option<ContentRange> {
        self.header("Content-Range").and_then(ContentRange::parse)
    }
}

/// `Content-Range: bytes <start>-<end>/<len|*>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    /// Full resource length; `None` for `*`.
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes")?.trim_start();
        let (range, total) = rest.split_once('/')?;
        let (start, end) = range.split_once('-')?;
        let start: u64 = start.trim().parse().ok()?;
        let end: u64 = end.trim().parse().ok()?;
        if end < start {
            return None;
        }
        let total = match total.trim() {
            "*" => None,
            t => Some(t.parse().ok()?),
        };
        Some(Self { start, end, total })
    }
}

/// Incrementally collects header lines of the current response. A new status
/// line (e.g. after `100 Continue` or a proxy `CONNECT`) starts over.
#[derive(Debug, Default)]
pub(crate) struct HeaderCollector {
    status: u32,
    headers: Vec<(String, String)>,
}

impl HeaderCollector {
    pub(crate) fn push_line(&mut self, raw: &[u8]) {
        let line = match std::str::from_utf8(raw) {
            Ok(s) => s.trim(),
            Err(_) => return,
        };
        if line.is_empty() {
            return;
        }
        if line.starts_with("HTTP/") {
            self.status = parse_status_line(line).unwrap_or(0);
            self.headers.clear();
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            self.headers
                .push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    pub(crate) fn status(&self) -> u32 {
        self.status
    }

    /// First byte offset of the body so far, when the server sent `Content-Range`.
    pub(crate) fn range_start(&self) -> Option<u64> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Range"))
            .and_then(|(_, v)| ContentRange::parse(v))
            .map(|r| r.start)
    }

    pub(crate) fn into_parts(self) -> (u32, Vec<(String, String)>) {
        (self.status, self.headers)
    }
}

fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}
