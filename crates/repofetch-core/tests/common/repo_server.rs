//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one static body with an optional ETag. Supports HEAD, Range GET,
//! redirect chains, and absolute-form request targets (so it can stand in for
//! an HTTP proxy). Every request is recorded for assertions.
//!
//! Paths:
//! - `/r/{n}`: 302 to `/r/{n-1}`; `/r/0` serves the body.
//! - `/abs/{file}`: 301 to an absolute URL for `/{file}`.
//! - `/badloc`: 302 with an unparseable `Location`.
//! - `/away`: 302 to `ServerOptions::away_location`.
//! - anything else: the body.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub etag: Option<String>,
    /// Replace the HEAD response status (e.g. 405 for servers that block HEAD).
    pub head_status: Option<u32>,
    /// Replace the GET response status for the body path.
    pub get_status: Option<u32>,
    /// If false, GET ignores `Range` and always returns 200 with the full body.
    pub support_ranges: bool,
    /// Answer every `Range` GET with a 206 starting here instead of where asked.
    pub range_start_override: Option<u64>,
    /// Target of the `/away` redirect (any absolute URL).
    pub away_location: Option<String>,
    /// Send this many body bytes, then go silent for `STALL` before the rest.
    pub stall_after: Option<usize>,
}

/// How long a stalled body stays silent.
pub const STALL: Duration = Duration::from_secs(8);

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            etag: None,
            head_status: None,
            get_status: None,
            support_ranges: true,
            range_start_override: None,
            away_location: None,
            stall_after: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Raw request target: origin-form (`/x`) or absolute-form via a proxy.
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct RepoServer {
    pub port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl RepoServer {
    pub fn start(body: Vec<u8>) -> Self {
        Self::start_with_options(body, ServerOptions::default())
    }

    /// Runs in background threads until the process exits.
    pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let body = Arc::new(body);
        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let body = Arc::clone(&body);
                let opts = opts.clone();
                let log = Arc::clone(&log);
                thread::spawn(move || handle(stream, &body, &opts, port, &log));
            }
        });
        Self { port, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method.eq_ignore_ascii_case(method))
            .count()
    }
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: &ServerOptions,
    port: u16,
    log: &Mutex<Vec<RecordedRequest>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    log.lock().unwrap().push(request.clone());

    let path = origin_path(&request.target);
    let is_head = request.method.eq_ignore_ascii_case("HEAD");

    if let Some(rest) = path.strip_prefix("/r/") {
        let n: u32 = rest.parse().unwrap_or(0);
        if n > 0 {
            let location = format!("/r/{}", n - 1);
            return redirect(&mut stream, "302 Found", &location, is_head);
        }
    } else if let Some(file) = path.strip_prefix("/abs/") {
        let location = format!("http://127.0.0.1:{}/{}", port, file);
        return redirect(&mut stream, "301 Moved Permanently", &location, is_head);
    } else if path == "/badloc" {
        return redirect(&mut stream, "302 Found", "http://[::1", is_head);
    } else if path == "/away" {
        if let Some(location) = &opts.away_location {
            return redirect(&mut stream, "302 Found", location, is_head);
        }
    }

    let etag = opts
        .etag
        .as_ref()
        .map(|e| format!("ETag: {}\r\n", e))
        .unwrap_or_default();
    let total = body.len() as u64;

    if is_head {
        let response = match opts.head_status {
            Some(code) => format!(
                "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status_text(code)
            ),
            None => format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
                total, etag
            ),
        };
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if let Some(code) = opts.get_status {
        let page = b"nope";
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_text(code),
            page.len()
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(page);
        return;
    }

    let range = if opts.support_ranges {
        request
            .header("Range")
            .and_then(parse_range_start)
            .map(|asked| opts.range_start_override.unwrap_or(asked))
    } else {
        None
    };
    let (status, slice, content_range) = match range {
        Some(start) if start >= total => {
            let response = format!(
                "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                total
            );
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        Some(start) => (
            "206 Partial Content",
            &body[start as usize..],
            format!("Content-Range: bytes {}-{}/{}\r\n", start, total - 1, total),
        ),
        None => ("200 OK", body, String::new()),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        content_range,
        etag
    );
    let _ = stream.write_all(response.as_bytes());
    match opts.stall_after {
        Some(n) if n < slice.len() => {
            let _ = stream.write_all(&slice[..n]);
            let _ = stream.flush();
            thread::sleep(STALL);
            let _ = stream.write_all(&slice[n..]);
        }
        _ => {
            let _ = stream.write_all(slice);
        }
    }
}

fn redirect(stream: &mut TcpStream, status: &str, location: &str, is_head: bool) {
    let response = format!(
        "HTTP/1.1 {}\r\nLocation: {}\r\nContent-Length: 5\r\nConnection: close\r\n\r\n",
        status, location
    );
    let _ = stream.write_all(response.as_bytes());
    if !is_head {
        let _ = stream.write_all(b"moved");
    }
}

fn status_text(code: u32) -> String {
    let reason = match code {
        404 => "Not Found",
        405 => "Method Not Allowed",
        403 => "Forbidden",
        500 => "Internal Server Error",
        _ => "Status",
    };
    format!("{} {}", code, reason)
}

/// Reads until the blank line ending the request head.
fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    }
    let text = String::from_utf8_lossy(&data);
    let mut lines = text.split("\r\n");
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let target = first.next()?.to_string();
    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }
    Some(RecordedRequest {
        method,
        target,
        headers,
    })
}

/// `/path` from either `/path` or `http://host:port/path`.
fn origin_path(target: &str) -> String {
    match target.strip_prefix("http://") {
        Some(rest) => match rest.find('/') {
            Some(i) => rest[i..].to_string(),
            None => "/".to_string(),
        },
        None => target.to_string(),
    }
}

/// Start offset of `bytes=N-`.
fn parse_range_start(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes=")?;
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}
