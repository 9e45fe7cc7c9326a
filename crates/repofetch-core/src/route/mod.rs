//! Per-URL route selection and request construction.
//!
//! A URL is "swap" when it points at a peer on the local subnet: port above
//! 1023, literal IPv4 host, host inside the current subnet. Swap URLs go
//! direct with keep-alive disabled, because the privacy route cannot reach
//! unrouted LAN addresses. Everything else goes through the `PrivacyRoute`.

mod connection;
mod privacy;
mod response;
mod subnet;

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use curl::easy::{Easy, List};
use url::{Host, Url};

use crate::control::CancelToken;
use crate::error::FetchError;
use crate::request::Credentials;

pub use connection::Connection;
pub use privacy::{PrivacyRoute, ProxyRoute};
pub use response::{ContentRange, Response};
pub use subnet::{Ipv4Subnet, LocalSubnet, NoSubnet, SubnetParseError};

/// Bytes per read from the socket; also the unit the streaming loop checks cancellation at.
pub const TRANSFER_BUFFER_SIZE: usize = 8192;

/// Ports at or below this need root, so a peer-local repo never uses them.
const MAX_PRIVILEGED_PORT: u16 = 1023;

pub fn default_user_agent() -> String {
    format!("repofetch {}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Direct connection to a peer on the local subnet.
    Direct,
    /// Through the privacy-preserving route.
    Proxied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Metadata only (no body).
    Head,
    Get,
}

/// Process-wide network configuration. Read-only while downloads run, so
/// concurrent sessions can share one `Arc<NetworkEnv>`.
#[derive(Clone)]
pub struct NetworkEnv {
    user_agent: String,
    identity_encoding: bool,
    subnet: Arc<dyn LocalSubnet>,
    privacy: Arc<dyn PrivacyRoute>,
}

impl NetworkEnv {
    pub fn new(subnet: Arc<dyn LocalSubnet>, privacy: Arc<dyn PrivacyRoute>) -> Self {
        Self {
            user_agent: default_user_agent(),
            identity_encoding: false,
            subnet,
            privacy,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Ask servers for uncompressed bodies (`Accept-Encoding: identity`).
    pub fn with_identity_encoding(mut self, enabled: bool) -> Self {
        self.identity_encoding = enabled;
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn identity_encoding(&self) -> bool {
        self.identity_encoding
    }

    pub fn privacy_route(&self) -> &dyn PrivacyRoute {
        self.privacy.as_ref()
    }

    pub fn is_swap_url(&self, url: &Url) -> bool {
        is_swap_url(url, self.subnet.as_ref())
    }
}

impl Default for NetworkEnv {
    fn default() -> Self {
        Self::new(Arc::new(NoSubnet), Arc::new(ProxyRoute::default()))
    }
}

impl std::fmt::Debug for NetworkEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkEnv")
            .field("user_agent", &self.user_agent)
            .field("identity_encoding", &self.identity_encoding)
            .field("privacy", &self.privacy.describe())
            .finish()
    }
}

/// True when `url` targets a peer-local repo: explicit port > 1023, literal
/// IPv4 host, host on the local subnet. Any one failing means not swap.
pub fn is_swap_url(url: &Url, subnet: &dyn LocalSubnet) -> bool {
    match url.port() {
        Some(port) if port > MAX_PRIVILEGED_PORT => {}
        _ => return false,
    }
    match url.host() {
        Some(Host::Ipv4(addr)) => subnet.contains(addr),
        _ => false,
    }
}

/// Outcome of routing one connection attempt.
#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub transport: Transport,
    pub url: Url,
    /// Request headers in send order.
    pub headers: Vec<(String, String)>,
}

impl RouteDecision {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Builds route decisions and opens configured connections for one request.
pub struct RouteResolver<'a> {
    env: &'a NetworkEnv,
    credentials: Option<&'a Credentials>,
    timeout: Duration,
    cancel: Option<CancelToken>,
}

impl<'a> RouteResolver<'a> {
    pub fn new(env: &'a NetworkEnv, credentials: Option<&'a Credentials>, timeout: Duration) -> Self {
        Self {
            env,
            credentials,
            timeout,
            cancel: None,
        }
    }

    /// Abort any connection this resolver opens as soon as `cancel` is set,
    /// including one stalled waiting for data.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Route `url` and build its headers. `extra` (e.g. `Range`) is appended last.
    pub fn decide(&self, url: &Url, extra: &[(String, String)]) -> RouteDecision {
        let transport = if self.env.is_swap_url(url) {
            Transport::Direct
        } else {
            Transport::Proxied
        };

        let mut headers = Vec::with_capacity(4 + extra.len());
        if transport == Transport::Direct {
            headers.push(("Connection".to_string(), "Close".to_string()));
        }
        headers.push(("User-Agent".to_string(), self.env.user_agent.clone()));
        if self.env.identity_encoding {
            headers.push(("Accept-Encoding".to_string(), "identity".to_string()));
        }
        if let Some(creds) = self.credentials {
            headers.push(("Authorization".to_string(), basic_auth(creds)));
        }
        headers.extend(extra.iter().cloned());

        RouteDecision {
            transport,
            url: url.clone(),
            headers,
        }
    }

    /// Configure a fresh easy handle for `decision`. Nothing is sent until
    /// `Connection::perform`; dropping the connection releases the handle.
    pub fn open(&self, decision: &RouteDecision, method: Method) -> Result<Connection, FetchError> {
        let mut easy = Easy::new();
        easy.url(decision.url.as_str())?;
        easy.follow_location(false)?;
        match method {
            Method::Head => easy.nobody(true)?,
            Method::Get => easy.get(true)?,
        }
        easy.buffer_size(TRANSFER_BUFFER_SIZE)?;
        easy.connect_timeout(self.timeout)?;
        // Read timeout: abort if nothing arrives for `timeout`.
        easy.low_speed_limit(1)?;
        easy.low_speed_time(self.timeout)?;

        match decision.transport {
            Transport::Direct => {
                // Empty string disables any proxy, including environment ones.
                easy.proxy("")?;
                easy.forbid_reuse(true)?;
            }
            Transport::Proxied => self.env.privacy.configure(&mut easy)?,
        }

        if self.cancel.is_some() {
            easy.progress(true)?;
        }

        let mut list = List::new();
        for (k, v) in &decision.headers {
            list.append(&format!("{}: {}", k, v))?;
        }
        easy.http_headers(list)?;

        tracing::debug!(
            url = %redacted(&decision.url),
            transport = ?decision.transport,
            method = ?method,
            "opening connection"
        );
        Ok(Connection::new(
            easy,
            decision.url.clone(),
            decision.transport,
            self.cancel.clone(),
        ))
    }
}

fn basic_auth(creds: &Credentials) -> String {
    let raw = format!("{}:{}", creds.username, creds.password);
    format!("Basic {}", STANDARD.encode(raw.as_bytes()))
}

/// URL with any userinfo stripped, for logs.
pub(crate) fn redacted(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.to_string()
}
