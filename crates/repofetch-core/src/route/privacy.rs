//! Privacy-preserving route for all non-swap traffic.

use curl::easy::Easy;

/// Configures an easy handle so its connection goes through the
/// privacy-preserving route (e.g. a Tor SOCKS proxy).
pub trait PrivacyRoute: Send + Sync {
    fn configure(&self, easy: &mut Easy) -> Result<(), curl::Error>;

    /// Short label for logs; must not include credentials.
    fn describe(&self) -> String;
}

/// Routes through a proxy URL (`socks5h://127.0.0.1:9050`, `http://proxy:8118`).
/// With no proxy the handle stays on the system route.
#[derive(Debug, Clone, Default)]
pub struct ProxyRoute {
    proxy: Option<String>,
}

impl ProxyRoute {
    pub fn new(proxy: Option<String>) -> Self {
        Self {
            proxy: proxy.filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }
}

impl PrivacyRoute for ProxyRoute {
    fn configure(&self, easy: &mut Easy) -> Result<(), curl::Error> {
        if let Some(proxy) = &self.proxy {
            easy.proxy(proxy)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.proxy {
            Some(p) => match url::Url::parse(p) {
                Ok(u) => format!(
                    "proxy {}://{}:{}",
                    u.scheme(),
                    u.host_str().unwrap_or(""),
                    u.port_or_known_default().unwrap_or(0)
                ),
                Err(_) => "proxy".to_string(),
            },
            None => "system".to_string(),
        }
    }
}
