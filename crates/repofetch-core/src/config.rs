use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::route::{default_user_agent, Ipv4Subnet, LocalSubnet, NetworkEnv, NoSubnet, ProxyRoute};

/// Global configuration loaded from `~/.config/repofetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Connect/read timeout per connection attempt, in seconds.
    pub timeout_secs: u64,
    /// User-Agent sent on every request.
    pub user_agent: String,
    /// Send `Accept-Encoding: identity` (for servers/proxies with broken compression).
    #[serde(default)]
    pub identity_encoding: bool,
    /// Privacy route for non-swap traffic, e.g. "socks5h://127.0.0.1:9050". None = system route.
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Current LAN in CIDR form, e.g. "192.168.1.0/24". None = no swap peers.
    #[serde(default)]
    pub local_subnet: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: default_user_agent(),
            identity_encoding: false,
            proxy_url: None,
            local_subnet: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the shared network environment. Fails on an unparseable subnet.
    pub fn network_env(&self) -> Result<NetworkEnv> {
        let subnet: Arc<dyn LocalSubnet> = match self.local_subnet.as_deref() {
            Some(cidr) => Arc::new(
                cidr.parse::<Ipv4Subnet>()
                    .context("config: local_subnet")?,
            ),
            None => Arc::new(NoSubnet),
        };
        let privacy = Arc::new(ProxyRoute::new(self.proxy_url.clone()));
        Ok(NetworkEnv::new(subnet, privacy)
            .with_user_agent(self.user_agent.clone())
            .with_identity_encoding(self.identity_encoding))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("repofetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FetchConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
