#![allow(dead_code)]

pub mod repo_server;

use std::sync::Arc;

use repofetch_core::route::{Ipv4Subnet, NetworkEnv, NoSubnet, ProxyRoute};

/// Loopback counts as the LAN, so test URLs take the direct (swap) route and
/// never touch environment proxies.
pub fn lan_env() -> NetworkEnv {
    let subnet: Ipv4Subnet = "127.0.0.0/8".parse().unwrap();
    NetworkEnv::new(Arc::new(subnet), Arc::new(ProxyRoute::default()))
}

/// No LAN; everything goes through `proxy`.
pub fn proxied_env(proxy: &str) -> NetworkEnv {
    NetworkEnv::new(
        Arc::new(NoSubnet),
        Arc::new(ProxyRoute::new(Some(proxy.to_string()))),
    )
}

pub fn body(len: usize) -> Vec<u8> {
    (0u8..251).cycle().take(len).collect()
}
