//! `repofetch route <url>`: print the route decision without connecting.

use anyhow::{Context, Result};
use repofetch_core::config::FetchConfig;
use repofetch_core::route::{RouteResolver, Transport};
use url::Url;

pub fn run_route(cfg: &FetchConfig, url: &str) -> Result<()> {
    let env = cfg.network_env()?;
    let url = Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
    let resolver = RouteResolver::new(&env, None, cfg.timeout());
    let decision = resolver.decide(&url, &[]);
    match decision.transport {
        Transport::Direct => println!("direct (swap peer on local network)"),
        Transport::Proxied => println!("privacy route ({})", env.privacy_route().describe()),
    }
    for (name, value) in &decision.headers {
        println!("  {}: {}", name, value);
    }
    Ok(())
}
