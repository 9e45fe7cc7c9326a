//! CLI for the repofetch fetch engine.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use repofetch_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_fetch, run_route, FetchArgs};

/// Top-level CLI for repofetch.
#[derive(Debug, Parser)]
#[command(name = "repofetch")]
#[command(about = "repofetch: conditional, resumable repository fetcher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL, skipping the transfer when the ETag is unchanged.
    Fetch {
        /// HTTP/HTTPS or file:// URL.
        url: String,

        /// Destination file (default: last path segment in the current directory).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Basic auth username (requires --password).
        #[arg(long, requires = "password")]
        username: Option<String>,

        /// Basic auth password (requires --username).
        #[arg(long, requires = "username")]
        password: Option<String>,

        /// ETag from a previous fetch. Defaults to the `<dest>.etag` sidecar.
        #[arg(long, value_name = "ETAG")]
        cache_tag: Option<String>,

        /// Override the configured per-connection timeout.
        #[arg(long, value_name = "N")]
        timeout_secs: Option<u64>,
    },

    /// Show which route a URL would take (direct swap peer or privacy route).
    Route {
        url: String,
    },

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch {
                url,
                output,
                username,
                password,
                cache_tag,
                timeout_secs,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let args = FetchArgs {
                    url,
                    output,
                    username,
                    password,
                    cache_tag,
                    timeout_secs,
                };
                run_fetch(&cfg, args)?;
            }
            CliCommand::Route { url } => {
                let cfg = config::load_or_init()?;
                run_route(&cfg, &url)?;
            }
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
