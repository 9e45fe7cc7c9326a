//! `repofetch fetch` – one conditional download.

use anyhow::{bail, Context, Result};
use repofetch_core::config::FetchConfig;
use repofetch_core::sink::ProgressListener;
use repofetch_core::{downloader_for, Credentials, DownloadOutcome, FetchRequest};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct FetchArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub cache_tag: Option<String>,
    pub timeout_secs: Option<u64>,
}

pub fn run_fetch(cfg: &FetchConfig, args: FetchArgs) -> Result<()> {
    let dest = match args.output {
        Some(p) => p,
        None => default_dest(&args.url)?,
    };
    let sidecar = etag_sidecar(&dest);
    let cache_tag = match args.cache_tag {
        Some(t) => Some(t),
        None => read_sidecar(&sidecar),
    };
    let credentials = Credentials::from_parts(args.username, args.password)?;
    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| cfg.timeout());

    let request = FetchRequest::new(&args.url, &dest)?
        .with_credentials(credentials)
        .with_cache_tag(cache_tag)
        .with_timeout(timeout);
    let env = Arc::new(cfg.network_env()?);
    let progress: Arc<dyn ProgressListener> = Arc::new(StderrProgress::new());

    let mut downloader = downloader_for(request, env, Some(progress));
    let outcome = downloader.download()?;
    report(&dest, &outcome);

    if outcome.not_found {
        bail!("{} not found", args.url);
    }
    if outcome.has_changed {
        write_sidecar(&sidecar, outcome.change_identifier.as_deref())?;
    }
    Ok(())
}

fn report(dest: &Path, outcome: &DownloadOutcome) {
    if outcome.not_found {
        return;
    }
    if !outcome.has_changed {
        println!("{}: unchanged", dest.display());
        return;
    }
    let size = outcome
        .total_size
        .map(|n| format!("{} bytes", n))
        .unwrap_or_else(|| "size unknown".to_string());
    println!(
        "{}: {} ({} transferred)",
        dest.display(),
        size,
        outcome.bytes_transferred
    );
}

/// Last non-empty path segment of `url`, or `index` for a bare host.
fn default_dest(url: &str) -> Result<PathBuf> {
    let parsed = Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
    let name = parsed
        .path_segments()
        .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
        .unwrap_or("index");
    Ok(PathBuf::from(name))
}

/// `<dest>.etag`.
fn etag_sidecar(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".etag");
    PathBuf::from(name)
}

fn read_sidecar(path: &Path) -> Option<String> {
    let tag = fs::read_to_string(path).ok()?;
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

/// Store the new ETag, or drop a stale one when the server sent none.
fn write_sidecar(path: &Path, tag: Option<&str>) -> Result<()> {
    match tag {
        Some(t) => fs::write(path, t).with_context(|| format!("write {}", path.display())),
        None => match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        },
    }
}

/// Throttled progress line on stderr.
struct StderrProgress {
    last_print: Mutex<Option<Instant>>,
}

impl StderrProgress {
    fn new() -> Self {
        Self {
            last_print: Mutex::new(None),
        }
    }
}

impl ProgressListener for StderrProgress {
    fn on_progress(&self, bytes_done: u64, total: Option<u64>) {
        let Ok(mut last) = self.last_print.lock() else {
            return;
        };
        let now = Instant::now();
        let finished = total.map(|t| bytes_done >= t).unwrap_or(false);
        if !finished && last.map(|l| now.duration_since(l) < PROGRESS_INTERVAL).unwrap_or(false) {
            return;
        }
        *last = Some(now);
        let done_mib = bytes_done as f64 / 1_048_576.0;
        match total {
            Some(t) if t > 0 => {
                let pct = bytes_done as f64 / t as f64 * 100.0;
                eprintln!(
                    "  {:.1} / {:.1} MiB ({:.0}%)",
                    done_mib,
                    t as f64 / 1_048_576.0,
                    pct
                );
            }
            _ => eprintln!("  {:.1} MiB", done_mib),
        }
    }
}
