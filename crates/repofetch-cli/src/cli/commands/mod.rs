//! CLI command handlers, one file per command.

mod completions;
mod fetch;
mod route;

pub use completions::run_completions;
pub use fetch::{run_fetch, FetchArgs};
pub use route::run_route;
