use clap::Parser;
use std::path::PathBuf;

/// Placement office sidecar. Reads one JSON request per line on stdin and
/// answers on stdout; logs go to stderr.
#[derive(Debug, Clone, Parser)]
#[command(name = "placementd", version)]
pub struct Config {
    /// Workspace directory to open at startup.
    #[arg(long, env = "PLACEMENTD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter directive; RUST_LOG takes precedence when set.
    #[arg(long, env = "PLACEMENTD_LOG", default_value = "info")]
    pub log_filter: String,
}
