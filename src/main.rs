mod allocator;
mod backup;
mod config;
mod db;
mod eligibility;
mod exchange;
mod ipc;
mod model;
mod placement;
mod store;

use clap::Parser;
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries responses, so logs must stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn write_line(stdout: &mut io::Stdout, resp: &serde_json::Value) {
    let text = serde_json::to_string(resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
    let _ = writeln!(stdout, "{}", text);
    let _ = stdout.flush();
}

fn main() {
    let config = config::Config::parse();
    init_tracing(&config.log_filter);

    let mut state = ipc::AppState {
        workspace: None,
        store: None,
    };
    if let Some(path) = config.workspace.clone() {
        if let Err(e) = ipc::open_workspace(&mut state, path) {
            error!(code = e.code, message = %e.message, "startup workspace not opened");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "placementd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                write_line(
                    &mut stdout,
                    &json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() },
                    }),
                );
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        write_line(&mut stdout, &resp);
    }
    info!("stdin closed, shutting down");
}
