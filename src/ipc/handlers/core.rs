use crate::ipc::helpers::{get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::SqliteStore;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let stored_keys = state.store.as_ref().and_then(|s| s.key_count().ok());
    respond(
        &req.id,
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "storedKeys": stored_keys,
        })),
    )
}

/// Opens (creating if needed) the workspace database and makes it current.
pub fn open_workspace(state: &mut AppState, path: PathBuf) -> Result<(), HandlerErr> {
    // Release the previous handle first so the same file can be reopened.
    state.store = None;
    match SqliteStore::open(&path) {
        Ok(store) => {
            info!(workspace = %path.display(), "workspace opened");
            state.workspace = Some(path);
            state.store = Some(store);
            Ok(())
        }
        Err(e) => {
            warn!(workspace = %path.display(), error = %e, "failed to open workspace");
            Err(HandlerErr::new("db_open_failed", format!("{e:?}")))
        }
    }
}

fn workspace_select(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(get_required_str(&req.params, "path")?);
    open_workspace(state, path.clone())?;
    Ok(json!({ "workspacePath": path.to_string_lossy() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(respond(&req.id, workspace_select(state, req))),
        _ => None,
    }
}
