use crate::backup;
use crate::exchange;
use crate::ipc::handlers::core::open_workspace;
use crate::ipc::helpers::{get_required_str, respond, store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn workspace_path(state: &AppState, req: &Request) -> Result<PathBuf, HandlerErr> {
    req.params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone())
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

fn backup_export(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let out_path = get_required_str(&req.params, "outPath")?;
    let workspace_path = workspace_path(state, req)?;

    if let Some(store) = state.store.as_ref() {
        store.checkpoint();
    }

    let export = backup::export_workspace_bundle(&workspace_path, &PathBuf::from(&out_path))
        .map_err(|e| {
            HandlerErr::new("io_failed", e.to_string()).with_details(json!({ "path": out_path }))
        })?;
    info!(path = %out_path, "workspace bundle exported");

    Ok(json!({
        "ok": true,
        "path": out_path,
        "bundleFormat": export.bundle_format,
        "entryCount": export.entry_count,
        "dbSha256": export.db_sha256,
    }))
}

fn backup_import(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let in_path = get_required_str(&req.params, "inPath")?;
    let workspace_path = workspace_path(state, req)?;

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(HandlerErr::new("not_found", "bundle file not found")
            .with_details(json!({ "path": in_path })));
    }

    // Drop open handle before replacing file.
    state.store = None;

    let import = backup::import_workspace_bundle(&src, &workspace_path).map_err(|e| {
        HandlerErr::new("bad_bundle", e.to_string()).with_details(json!({ "path": in_path }))
    });
    // Reopen whatever database is now in place, even after a failed import.
    open_workspace(state, workspace_path.clone())?;
    let import = import?;
    info!(path = %in_path, format = %import.bundle_format_detected, "workspace bundle imported");

    Ok(json!({
        "ok": true,
        "workspacePath": workspace_path.to_string_lossy(),
        "bundleFormatDetected": import.bundle_format_detected,
    }))
}

fn exchange_export(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let out_path = get_required_str(&req.params, "outPath")?;
    let store = store_mut(state)?;
    let counts = exchange::export_to_file(store, &PathBuf::from(&out_path)).map_err(|e| {
        HandlerErr::new("io_failed", format!("{e:#}")).with_details(json!({ "path": out_path }))
    })?;
    Ok(json!({ "ok": true, "path": out_path, "counts": counts }))
}

fn exchange_import(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let in_path = get_required_str(&req.params, "inPath")?;
    let store = store_mut(state)?;
    let doc = exchange::read_document(&PathBuf::from(&in_path)).map_err(|e| {
        HandlerErr::new("bad_bundle", format!("{e:#}")).with_details(json!({ "path": in_path }))
    })?;
    exchange::replace_all(store, &doc)?;
    info!(path = %in_path, "exchange document imported");
    Ok(json!({ "ok": true, "counts": doc.counts() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.exportWorkspaceBundle" => backup_export(state, req),
        "backup.importWorkspaceBundle" => backup_import(state, req),
        "exchange.exportJson" => exchange_export(state, req),
        "exchange.importJson" => exchange_import(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
