use crate::ipc::helpers::{advisory_json, get_optional_str, respond, store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::placement::{self, Advisory};
use chrono::Utc;
use serde_json::json;

fn run_shortlist(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_optional_str(&req.params, "driveId")?;
    let store = store_mut(state)?;
    let out = placement::run_shortlist(store, drive_id.as_deref(), Utc::now())?;
    let run = out.run.as_ref();
    Ok(json!({
        "driveId": out.drive_id,
        "run": run,
        "evaluated": run.map_or(0, |r| r.evaluated),
        "shortlisted": run.map_or(0, |r| r.shortlisted),
        "ineligible": run.map_or(0, |r| r.ineligible),
        "skipped": run.map_or(0, |r| r.skipped),
        "unknownBranches": out.unknown_branches,
        "advisory": advisory_json(out.advisory),
    }))
}

fn auto_assign(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_optional_str(&req.params, "driveId")?;
    let store = store_mut(state)?;
    let out = placement::auto_assign(store, drive_id.as_deref())?;
    Ok(json!({
        "driveId": out.drive_id,
        "assignments": out.assignments,
        "assigned": out.assigned(),
        "shortlisted": out.shortlisted,
        "capacity": out.capacity,
        "summary": format!("assigned {}/{} shortlisted", out.assigned(), out.shortlisted),
        "advisory": advisory_json(out.advisory),
    }))
}

fn assignments(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_optional_str(&req.params, "driveId")?;
    let store = store_mut(state)?;
    let Some(drive) = placement::resolve_drive(store, drive_id.as_deref())? else {
        return Ok(json!({
            "driveId": null,
            "assignments": [],
            "advisory": advisory_json(Some(Advisory::NoActiveDrive)),
        }));
    };
    let rows = placement::assignment_rows(store, &drive.id)?;
    Ok(json!({ "driveId": drive.id, "assignments": rows, "advisory": null }))
}

fn runs(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_optional_str(&req.params, "driveId")?;
    let store = store_mut(state)?;
    let drive = placement::resolve_drive(store, drive_id.as_deref())?;
    let runs = placement::list_runs(store, drive.as_ref().map(|d| d.id.as_str()))?;
    Ok(json!({ "runs": runs }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "placements.runShortlist" => run_shortlist(state, req),
        "placements.autoAssign" => auto_assign(state, req),
        "placements.assignments" => assignments(state, req),
        "placements.runs" => runs(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
