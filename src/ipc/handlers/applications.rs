use crate::ipc::helpers::{get_optional_str, get_required_str, respond, store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::ApplicationStatus;
use crate::placement;
use chrono::Utc;
use serde_json::json;

fn applications_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_required_str(&req.params, "driveId")?;
    let status = match get_optional_str(&req.params, "status")? {
        Some(s) => Some(ApplicationStatus::parse(&s).ok_or_else(|| {
            HandlerErr::bad_params(format!("unknown status: {}", s))
        })?),
        None => None,
    };
    let store = store_mut(state)?;
    let applications = placement::list_applications(store, &drive_id, status)?;
    Ok(json!({ "applications": applications }))
}

fn applications_create(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_required_str(&req.params, "driveId")?;
    let student_id = get_required_str(&req.params, "studentId")?;
    let store = store_mut(state)?;
    let app = placement::create_application(store, &drive_id, &student_id, Utc::now())?;
    Ok(json!({ "applicationId": app.id, "application": app }))
}

fn applications_reject(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let application_id = get_required_str(&req.params, "applicationId")?;
    let store = store_mut(state)?;
    let app = placement::reject_application(store, &application_id, Utc::now())?;
    Ok(json!({ "application": app }))
}

fn applications_delete(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let application_id = get_required_str(&req.params, "applicationId")?;
    let store = store_mut(state)?;
    let removed = placement::delete_application(store, &application_id)?;
    Ok(json!({ "ok": true, "removed": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "applications.list" => applications_list(state, req),
        "applications.create" => applications_create(state, req),
        "applications.reject" => applications_reject(state, req),
        "applications.delete" => applications_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
