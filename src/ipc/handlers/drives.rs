use crate::ipc::helpers::{
    get_optional_str, get_record, get_required_str, respond, store_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Criteria;
use crate::placement;
use chrono::Utc;
use serde_json::json;

fn drives_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let company_id = get_optional_str(&req.params, "companyId")?;
    let store = store_mut(state)?;
    let drives = placement::list_drives(store, company_id.as_deref())?;
    Ok(json!({ "drives": drives }))
}

fn drives_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let company_id = get_required_str(&req.params, "companyId")?;
    let title = get_required_str(&req.params, "title")?;
    let role = get_optional_str(&req.params, "role")?;
    let criteria: Criteria = match req.params.get("criteria") {
        None => Criteria::default(),
        Some(v) if v.is_null() => Criteria::default(),
        Some(_) => get_record(&req.params, "criteria")?,
    };
    let store = store_mut(state)?;
    let drive = placement::create_drive(
        store,
        &company_id,
        &title,
        role.as_deref(),
        &criteria,
        Utc::now(),
    )?;
    Ok(json!({ "driveId": drive.id, "drive": drive }))
}

fn drives_update_criteria(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_required_str(&req.params, "driveId")?;
    let criteria: Criteria = get_record(&req.params, "criteria")?;
    let store = store_mut(state)?;
    let drive = placement::update_criteria(store, &drive_id, &criteria)?;
    Ok(json!({ "drive": drive }))
}

fn drives_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_required_str(&req.params, "driveId")?;
    let store = store_mut(state)?;
    let removed = placement::delete_drive(store, &drive_id)?;
    Ok(json!({ "ok": true, "removed": removed }))
}

fn drives_set_active(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_optional_str(&req.params, "driveId")?;
    let store = store_mut(state)?;
    let drive = placement::set_active_drive(store, drive_id.as_deref())?;
    Ok(json!({ "activeDriveId": drive.as_ref().map(|d| d.id.clone()), "drive": drive }))
}

fn drives_get_active(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let store = store_mut(state)?;
    let drive = placement::active_drive(store)?;
    Ok(json!({ "activeDriveId": drive.as_ref().map(|d| d.id.clone()), "drive": drive }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "drives.list" => drives_list(state, req),
        "drives.create" => drives_create(state, req),
        "drives.updateCriteria" => drives_update_criteria(state, req),
        "drives.delete" => drives_delete(state, req),
        "drives.setActive" => drives_set_active(state, req),
        "drives.getActive" => drives_get_active(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
