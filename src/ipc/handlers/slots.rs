use crate::ipc::helpers::{get_required_str, respond, store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::placement;
use serde_json::json;

fn parse_capacity(params: &serde_json::Value) -> Result<u32, HandlerErr> {
    let Some(v) = params.get("capacity") else {
        return Err(HandlerErr::bad_params("missing capacity"));
    };
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| HandlerErr::bad_params("capacity must be a positive integer"))
}

fn slots_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_required_str(&req.params, "driveId")?;
    let store = store_mut(state)?;
    let slots = placement::list_slots(store, &drive_id)?;
    Ok(json!({ "slots": slots }))
}

fn slots_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_required_str(&req.params, "driveId")?;
    let start_time = get_required_str(&req.params, "startTime")?;
    let room = get_required_str(&req.params, "room")?;
    let capacity = parse_capacity(&req.params)?;
    let store = store_mut(state)?;
    let slot = placement::create_slot(store, &drive_id, &start_time, &room, capacity)?;
    Ok(json!({ "slotId": slot.id, "slot": slot }))
}

fn slots_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let slot_id = get_required_str(&req.params, "slotId")?;
    let store = store_mut(state)?;
    let removed = placement::delete_slot(store, &slot_id)?;
    Ok(json!({ "ok": true, "removedAssignments": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "slots.list" => slots_list(state, req),
        "slots.create" => slots_create(state, req),
        "slots.delete" => slots_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
