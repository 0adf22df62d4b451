use crate::ipc::helpers::{get_optional_str, get_required_str, respond, store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::placement;
use serde_json::json;

fn students_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let branch = get_optional_str(&req.params, "branch")?;
    let store = store_mut(state)?;
    let students = placement::list_students(store, branch.as_deref())?;
    Ok(json!({ "students": students }))
}

fn students_upsert(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    // The id may be omitted for a new student.
    let mut raw = req
        .params
        .get("student")
        .filter(|v| v.is_object())
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing student"))?;
    if raw.get("id").map_or(true, |v| v.is_null()) {
        raw["id"] = json!("");
    }
    let student: Student = serde_json::from_value(raw)
        .map_err(|e| HandlerErr::bad_params(format!("invalid student: {}", e)))?;
    let store = store_mut(state)?;
    let saved = placement::upsert_student(store, student)?;
    Ok(json!({ "studentId": saved.id, "student": saved }))
}

fn students_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(&req.params, "studentId")?;
    let store = store_mut(state)?;
    let removed = placement::delete_student(store, &student_id)?;
    Ok(json!({ "ok": true, "removed": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state, req),
        "students.upsert" => students_upsert(state, req),
        "students.delete" => students_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
