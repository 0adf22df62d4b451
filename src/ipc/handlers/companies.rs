use crate::ipc::error::ok;
use crate::ipc::helpers::{get_optional_str, get_required_str, respond, store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::placement;
use chrono::Utc;
use serde_json::json;

fn handle_companies_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return ok(&req.id, json!({ "companies": [] }));
    };
    let result = placement::list_companies(store)
        .map(|companies| json!({ "companies": companies }))
        .map_err(HandlerErr::from);
    respond(&req.id, result)
}

fn companies_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(&req.params, "name")?;
    let sector = get_optional_str(&req.params, "sector")?;
    let store = store_mut(state)?;
    let company = placement::create_company(store, &name, sector.as_deref(), Utc::now())?;
    Ok(json!({ "companyId": company.id, "company": company }))
}

fn companies_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let company_id = get_required_str(&req.params, "companyId")?;
    let store = store_mut(state)?;
    let removed = placement::delete_company(store, &company_id)?;
    Ok(json!({ "ok": true, "removed": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "companies.list" => Some(handle_companies_list(state, req)),
        "companies.create" => Some(respond(&req.id, companies_create(state, req))),
        "companies.delete" => Some(respond(&req.id, companies_delete(state, req))),
        _ => None,
    }
}
