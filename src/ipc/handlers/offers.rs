use crate::ipc::helpers::{
    get_optional_f64, get_optional_str, get_required_str, respond, store_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::OfferStatus;
use crate::placement;
use chrono::Utc;
use serde_json::json;

fn offers_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let drive_id = get_optional_str(&req.params, "driveId")?;
    let store = store_mut(state)?;
    let offers = placement::list_offers(store, drive_id.as_deref())?;
    Ok(json!({ "offers": offers }))
}

fn offers_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let application_id = get_required_str(&req.params, "applicationId")?;
    let ctc_lpa = get_optional_f64(&req.params, "ctcLpa")?;
    let store = store_mut(state)?;
    let offer = placement::create_offer(store, &application_id, ctc_lpa, Utc::now())?;
    Ok(json!({ "offerId": offer.id, "offer": offer }))
}

fn offers_set_status(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let offer_id = get_required_str(&req.params, "offerId")?;
    let raw = get_required_str(&req.params, "status")?;
    let status = OfferStatus::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown offer status: {}", raw)))?;
    let store = store_mut(state)?;
    let offer = placement::set_offer_status(store, &offer_id, status)?;
    Ok(json!({ "offer": offer }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "offers.list" => offers_list(state, req),
        "offers.create" => offers_create(state, req),
        "offers.setStatus" => offers_set_status(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
