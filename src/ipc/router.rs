use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use tracing::{debug, warn};

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    debug!(id = %req.id, method = %req.method, "request");
    let chain: [fn(&mut AppState, &Request) -> Option<serde_json::Value>; 9] = [
        handlers::core::try_handle,
        handlers::companies::try_handle,
        handlers::drives::try_handle,
        handlers::students::try_handle,
        handlers::applications::try_handle,
        handlers::slots::try_handle,
        handlers::placements::try_handle,
        handlers::offers::try_handle,
        handlers::backup_exchange::try_handle,
    ];
    for handle in chain {
        if let Some(resp) = handle(state, &req) {
            return resp;
        }
    }

    warn!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
