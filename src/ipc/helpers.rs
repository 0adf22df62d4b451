use crate::ipc::error::{err, ok};
use crate::ipc::types::AppState;
use crate::placement::{Advisory, PlacementError};
use crate::store::{SqliteStore, StoreError};
use serde::de::DeserializeOwned;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        HandlerErr::new("store_failed", e.to_string())
    }
}

impl From<PlacementError> for HandlerErr {
    fn from(e: PlacementError) -> Self {
        match e {
            PlacementError::Store(inner) => inner.into(),
            PlacementError::NotFound { entity, id } => {
                HandlerErr::new("not_found", format!("{} not found", entity))
                    .with_details(json!({ "entity": entity, "id": id }))
            }
            PlacementError::Conflict(message) => HandlerErr::new("conflict", message),
            PlacementError::Invalid(message) => HandlerErr::bad_params(message),
        }
    }
}

pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

pub fn store_mut(state: &mut AppState) -> Result<&mut SqliteStore, HandlerErr> {
    state
        .store
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Missing, null and blank all read as `None`; any other non-string is
/// rejected.
pub fn get_optional_str(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<String>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    let Some(s) = v.as_str() else {
        return Err(HandlerErr::bad_params(format!("{} must be string or null", key)));
    };
    let t = s.trim();
    if t.is_empty() {
        return Ok(None);
    }
    Ok(Some(t.to_string()))
}

pub fn get_optional_f64(params: &serde_json::Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key))),
    }
}

/// Deserializes `params[key]` into a typed record.
pub fn get_record<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<T, HandlerErr> {
    let Some(v) = params.get(key).filter(|v| v.is_object()) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    serde_json::from_value(v.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e)))
}

pub fn advisory_json(advisory: Option<Advisory>) -> serde_json::Value {
    match advisory {
        Some(a) => json!({ "code": a.code(), "message": a.to_string() }),
        None => serde_json::Value::Null,
    }
}
