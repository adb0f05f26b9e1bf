//! `POST /api/lookup`: resolve identity fields through the configured [`DrugLookup`].

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use medlens_core::IdentityRecord;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::server::GatewayState;

#[derive(Debug, Default, Deserialize)]
pub struct LookupRequest {
    #[serde(default)]
    pub identity: Option<Value>,
    /// Scanned digits; scanners often hand these over as a JSON number.
    #[serde(default)]
    pub barcode: Option<Value>,
}

impl LookupRequest {
    fn barcode(&self) -> Result<Option<String>, String> {
        match &self.barcode {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err("barcode must be a string or a number".into()),
        }
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// The body is parsed by hand so malformed JSON maps to 400 regardless of content type.
pub async fn lookup(State(state): State<GatewayState>, body: Bytes) -> Response {
    let request: LookupRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) if e.is_data() => {
            warn!(error = %e, "Rejected lookup request with wrong field types");
            return bad_request(format!("invalid request body: {e}"));
        }
        Err(e) => {
            warn!(error = %e, "Rejected malformed lookup request");
            return bad_request(format!("malformed JSON: {e}"));
        }
    };
    let barcode = match request.barcode() {
        Ok(b) => b,
        Err(message) => {
            warn!(%message, "Rejected lookup request");
            return bad_request(format!("invalid request body: {message}"));
        }
    };
    // Loose provider-style fields are accepted, same as extraction output.
    let identity = request
        .identity
        .as_ref()
        .map(IdentityRecord::from_value)
        .unwrap_or_default();
    debug!(has_ndc = identity.ndc.is_some(), has_barcode = barcode.is_some(), "Proxying lookup");

    let result = state.lookup.lookup(&identity, barcode.as_deref()).await;
    Json(result).into_response()
}
