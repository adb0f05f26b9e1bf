//! HTTP server wiring for the lookup proxy.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use medlens_core::DrugLookup;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use crate::{health_api, lookup_api};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub lookup: Arc<dyn DrugLookup>,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(lookup: Arc<dyn DrugLookup>) -> Self {
        Self { lookup, started_at: Utc::now() }
    }
}

/// Routes only; non-POST requests to `/api/lookup` get 405 from the method router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/lookup", post(lookup_api::lookup))
        .route("/api/health", get(health_api::get_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Lookup proxy listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use medlens_core::{DrugRecord, IdentityRecord, LookupResult};
    use serde_json::Value;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Finds "Acme" for one NDC and records what it was asked.
    #[derive(Default)]
    struct StubLookup {
        seen: Mutex<Vec<(IdentityRecord, Option<String>)>>,
    }

    #[async_trait]
    impl DrugLookup for StubLookup {
        async fn lookup(&self, identity: &IdentityRecord, barcode: Option<&str>) -> LookupResult {
            self.seen.lock().unwrap().push((identity.clone(), barcode.map(str::to_string)));
            if identity.ndc.as_deref() == Some("12345-678-90") {
                LookupResult::Found {
                    drug: DrugRecord { brand_name: Some("Acme".into()), ..Default::default() },
                    sources: vec![],
                }
            } else {
                LookupResult::NotFound
            }
        }
    }

    fn app() -> (Router, Arc<StubLookup>) {
        let stub = Arc::new(StubLookup::default());
        (build_router(GatewayState::new(stub.clone())), stub)
    }

    async fn post_json(app: Router, body: &'static str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post("/api/lookup")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn found_lookup() {
        let (app, _) = app();
        let (status, body) = post_json(app, r#"{"identity":{"ndc":"12345-678-90"},"barcode":""}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["drug"]["brand_name"], "Acme");
    }

    #[tokio::test]
    async fn not_found_lookup() {
        let (app, stub) = app();
        let (status, body) = post_json(app, r#"{"identity":{},"barcode":"01234567890"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "status": "Not_Found" }));
        assert_eq!(stub.seen.lock().unwrap()[0].1.as_deref(), Some("01234567890"));
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let (app, stub) = app();
        let (status, body) = post_json(app, r#"{"identity": "#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("malformed JSON"));
        assert!(stub.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn numeric_barcode_is_accepted() {
        let (app, stub) = app();
        let (status, _) = post_json(app, r#"{"identity":{},"barcode":1234567890}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stub.seen.lock().unwrap()[0].1.as_deref(), Some("1234567890"));
    }

    #[tokio::test]
    async fn wrongly_typed_fields_are_invalid_body() {
        for body in [r#"{"barcode":true}"#, r#"{"identity":{},"barcode":["1"]}"#, r#""just text""#] {
            let (app, stub) = app();
            let (status, reply) = post_json(app, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(reply["error"].as_str().unwrap().starts_with("invalid request body"), "{body}");
            assert!(stub.seen.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn get_is_405() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/api/lookup").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["status"], "ok");
    }
}
