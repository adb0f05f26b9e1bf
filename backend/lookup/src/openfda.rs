//! openFDA `drug/label` client.

use std::time::Duration;

use async_trait::async_trait;
use medlens_core::{DrugLookup, DrugRecord, IdentityRecord, LookupResult, MedLensError, Source};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::query::build_query;

pub const OPENFDA_BASE_URL: &str = "https://api.fda.gov";
const DAILYMED_SETID_URL: &str = "https://dailymed.nlm.nih.gov/dailymed/lookup.cfm?setid=";

pub struct OpenFdaClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenFdaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Request URL for a search expression. The API key is never part of it.
    pub fn search_url(&self, expression: &str) -> String {
        format!(
            "{}/drug/label.json?search={}&limit=1",
            self.base_url,
            urlencoding::encode(expression)
        )
    }

    async fn fetch(&self, url: &str) -> Result<Option<Value>, MedLensError> {
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key)]);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| MedLensError::LookupTransport(e.to_string()))?;
        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Ok(None),
            other => return Err(MedLensError::LookupTransport(format!("openFDA returned {other}"))),
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| MedLensError::LookupTransport(e.to_string()))?;
        Ok(body["results"].as_array().and_then(|r| r.first()).cloned())
    }
}

#[async_trait]
impl DrugLookup for OpenFdaClient {
    async fn lookup(&self, identity: &IdentityRecord, barcode: Option<&str>) -> LookupResult {
        let Some(query) = build_query(identity, barcode) else {
            info!("No identifying fields, skipping label lookup");
            return LookupResult::NotFound;
        };
        let expression = query.search_expression();
        let url = self.search_url(&expression);
        debug!(kind = query.kind(), search = %expression, "Querying openFDA");

        match self.fetch(&url).await {
            Ok(Some(label)) => {
                let drug = project_label(&label);
                let mut sources = vec![Source::new("openFDA", url)];
                if let Some(set_id) = label["set_id"].as_str() {
                    sources.push(Source::new("DailyMed", format!("{DAILYMED_SETID_URL}{set_id}")));
                }
                info!(kind = query.kind(), brand = drug.brand_name.as_deref().unwrap_or(""), "Label found");
                LookupResult::Found { drug, sources }
            }
            Ok(None) => {
                info!(kind = query.kind(), "No matching label");
                LookupResult::NotFound
            }
            Err(e) => {
                warn!(kind = query.kind(), error = %e, "Label lookup failed");
                LookupResult::NotFound
            }
        }
    }
}

/// First non-blank entry of an openFDA string array (or a bare string).
fn first_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Array(items) => items.iter().filter_map(Value::as_str).find(|s| !s.trim().is_empty())?,
        Value::String(s) => s.as_str(),
        _ => return None,
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// All non-blank entries joined.
fn joined_text(value: &Value) -> Option<String> {
    let parts: Vec<&str> = value
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn section(label: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| first_text(&label[*k]))
}

/// Normalize one openFDA label result.
pub fn project_label(label: &Value) -> DrugRecord {
    let openfda = &label["openfda"];
    DrugRecord {
        brand_name: first_text(&openfda["brand_name"]),
        generic_name: first_text(&openfda["generic_name"]),
        ndc: first_text(&openfda["product_ndc"]),
        route: joined_text(&openfda["route"]),
        dosage_form: first_text(&openfda["dosage_form"]),
        active_ingredients: section(label, &["active_ingredient"]).or_else(|| joined_text(&openfda["substance_name"])),
        indications: section(label, &["indications_and_usage", "purpose"]),
        dosage: section(label, &["dosage_and_administration"]),
        warnings: section(label, &["boxed_warning", "warnings", "warnings_and_cautions"]),
        adverse_reactions: section(label, &["adverse_reactions"]),
        patient_info: section(label, &["information_for_patients", "patient_medication_information", "spl_patient_package_insert"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::{extract::Query, http::StatusCode as HttpStatus, routing::get, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Seen {
        calls: Arc<AtomicUsize>,
        searches: Arc<Mutex<Vec<String>>>,
    }

    /// Fake openFDA: answers "Acme" for any search containing `hit`, 404 otherwise.
    async fn fake_openfda(hit: &'static str, status: u16) -> (String, Seen) {
        let seen = Seen::default();
        let state = seen.clone();
        let app = Router::new().route(
            "/drug/label.json",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let state = state.clone();
                async move {
                    state.calls.fetch_add(1, Ordering::SeqCst);
                    let search = params.get("search").cloned().unwrap_or_default();
                    state.searches.lock().unwrap().push(search.clone());
                    assert_eq!(params.get("limit").map(String::as_str), Some("1"));
                    if status != 200 {
                        return (HttpStatus::from_u16(status).unwrap(), Json(json!({ "error": "boom" })));
                    }
                    if !search.contains(hit) {
                        return (HttpStatus::NOT_FOUND, Json(json!({ "error": { "code": "NOT_FOUND" } })));
                    }
                    (
                        HttpStatus::OK,
                        Json(json!({ "results": [{
                            "set_id": "abc-123",
                            "indications_and_usage": ["Pain relief."],
                            "warnings": ["", "Do not exceed 6 tablets."],
                            "openfda": {
                                "brand_name": ["Acme"],
                                "generic_name": ["ACMEPROFEN"],
                                "product_ndc": ["12345-678"],
                                "package_ndc": ["12345-678-90"],
                                "route": ["ORAL"],
                                "substance_name": ["ACMEPROFEN", "CAFFEINE"]
                            }
                        }] })),
                    )
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}"), seen)
    }

    fn client(base: &str) -> OpenFdaClient {
        OpenFdaClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn ndc_found() {
        let (base, seen) = fake_openfda("openfda.package_ndc:\"12345-678-90\"", 200).await;
        let identity = IdentityRecord { ndc: Some("12345-678-90".into()), ..Default::default() };
        let result = client(&base).lookup(&identity, Some("")).await;

        let LookupResult::Found { drug, sources } = result else { panic!("expected Found") };
        assert_eq!(drug.brand_name.as_deref(), Some("Acme"));
        assert_eq!(drug.warnings.as_deref(), Some("Do not exceed 6 tablets."));
        assert_eq!(drug.active_ingredients.as_deref(), Some("ACMEPROFEN, CAFFEINE"));
        assert_eq!(sources[0].name, "openFDA");
        assert!(sources[0].url.starts_with(&base));
        assert_eq!(sources[1].url, format!("{DAILYMED_SETID_URL}abc-123"));
        assert_eq!(drug.ndc.as_deref(), Some("12345-678"));
        assert_eq!(seen.searches.lock().unwrap()[0], "openfda.package_ndc:\"12345-678-90\"");
    }

    #[tokio::test]
    async fn scanned_code_queries_product_ndc() {
        let (base, seen) = fake_openfda("01234567890", 200).await;
        let result = client(&base).lookup(&IdentityRecord::default(), Some("01234567890")).await;
        assert!(result.is_found());
        assert_eq!(seen.searches.lock().unwrap()[0], "openfda.product_ndc:\"01234567890\"");
    }

    #[tokio::test]
    async fn nothing_to_search_makes_no_call() {
        let (base, seen) = fake_openfda("", 200).await;
        let result = client(&base).lookup(&IdentityRecord::default(), Some("")).await;
        assert_eq!(result, LookupResult::NotFound);
        assert_eq!(seen.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_match_is_not_found() {
        let (base, seen) = fake_openfda("Acme", 200).await;
        let identity = IdentityRecord { brand_name: Some("Zzz".into()), ..Default::default() };
        assert_eq!(client(&base).lookup(&identity, None).await, LookupResult::NotFound);
        assert_eq!(seen.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_error_is_not_found() {
        let (base, _) = fake_openfda("Acme", 500).await;
        let identity = IdentityRecord { brand_name: Some("Acme".into()), ..Default::default() };
        assert_eq!(client(&base).lookup(&identity, None).await, LookupResult::NotFound);
    }

    #[tokio::test]
    async fn unreachable_is_not_found() {
        let identity = IdentityRecord { brand_name: Some("Acme".into()), ..Default::default() };
        assert_eq!(client("http://127.0.0.1:1").lookup(&identity, None).await, LookupResult::NotFound);
    }

    #[test]
    fn search_url_is_encoded() {
        let url = client("https://api.fda.gov/").search_url("openfda.brand_name:\"Advil\" AND x");
        assert_eq!(
            url,
            "https://api.fda.gov/drug/label.json?search=openfda.brand_name%3A%22Advil%22%20AND%20x&limit=1"
        );
    }

    #[test]
    fn projection_skips_blank_sections() {
        let drug = project_label(&json!({ "purpose": ["Antihistamine"], "openfda": { "route": ["ORAL", "TOPICAL"] } }));
        assert_eq!(drug.indications.as_deref(), Some("Antihistamine"));
        assert_eq!(drug.route.as_deref(), Some("ORAL, TOPICAL"));
        assert_eq!(drug.brand_name, None);
    }
}
