use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::coerce;

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// An encoded still image, serialized as a `data:` URL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { mime_type: mime_type.into(), data }
    }

    /// Render as `data:<mime>;base64,<payload>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }

    /// Parse a base64 `data:` URL.
    pub fn from_data_url(url: &str) -> anyhow::Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| anyhow::anyhow!("not a data URL"))?;
        let (header, body) = rest
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("data URL has no payload separator"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| anyhow::anyhow!("data URL is not base64 encoded"))?;
        if mime_type.is_empty() {
            anyhow::bail!("data URL has no media type");
        }
        let data = STANDARD.decode(body.trim())?;
        Ok(Self::new(mime_type, data))
    }

    /// Base64 body without the `data:` prefix, as vision APIs expect for inline data.
    pub fn base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// Image bytes are never useful in debug output.
impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl TryFrom<String> for ImagePayload {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_url(&value)
    }
}

impl From<ImagePayload> for String {
    fn from(value: ImagePayload) -> Self {
        value.to_data_url()
    }
}

// ---------------------------------------------------------------------------
// Extraction output
// ---------------------------------------------------------------------------

/// Drug identity fields read off packaging. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    /// National Drug Code as printed, dashes preserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Fields the provider returned that we do not model.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

const BRAND_KEYS: &[&str] = &["brand_name", "brandName", "brand"];
const GENERIC_KEYS: &[&str] = &["generic_name", "genericName", "generic"];
const NDC_KEYS: &[&str] = &["ndc", "ndc_code", "ndcCode", "product_ndc"];
const FORM_KEYS: &[&str] = &["dosage_form", "dosageForm", "form"];
const STRENGTH_KEYS: &[&str] = &["strength"];
const ROUTE_KEYS: &[&str] = &["route"];
const MANUFACTURER_KEYS: &[&str] = &["manufacturer", "labeler"];
const INGREDIENT_KEYS: &[&str] = &["active_ingredients", "activeIngredients", "ingredients"];
const BARCODE_KEYS: &[&str] = &["barcode", "upc"];
const CONFIDENCE_KEYS: &[&str] = &["confidence"];

impl IdentityRecord {
    /// Coerce an untyped provider object into a typed record.
    ///
    /// Non-object values produce an empty record. Unrecognized keys are kept in `extra`.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };
        let pick = |keys: &[&str]| coerce::first(map, keys).and_then(coerce::text);

        let known: Vec<&str> = [
            BRAND_KEYS, GENERIC_KEYS, NDC_KEYS, FORM_KEYS, STRENGTH_KEYS, ROUTE_KEYS,
            MANUFACTURER_KEYS, INGREDIENT_KEYS, BARCODE_KEYS, CONFIDENCE_KEYS,
        ]
        .concat();
        let extra = map
            .iter()
            .filter(|(k, v)| !known.contains(&k.as_str()) && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            brand_name: pick(BRAND_KEYS),
            generic_name: pick(GENERIC_KEYS),
            ndc: pick(NDC_KEYS),
            dosage_form: pick(FORM_KEYS),
            strength: pick(STRENGTH_KEYS),
            route: pick(ROUTE_KEYS),
            manufacturer: pick(MANUFACTURER_KEYS),
            active_ingredients: coerce::first(map, INGREDIENT_KEYS).map(coerce::list).unwrap_or_default(),
            barcode: pick(BARCODE_KEYS),
            confidence: coerce::first(map, CONFIDENCE_KEYS).and_then(coerce::confidence),
            extra,
        }
    }

    /// True when the record carries a brand or generic name.
    pub fn has_name(&self) -> bool {
        self.brand_name.is_some() || self.generic_name.is_some()
    }

    /// Below-threshold confidence. Records without a score are taken at face value.
    pub fn is_low_confidence(&self, threshold: f64) -> bool {
        self.confidence.is_some_and(|c| c < threshold)
    }

    /// Best human-readable name for search fallbacks.
    pub fn display_name(&self) -> Option<String> {
        self.brand_name
            .clone()
            .or_else(|| self.generic_name.clone())
            .or_else(|| self.active_ingredients.first().cloned())
    }
}

/// Dosage/usage guidance returned directly by the model (guidance variant).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidanceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl GuidanceRecord {
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };
        let pick = |keys: &[&str]| coerce::first(map, keys).and_then(coerce::text);
        let warnings = match coerce::first(map, &["warnings", "warning"]) {
            Some(Value::Array(items)) => items.iter().filter_map(coerce::text).collect(),
            Some(other) => coerce::text(other).into_iter().collect(),
            None => Vec::new(),
        };
        Self {
            drug_name: pick(&["drug_name", "drugName", "name", "brand_name"]),
            active_ingredients: coerce::first(map, INGREDIENT_KEYS).map(coerce::list).unwrap_or_default(),
            purpose: pick(&["purpose", "indication", "uses"]),
            dosage: pick(&["dosage", "dose"]),
            usage: pick(&["usage", "directions", "how_to_use"]),
            warnings,
            confidence: coerce::first(map, CONFIDENCE_KEYS).and_then(coerce::confidence),
        }
    }

    pub fn is_low_confidence(&self, threshold: f64) -> bool {
        self.confidence.is_some_and(|c| c < threshold)
    }
}

// ---------------------------------------------------------------------------
// Lookup output
// ---------------------------------------------------------------------------

/// A label record normalized from the public drug database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_ingredients: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverse_reactions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_info: Option<String>,
}

/// Provenance link shown alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: name.into(), url: url.into() }
    }
}

/// Outcome of a lookup. Serialized with the proxy's `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum LookupResult {
    #[serde(rename = "OK")]
    Found { drug: DrugRecord, sources: Vec<Source> },
    #[serde(rename = "Not_Found")]
    NotFound,
}

impl LookupResult {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

// ---------------------------------------------------------------------------
// Finalization output
// ---------------------------------------------------------------------------

/// What a completed scan produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Identity extracted, then resolved against the label database.
    Label {
        identity: IdentityRecord,
        lookup: LookupResult,
        low_confidence: bool,
        fallback_links: Vec<Source>,
    },
    /// Guidance answered by the model directly.
    Guidance {
        guidance: GuidanceRecord,
        low_confidence: bool,
        fallback_links: Vec<Source>,
    },
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// The wizard progress as written to the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default = "Uuid::new_v4")]
    pub session_id: Uuid,
    pub step_index: usize,
    pub confirmed_images: Vec<ImagePayload>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_url_roundtrip() {
        let payload = ImagePayload::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0x00]);
        let url = payload.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(ImagePayload::from_data_url(&url).unwrap(), payload);
    }

    #[test]
    fn rejects_non_base64_data_url() {
        assert!(ImagePayload::from_data_url("data:text/plain,hello").is_err());
        assert!(ImagePayload::from_data_url("https://example.com/a.jpg").is_err());
    }

    #[test]
    fn debug_hides_bytes() {
        let payload = ImagePayload::new("image/jpeg", vec![1; 64]);
        assert_eq!(format!("{payload:?}"), "ImagePayload { mime_type: \"image/jpeg\", bytes: 64 }");
    }

    #[test]
    fn identity_from_loose_json() {
        let record = IdentityRecord::from_value(&json!({
            "brandName": "Tylenol",
            "generic_name": "acetaminophen",
            "ndc": "50580-488-10",
            "active_ingredients": "acetaminophen 500 mg",
            "manufacturer": "unknown",
            "confidence": 0.92,
            "lot": "AB123"
        }));
        assert_eq!(record.brand_name.as_deref(), Some("Tylenol"));
        assert_eq!(record.generic_name.as_deref(), Some("acetaminophen"));
        assert_eq!(record.ndc.as_deref(), Some("50580-488-10"));
        assert_eq!(record.active_ingredients, vec!["acetaminophen 500 mg"]);
        assert_eq!(record.manufacturer, None);
        assert_eq!(record.confidence, Some(0.92));
        assert_eq!(record.extra.get("lot"), Some(&json!("AB123")));
    }

    #[test]
    fn identity_from_non_object_is_empty() {
        assert_eq!(IdentityRecord::from_value(&json!([1, 2])), IdentityRecord::default());
    }

    #[test]
    fn low_confidence_requires_a_score() {
        let mut record = IdentityRecord::default();
        assert!(!record.is_low_confidence(0.4));
        record.confidence = Some(0.39);
        assert!(record.is_low_confidence(0.4));
        record.confidence = Some(0.4);
        assert!(!record.is_low_confidence(0.4));
    }

    #[test]
    fn lookup_result_wire_shape() {
        let found = LookupResult::Found {
            drug: DrugRecord { brand_name: Some("Acme".into()), ..Default::default() },
            sources: vec![Source::new("openFDA", "https://api.fda.gov")],
        };
        let value = serde_json::to_value(&found).unwrap();
        assert_eq!(value["status"], "OK");
        assert_eq!(value["drug"]["brand_name"], "Acme");
        assert_eq!(value["sources"][0]["name"], "openFDA");

        let missing = serde_json::to_value(&LookupResult::NotFound).unwrap();
        assert_eq!(missing, json!({ "status": "Not_Found" }));
    }

    #[test]
    fn persisted_session_layout_is_camel_case() {
        let session = PersistedSession {
            session_id: Uuid::nil(),
            step_index: 1,
            confirmed_images: vec![ImagePayload::new("image/jpeg", vec![1, 2, 3])],
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["stepIndex"], 1);
        assert!(value["confirmedImages"][0].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
        let back: PersistedSession = serde_json::from_value(value).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn guidance_from_loose_json() {
        let g = GuidanceRecord::from_value(&json!({
            "name": "Advil",
            "dosage": "1 tablet every 4 to 6 hours",
            "warnings": ["Stomach bleeding warning", "n/a"],
            "confidence": "70"
        }));
        assert_eq!(g.drug_name.as_deref(), Some("Advil"));
        assert_eq!(g.warnings, vec!["Stomach bleeding warning"]);
        assert_eq!(g.confidence, Some(0.7));
    }
}
