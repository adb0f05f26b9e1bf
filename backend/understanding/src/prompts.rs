//! Instruction templates sent with the capture set.
//!
//! The field names requested here are the contract with the extraction
//! provider; `IdentityRecord::from_value` tolerates common variations.

/// Identity extraction (label-lookup variant).
pub const IDENTITY_TEMPLATE: &str = r#"You are reading photographs of a single medicine package, taken from different sides.
Read only what is printed on the packaging. Do not guess values that are not visible.
Answer in {language} with one JSON object and nothing else, using exactly these keys:
{
  "brand_name": string or null,
  "generic_name": string or null,
  "ndc": string or null (National Drug Code exactly as printed, with dashes),
  "dosage_form": string or null (e.g. "TABLET, FILM COATED"),
  "strength": string or null,
  "route": string or null,
  "manufacturer": string or null,
  "active_ingredients": array of strings,
  "barcode": string or null (digits under the barcode, if legible),
  "confidence": number between 0 and 1 describing how sure you are of the identification
}"#;

/// Direct dosage/usage guidance (guidance variant).
pub const GUIDANCE_TEMPLATE: &str = r#"You are reading photographs of a single medicine package, taken from different sides.
Using the printed label first and general pharmacological knowledge second, explain how this medicine is used.
Answer in {language} with one JSON object and nothing else, using exactly these keys:
{
  "drug_name": string or null,
  "active_ingredients": array of strings,
  "purpose": string or null,
  "dosage": string or null (typical adult dosage as labeled),
  "usage": string or null (how to take it),
  "warnings": array of strings,
  "confidence": number between 0 and 1 describing how sure you are of the identification
}
This is general information, not medical advice."#;

/// Fill template placeholders.
pub fn render(template: &str, language: &str) -> String {
    template.replace("{language}", language)
}
