//! Result presentation.
//!
//! Every view is a plain string so it can be tested; each one ends with the
//! restart hint.

use medlens_core::{DrugRecord, GuidanceRecord, IdentityRecord, LookupResult, MedLensError, ScanOutcome, Source};

use crate::terminal_output::{render_fields, styled, BOLD, DIM, GREEN, RED, YELLOW};

pub const RESTART_HINT: &str = "Run `medlens scan` to scan another package.";

const MAX_VALUE: usize = 400;

fn heading(style: &str, text: &str) -> String {
    format!("{}\n\n", styled(&format!("{style}{BOLD}"), text))
}

fn hint() -> String {
    format!("\n{}\n", styled(DIM, RESTART_HINT))
}

fn render_sources(title: &str, sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut out = format!("\n{}\n", styled(BOLD, title));
    for source in sources {
        out.push_str(&format!("  - {}: {}\n", source.name, source.url));
    }
    out
}

fn drug_rows(drug: &DrugRecord) -> Vec<(&'static str, String)> {
    [
        ("Brand name", &drug.brand_name),
        ("Generic name", &drug.generic_name),
        ("NDC", &drug.ndc),
        ("Route", &drug.route),
        ("Dosage form", &drug.dosage_form),
        ("Active ingredients", &drug.active_ingredients),
        ("Indications", &drug.indications),
        ("Dosage", &drug.dosage),
        ("Warnings", &drug.warnings),
        ("Adverse reactions", &drug.adverse_reactions),
        ("Patient information", &drug.patient_info),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.clone().map(|v| (label, v)))
    .collect()
}

fn identity_rows(identity: &IdentityRecord) -> Vec<(&'static str, String)> {
    let mut rows: Vec<(&'static str, String)> = [
        ("Brand name", &identity.brand_name),
        ("Generic name", &identity.generic_name),
        ("NDC", &identity.ndc),
        ("Strength", &identity.strength),
        ("Dosage form", &identity.dosage_form),
        ("Manufacturer", &identity.manufacturer),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.clone().map(|v| (label, v)))
    .collect();
    if !identity.active_ingredients.is_empty() {
        rows.push(("Active ingredients", identity.active_ingredients.join(", ")));
    }
    rows
}

/// Label found in the database.
pub fn render_found(drug: &DrugRecord, sources: &[Source]) -> String {
    let mut out = heading(GREEN, "Medicine identified");
    out.push_str(&render_fields(&drug_rows(drug), MAX_VALUE));
    out.push_str(&render_sources("Sources", sources));
    out.push_str(&hint());
    out
}

/// Identity read, but no label matched.
pub fn render_not_found(identity: &IdentityRecord, links: &[Source]) -> String {
    let mut out = heading(YELLOW, "No matching label found");
    let rows = identity_rows(identity);
    if rows.is_empty() {
        out.push_str("  Nothing identifying could be read from the photos.\n");
    } else {
        out.push_str("  Read from the package:\n");
        out.push_str(&render_fields(&rows, MAX_VALUE));
    }
    out.push_str(&render_sources("Search instead", links));
    out.push_str(&hint());
    out
}

/// Identification below the confidence threshold; fields are shown only as a hint.
pub fn render_low_confidence(best_guess: Option<String>, links: &[Source]) -> String {
    let mut out = heading(YELLOW, "Not confidently identified");
    out.push_str("  The photos could not be read reliably. Try again with better lighting,\n");
    out.push_str("  or search for the medicine yourself.\n");
    if let Some(guess) = best_guess {
        out.push_str(&format!("  Best guess: {guess}\n"));
    }
    out.push_str(&render_sources("Search", links));
    out.push_str(&hint());
    out
}

pub fn render_guidance(guidance: &GuidanceRecord, links: &[Source]) -> String {
    let mut out = heading(GREEN, "Usage guidance");
    let mut rows: Vec<(&'static str, String)> = [
        ("Medicine", &guidance.drug_name),
        ("Purpose", &guidance.purpose),
        ("Dosage", &guidance.dosage),
        ("How to use", &guidance.usage),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.clone().map(|v| (label, v)))
    .collect();
    if !guidance.active_ingredients.is_empty() {
        rows.insert(1.min(rows.len()), ("Active ingredients", guidance.active_ingredients.join(", ")));
    }
    out.push_str(&render_fields(&rows, MAX_VALUE));
    if !guidance.warnings.is_empty() {
        out.push_str(&format!("\n{}\n", styled(BOLD, "Warnings")));
        for warning in &guidance.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }
    out.push_str("\n  General information only. Follow the label and ask a pharmacist.\n");
    out.push_str(&render_sources("More information", links));
    out.push_str(&hint());
    out
}

fn advice_for(err: &MedLensError) -> &'static str {
    match err {
        MedLensError::Configuration(_) => {
            "Save an API key with `medlens key set`. Confirmed photos are kept only while `scan.resume` is `resume`."
        }
        MedLensError::Acquisition(_) => "Use a JPEG, PNG or WebP photo of the package.",
        MedLensError::Extraction(_) => FAILURE_ADVICE,
        MedLensError::Storage(_) => "Local storage is unavailable. Check permissions on the MedLens directory.",
        _ => "Something went wrong.",
    }
}

const FAILURE_ADVICE: &str = "The identification service did not answer usefully. Check the key and network.";

fn render_message(message: &str, advice: &str) -> String {
    let mut out = heading(RED, "Scan failed");
    out.push_str(&format!("  {message}\n  {advice}\n"));
    out.push_str(&hint());
    out
}

pub fn render_error(err: &MedLensError) -> String {
    render_message(&err.to_string(), advice_for(err))
}

/// A scan that ended in the wizard's error phase.
pub fn render_failure(message: &str) -> String {
    render_message(message, FAILURE_ADVICE)
}

/// Pick the view for a finished scan. Low confidence wins over fields.
pub fn render_outcome(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::Label { identity, low_confidence: true, fallback_links, .. } => {
            render_low_confidence(identity.display_name(), fallback_links)
        }
        ScanOutcome::Label { lookup: LookupResult::Found { drug, sources }, .. } => render_found(drug, sources),
        ScanOutcome::Label { identity, lookup: LookupResult::NotFound, fallback_links, .. } => {
            render_not_found(identity, fallback_links)
        }
        ScanOutcome::Guidance { guidance, low_confidence: true, fallback_links } => {
            render_low_confidence(guidance.drug_name.clone(), fallback_links)
        }
        ScanOutcome::Guidance { guidance, fallback_links, .. } => render_guidance(guidance, fallback_links),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal_output::strip_ansi;

    fn links() -> Vec<Source> {
        vec![Source::new("Google", "https://www.google.com/search?q=Acme")]
    }

    fn label(lookup: LookupResult, low_confidence: bool) -> ScanOutcome {
        ScanOutcome::Label {
            identity: IdentityRecord { brand_name: Some("Acme".into()), ..Default::default() },
            lookup,
            low_confidence,
            fallback_links: links(),
        }
    }

    #[test]
    fn found_view_lists_present_fields_and_sources() {
        let drug = DrugRecord { brand_name: Some("Acme".into()), route: Some("ORAL".into()), ..Default::default() };
        let out = strip_ansi(&render_outcome(&label(
            LookupResult::Found { drug, sources: vec![Source::new("openFDA", "https://api.fda.gov/x")] },
            false,
        )));
        assert!(out.contains("Medicine identified"));
        assert!(out.contains("Acme"));
        assert!(out.contains("openFDA: https://api.fda.gov/x"));
        assert!(!out.contains("Warnings"));
        assert!(out.trim_end().ends_with(RESTART_HINT));
    }

    #[test]
    fn low_confidence_prefers_links_over_fields() {
        let drug = DrugRecord { warnings: Some("Do not exceed".into()), ..Default::default() };
        let out = strip_ansi(&render_outcome(&label(LookupResult::Found { drug, sources: vec![] }, true)));
        assert!(out.contains("Not confidently identified"));
        assert!(out.contains("Best guess: Acme"));
        assert!(!out.contains("Do not exceed"));
        assert!(out.contains("google.com"));
    }

    #[test]
    fn not_found_offers_search() {
        let out = strip_ansi(&render_outcome(&label(LookupResult::NotFound, false)));
        assert!(out.contains("No matching label found"));
        assert!(out.contains("Search instead"));
        assert!(out.trim_end().ends_with(RESTART_HINT));
    }

    #[test]
    fn guidance_view() {
        let outcome = ScanOutcome::Guidance {
            guidance: GuidanceRecord {
                drug_name: Some("Zyrtec".into()),
                dosage: Some("10 mg daily".into()),
                warnings: vec!["May cause drowsiness".into()],
                ..Default::default()
            },
            low_confidence: false,
            fallback_links: links(),
        };
        let out = strip_ansi(&render_outcome(&outcome));
        assert!(out.contains("Usage guidance"));
        assert!(out.contains("10 mg daily"));
        assert!(out.contains("- May cause drowsiness"));
    }

    #[test]
    fn error_view_has_advice_and_hint() {
        let out = strip_ansi(&render_error(&MedLensError::Configuration("no API key".into())));
        assert!(out.contains("medlens key set"));
        assert!(out.contains("only while `scan.resume` is `resume`"));
        assert!(!out.contains("run `medlens scan` again"));
        assert!(out.trim_end().ends_with(RESTART_HINT));
    }

    #[test]
    fn failure_view_keeps_message() {
        let out = strip_ansi(&render_failure("identification failed: timeout"));
        assert!(out.contains("Scan failed"));
        assert!(out.contains("identification failed: timeout"));
    }
}
