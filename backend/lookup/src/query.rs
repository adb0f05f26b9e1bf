//! openFDA search expression construction.
//!
//! Precedence, first match wins: printed NDC, then a scanned 10/11/12 digit
//! code, then exact name matches. With none of those there is no query.
//!
//! openFDA indexes the two-segment labeler-product code as `product_ndc` and
//! the full three-segment code as `package_ndc`.

use medlens_core::IdentityRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupQuery {
    /// NDC read off the label, product (2 segments) or package (3 segments).
    ProductCode(String),
    /// Digits from a scanned barcode.
    ScannedCode(String),
    Names {
        brand: Option<String>,
        generic: Option<String>,
        dosage_form: Option<String>,
    },
}

impl LookupQuery {
    /// Render as an openFDA `search` expression (not yet URL-encoded).
    pub fn search_expression(&self) -> String {
        match self {
            Self::ProductCode(ndc) if ndc.split('-').count() == 3 => exact("openfda.package_ndc", ndc),
            Self::ProductCode(ndc) => exact("openfda.product_ndc", ndc),
            Self::ScannedCode(digits) if digits.len() == 12 => exact("openfda.upc", digits),
            Self::ScannedCode(digits) => exact("openfda.product_ndc", digits),
            Self::Names { brand, generic, dosage_form } => [
                ("openfda.brand_name", brand),
                ("openfda.generic_name", generic),
                ("openfda.dosage_form", dosage_form),
            ]
            .iter()
            .filter_map(|(field, value)| value.as_deref().map(|v| exact(field, v)))
            .collect::<Vec<_>>()
            .join(" AND "),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProductCode(_) => "product_code",
            Self::ScannedCode(_) => "scanned_code",
            Self::Names { .. } => "names",
        }
    }
}

fn exact(field: &str, value: &str) -> String {
    format!("{field}:\"{}\"", value.replace('"', ""))
}

/// Normalize a scanned code to its digits if it has a usable length.
fn scanned_digits(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    let usable = matches!(compact.len(), 10..=12) && compact.chars().all(|c| c.is_ascii_digit());
    usable.then_some(compact)
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Pick the query for an identity. `barcode` wins over `identity.barcode`.
pub fn build_query(identity: &IdentityRecord, barcode: Option<&str>) -> Option<LookupQuery> {
    if let Some(ndc) = present(&identity.ndc) {
        return Some(LookupQuery::ProductCode(ndc));
    }

    let scanned = barcode
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .or(identity.barcode.as_deref())
        .and_then(scanned_digits);
    if let Some(digits) = scanned {
        return Some(LookupQuery::ScannedCode(digits));
    }

    let brand = present(&identity.brand_name);
    let generic = present(&identity.generic_name);
    if brand.is_none() && generic.is_none() {
        return None;
    }
    Some(LookupQuery::Names { brand, generic, dosage_form: present(&identity.dosage_form) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> IdentityRecord {
        IdentityRecord::default()
    }

    #[test]
    fn product_code_beats_names() {
        let id = IdentityRecord {
            ndc: Some("12345-678-90".into()),
            brand_name: Some("Acme".into()),
            ..identity()
        };
        let query = build_query(&id, Some("012345678905")).unwrap();
        assert_eq!(query, LookupQuery::ProductCode("12345-678-90".into()));
        assert_eq!(query.search_expression(), "openfda.package_ndc:\"12345-678-90\"");
    }

    #[test]
    fn printed_ndc_field_follows_segment_count() {
        let query = |ndc: &str| {
            let id = IdentityRecord { ndc: Some(ndc.into()), ..identity() };
            build_query(&id, None).unwrap().search_expression()
        };
        assert_eq!(query("0573-0164-30"), "openfda.package_ndc:\"0573-0164-30\"");
        assert_eq!(query("0573-0164"), "openfda.product_ndc:\"0573-0164\"");
    }

    #[test]
    fn eleven_digit_scan_is_product_ndc() {
        let query = build_query(&identity(), Some("01234567890")).unwrap();
        assert_eq!(query.search_expression(), "openfda.product_ndc:\"01234567890\"");
    }

    #[test]
    fn twelve_digit_scan_is_upc() {
        let query = build_query(&identity(), Some(" 0123-4567-8905 ")).unwrap();
        assert_eq!(query.search_expression(), "openfda.upc:\"012345678905\"");
    }

    #[test]
    fn short_or_alpha_scan_falls_through() {
        let id = IdentityRecord { generic_name: Some("ibuprofen".into()), ..identity() };
        assert_eq!(build_query(&id, Some("12345")).unwrap().kind(), "names");
        assert_eq!(build_query(&id, Some("ABC4567890")).unwrap().kind(), "names");
    }

    #[test]
    fn identity_barcode_used_when_no_scan() {
        let id = IdentityRecord { barcode: Some("1234567890".into()), ..identity() };
        assert_eq!(build_query(&id, Some("")), Some(LookupQuery::ScannedCode("1234567890".into())));
    }

    #[test]
    fn names_are_and_joined() {
        let id = IdentityRecord {
            brand_name: Some("Advil".into()),
            dosage_form: Some("TABLET".into()),
            ..identity()
        };
        assert_eq!(
            build_query(&id, None).unwrap().search_expression(),
            "openfda.brand_name:\"Advil\" AND openfda.dosage_form:\"TABLET\""
        );
    }

    #[test]
    fn dosage_form_alone_is_no_query() {
        let id = IdentityRecord { dosage_form: Some("TABLET".into()), ..identity() };
        assert_eq!(build_query(&id, None), None);
        assert_eq!(build_query(&identity(), Some("")), None);
    }
}
