//! Search links offered when a drug cannot be identified or looked up.

use medlens_core::Source;

/// Search-engine and reference links for a free-text drug query.
pub fn fallback_links(query: &str) -> Vec<Source> {
    let q = urlencoding::encode(query.trim());
    vec![
        Source::new("Google", format!("https://www.google.com/search?q={q}")),
        Source::new("DailyMed", format!("https://dailymed.nlm.nih.gov/dailymed/search.cfm?query={q}")),
        Source::new("MedlinePlus", format!("https://vsearch.nlm.nih.gov/vivisimo/cgi-bin/query-meta?v%3Aproject=medlineplus&query={q}")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_query() {
        let links = fallback_links(" Tylenol Extra Strength ");
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].url, "https://www.google.com/search?q=Tylenol%20Extra%20Strength");
        assert!(links.iter().all(|l| !l.url.contains(' ')));
    }
}
