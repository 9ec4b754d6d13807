use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a candidate value is compared against a required value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Byte-for-byte equality
    Exact,
    /// Equality after trimming and lowercasing
    #[default]
    IgnoreCase,
    /// Candidate value contains the required value, ignoring case
    Contains,
}

impl TextMatch {
    #[inline]
    pub fn matches(&self, candidate: &str, required: &str) -> bool {
        match self {
            TextMatch::Exact => candidate == required,
            TextMatch::IgnoreCase => normalize(candidate) == normalize(required),
            TextMatch::Contains => {
                let required = normalize(required);
                !required.is_empty() && normalize(candidate).contains(&required)
            }
        }
    }

    /// Key two required values must share to count as duplicates.
    /// Symmetric, unlike `matches` under `Contains`.
    fn dedup_key(&self, value: &str) -> String {
        match self {
            TextMatch::Exact => value.to_string(),
            TextMatch::IgnoreCase | TextMatch::Contains => normalize(value),
        }
    }
}

#[inline]
fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[inline]
fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Comparison policy per criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comparators {
    pub location: TextMatch,
    pub interests: TextMatch,
    pub background: TextMatch,
    pub availability: TextMatch,
    pub frequency: TextMatch,
    pub timing: TextMatch,
}

impl Default for Comparators {
    fn default() -> Self {
        Self {
            location: TextMatch::Exact,
            interests: TextMatch::IgnoreCase,
            background: TextMatch::Contains,
            availability: TextMatch::IgnoreCase,
            frequency: TextMatch::IgnoreCase,
            timing: TextMatch::IgnoreCase,
        }
    }
}

/// Required values with blanks and duplicates removed, first occurrence kept
fn distinct_required<'a>(required: &'a [String], cmp: TextMatch) -> Vec<&'a str> {
    let mut seen: HashSet<String> = HashSet::with_capacity(required.len());
    required
        .iter()
        .map(String::as_str)
        .filter(|v| !is_blank(v))
        .filter(|v| seen.insert(cmp.dedup_key(v)))
        .collect()
}

/// Fraction (0.0 to 1.0) of the distinct required values that appear in
/// `offered`. Returns `None` when nothing is required.
pub fn coverage(required: &[String], offered: &[String], cmp: TextMatch) -> Option<f64> {
    let required = distinct_required(required, cmp);
    if required.is_empty() {
        return None;
    }

    let found = required
        .iter()
        .filter(|r| offered.iter().any(|o| cmp.matches(o, r)))
        .count();

    Some(found as f64 / required.len() as f64)
}

/// Whether any offered value matches any required value
pub fn intersects(required: &[String], offered: &[String], cmp: TextMatch) -> bool {
    required
        .iter()
        .filter(|r| !is_blank(r))
        .any(|r| offered.iter().any(|o| cmp.matches(o, r)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_text_match_modes() {
        assert!(TextMatch::Exact.matches("Springfield", "Springfield"));
        assert!(!TextMatch::Exact.matches("springfield", "Springfield"));

        assert!(TextMatch::IgnoreCase.matches(" springfield ", "Springfield"));
        assert!(!TextMatch::IgnoreCase.matches("Springfield North", "Springfield"));

        assert!(TextMatch::Contains.matches("Retired school teacher", "Teacher"));
        assert!(!TextMatch::Contains.matches("Nurse", "teacher"));
        assert!(!TextMatch::Contains.matches("Nurse", "  "));
    }

    #[test]
    fn test_coverage_fraction() {
        let required = strings(&["music", "art"]);
        let offered = strings(&["Music", "gardening"]);

        assert_eq!(coverage(&required, &offered, TextMatch::IgnoreCase), Some(0.5));
        assert_eq!(coverage(&required, &offered, TextMatch::Exact), Some(0.0));
    }

    #[test]
    fn test_coverage_ignores_duplicates_and_blanks() {
        let required = strings(&["mon", "Mon", "", "tue"]);
        let offered = strings(&["mon"]);

        assert_eq!(coverage(&required, &offered, TextMatch::IgnoreCase), Some(0.5));
        assert_eq!(coverage(&strings(&["", " "]), &offered, TextMatch::IgnoreCase), None);
    }

    #[test]
    fn test_contains_dedup_is_order_independent() {
        let offered = strings(&["mo"]);
        let forward = coverage(&strings(&["mon", "mo"]), &offered, TextMatch::Contains);
        let backward = coverage(&strings(&["mo", "mon"]), &offered, TextMatch::Contains);

        assert_eq!(forward, Some(0.5));
        assert_eq!(forward, backward);

        let offered = strings(&["monday"]);
        let partial = coverage(&strings(&["tue", "tu", " TUE "]), &strings(&["tuesday", "mon"]), TextMatch::Contains);
        assert_eq!(partial, Some(1.0));
        let missing = coverage(&strings(&["mo", "wed"]), &offered, TextMatch::Contains);
        assert_eq!(missing, Some(0.5));
    }

    #[test]
    fn test_exact_dedup_keeps_case_variants() {
        let required = strings(&["Mon", "mon"]);
        assert_eq!(coverage(&required, &strings(&["mon"]), TextMatch::Exact), Some(0.5));
    }

    #[test]
    fn test_intersects() {
        let accepted = strings(&["weekly", "monthly"]);

        assert!(intersects(&accepted, &strings(&["Monthly"]), TextMatch::IgnoreCase));
        assert!(!intersects(&accepted, &strings(&["daily"]), TextMatch::IgnoreCase));
        assert!(!intersects(&accepted, &[], TextMatch::IgnoreCase));
    }

    #[test]
    fn test_comparators_deserialize_partial() {
        let json = r#"{"location": "ignore_case"}"#;
        let comparators: Comparators = serde_json::from_str(json).unwrap();

        assert_eq!(comparators.location, TextMatch::IgnoreCase);
        assert_eq!(comparators.background, TextMatch::Contains);
    }
}
