//! City name normalization and matching.
//!
//! Policy: trim, collapse runs of whitespace, Unicode-lowercase. No accent
//! folding. A covered city matches when it equals the input or appears in
//! it as a contiguous run of whole words ("Colombo 07" matches "Colombo",
//! "Negombo" does not match "Ombo").

/// Normalize a city name for comparison.
#[must_use]
pub fn normalize_city(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// How well a normalized input matched a covered city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CityMatch {
    /// Covered city is a whole-word run inside the input.
    Contains,
    /// Input and covered city are identical after normalization.
    Exact,
}

/// Compare a normalized input against a normalized covered city.
#[must_use]
pub fn match_city(input: &str, covered: &str) -> Option<CityMatch> {
    if input.is_empty() || covered.is_empty() {
        return None;
    }
    if input == covered {
        return Some(CityMatch::Exact);
    }

    let haystack: Vec<&str> = input.split(' ').collect();
    let needle: Vec<&str> = covered.split(' ').collect();
    if needle.len() > haystack.len() {
        return None;
    }

    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
        .then_some(CityMatch::Contains)
}
