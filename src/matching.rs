//! Locale-aware text normalization and fuzzy catalog resolution.
//!
//! The similarity metric and the 0.70 acceptance threshold are a
//! compatibility contract with the existing clients; do not swap in a
//! different string metric.

use unicode_normalization::UnicodeNormalization;

use crate::domain::catalog::CatalogEntry;

/// Minimum similarity for a fuzzy match to be accepted.
pub const MATCH_THRESHOLD: f64 = 0.70;

/// Canonical comparison key: lowercase, NFD-decompose, drop combining marks
/// (U+0300–U+036F), then drop everything outside `[a-z0-9]`.
///
/// `"Cơm rang"` → `"comrang"`. Idempotent by construction.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Classic Levenshtein edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut curr = vec![0usize; a.len() + 1];

    for (i, bc) in b.iter().enumerate() {
        curr[0] = i + 1;
        for (j, ac) in a.iter().enumerate() {
            curr[j + 1] = if ac == bc {
                prev[j]
            } else {
                1 + prev[j].min(curr[j]).min(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[a.len()]
}

/// Normalized edit-distance similarity in `[0, 1]`. Two empty strings are
/// defined as identical (similarity 1).
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Resolve a free-text product name against a catalog snapshot.
///
/// Exact normalized match wins immediately (first in catalog order on ties).
/// Otherwise the best fuzzy candidate is taken, scanning in catalog order
/// and keeping the first candidate to reach the top score. Below
/// [`MATCH_THRESHOLD`] nothing is returned; unresolved is not an error.
pub fn resolve_product<'a>(query: &str, candidates: &'a [CatalogEntry]) -> Option<&'a CatalogEntry> {
    let normalized_query = normalize(query);

    for candidate in candidates {
        if normalize(&candidate.name) == normalized_query {
            return Some(candidate);
        }
    }

    let mut best: Option<&CatalogEntry> = None;
    let mut best_score = 0.0f64;

    for candidate in candidates {
        let score = similarity(&normalized_query, &normalize(&candidate.name));
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }

    if best_score >= MATCH_THRESHOLD {
        best
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str) -> CatalogEntry {
        CatalogEntry {
            id,
            name: name.to_string(),
            retail_cost: 0,
            unit: None,
        }
    }

    #[test]
    fn normalize_strips_accents_case_and_separators() {
        assert_eq!(normalize("Cơm rang"), "comrang");
        assert_eq!(normalize("PHỞ BÒ!"), "phobo");
        assert_eq!(normalize("bàn 3"), "ban3");
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in ["Cơm rang dưa bò", "  Trà đá 2 ", "chả giò", "", "abc123"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("comrang", "comrang"), 0);
    }

    #[test]
    fn similarity_of_identical_strings_is_one() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("phobo", "phobo"), 1.0);
    }

    #[test]
    fn accent_insensitive_exact_match_wins() {
        let catalog = vec![entry(1, "Cơm rang"), entry(2, "Cơm rang dưa bò")];
        let hit = resolve_product("com rang", &catalog).unwrap();
        assert_eq!(hit.id, 1);
    }

    #[test]
    fn first_exact_match_wins_on_ties() {
        let catalog = vec![entry(1, "Trà đá"), entry(2, "tra da")];
        assert_eq!(resolve_product("TRA DA", &catalog).unwrap().id, 1);
    }

    #[test]
    fn fuzzy_match_above_threshold() {
        let catalog = vec![entry(1, "phở bò"), entry(2, "bún chả")];
        // "pho bo" vs "phobo" is exact after normalization; use a typo.
        let hit = resolve_product("pho boo", &catalog).unwrap();
        assert_eq!(hit.id, 1);
    }

    #[test]
    fn below_threshold_returns_none() {
        let catalog = vec![entry(1, "phở bò"), entry(2, "bún chả")];
        assert!(resolve_product("pizza margherita", &catalog).is_none());
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        assert!(resolve_product("phở bò", &[]).is_none());
    }
}
