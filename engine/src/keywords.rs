//! Keyword extraction and candidate pre-filtering
//!
//! Cheap lexical narrowing between semantic retrieval and judge
//! verification. Salient keywords come from quoted phrases, capitalized
//! multi-word entities and a fixed domain vocabulary; candidates whose
//! cached text matches too few of them are dropped before the expensive
//! judge calls.

use lexfind_corpus::ProfileStore;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Known company names, grouped by sector.
const COMPANY_PATTERNS: &[&str] = &[
    r"(?i)\b(?:CNN|NBC|Fox|ABC|CBS|HBO|ESPN|MTV)\b",
    r"(?i)\b(?:Netflix|Hulu|Disney\+?|Amazon\s*Prime|Apple\s*TV)\b",
    r"(?i)\b(?:Google|Apple|Microsoft|Amazon|Facebook|Meta|Tesla)\b",
    r"(?i)\b(?:Goldman\s*Sachs|JPMorgan|Morgan\s*Stanley|Bank\s*of\s*America)\b",
    r"(?i)\b(?:Pfizer|Moderna|Johnson\s*&\s*Johnson|Merck)\b",
];

/// Industry and deal-type vocabulary matched as substrings.
const INDUSTRY_VOCABULARY: &[&str] = &[
    "television",
    "broadcast",
    "tv",
    "network",
    "media",
    "streaming",
    "cryptocurrency",
    "crypto",
    "bitcoin",
    "blockchain",
    "digital asset",
    "pharmaceutical",
    "pharma",
    "drug",
    "clinical",
    "fda",
    "technology",
    "tech",
    "software",
    "startup",
    "ipo",
    "public offering",
    "merger",
    "acquisition",
    "litigation",
    "lawsuit",
    "dispute",
    "court",
    "trial",
    "fortune 500",
    "fortune500",
];

/// Extract salient lowercase keywords from a query.
pub fn extract_keywords(query: &str) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();

    for pattern in COMPANY_PATTERNS {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for m in re.find_iter(query) {
            keywords.insert(m.as_str().to_lowercase());
        }
    }

    let query_lower = query.to_lowercase();
    for term in INDUSTRY_VOCABULARY {
        if query_lower.contains(term) {
            keywords.insert((*term).to_string());
        }
    }

    // Quoted phrases carry the most intent
    if let Ok(re) = Regex::new(r#""([^"]+)""#) {
        for caps in re.captures_iter(query) {
            keywords.insert(caps[1].trim().to_lowercase());
        }
    }

    // Capitalized multi-word runs are likely company or org names
    if let Ok(re) = Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)\b") {
        for caps in re.captures_iter(query) {
            keywords.insert(caps[1].to_lowercase());
        }
    }

    keywords
}

/// Thresholds for the adaptive pre-filter. Empirically tuned; treat as
/// policy, not law.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    /// Keyword count at which filtering becomes strict
    pub strict_keyword_count: usize,
    /// Matches required in strict mode
    pub strict_matches: usize,
    /// Survivor count below which strict mode relaxes to one match
    pub relax_threshold: usize,
    /// Candidates kept from the original order when filtering would
    /// otherwise return nothing
    pub fallback_keep: usize,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            strict_keyword_count: 3,
            strict_matches: 2,
            relax_threshold: 5,
            fallback_keep: 20,
        }
    }
}

/// Keyword pre-filter over cached profile text.
pub struct KeywordFilter {
    store: Arc<ProfileStore>,
    policy: FilterPolicy,
}

impl KeywordFilter {
    pub fn new(store: Arc<ProfileStore>, policy: FilterPolicy) -> Self {
        Self { store, policy }
    }

    /// Narrow a candidate list, preserving order. Never grows the list.
    ///
    /// With no extractable keywords the filter is a no-op. If filtering
    /// would eliminate every candidate, the head of the original order is
    /// kept instead so lexical strictness cannot cause false negatives.
    pub fn filter(&self, candidates: &[i64], query: &str) -> Vec<i64> {
        let keywords = extract_keywords(query);
        if keywords.is_empty() {
            return candidates.to_vec();
        }

        let filtered = if keywords.len() >= self.policy.strict_keyword_count {
            let strict = self.retain_matching(candidates, &keywords, self.policy.strict_matches);
            if strict.len() < self.policy.relax_threshold {
                self.retain_matching(candidates, &keywords, 1)
            } else {
                strict
            }
        } else {
            self.retain_matching(candidates, &keywords, 1)
        };

        if filtered.is_empty() && !candidates.is_empty() {
            tracing::debug!(
                "keyword filter eliminated all {} candidates; keeping first {}",
                candidates.len(),
                self.policy.fallback_keep
            );
            return candidates
                .iter()
                .take(self.policy.fallback_keep)
                .copied()
                .collect();
        }

        filtered
    }

    fn retain_matching(
        &self,
        candidates: &[i64],
        keywords: &BTreeSet<String>,
        min_matches: usize,
    ) -> Vec<i64> {
        candidates
            .iter()
            .copied()
            .filter(|&profile_id| match self.store.cached_text(profile_id) {
                // No cached text: keep the candidate by default
                None => true,
                Some(text) => {
                    let text = text.to_lowercase();
                    let matches = keywords
                        .iter()
                        .filter(|keyword| text.contains(keyword.as_str()))
                        .count();
                    matches >= min_matches
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexfind_corpus::ProfileRecord;

    fn store_with_texts(texts: &[&str]) -> (Arc<ProfileStore>, Vec<i64>) {
        let store = ProfileStore::in_memory().unwrap();
        let mut ids = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let id = store
                .add_profile(
                    &ProfileRecord::builder()
                        .url(format!("https://example.com/{i}"))
                        .build()
                        .unwrap(),
                )
                .unwrap();
            if !text.is_empty() {
                store.save_experience(id, text, "").unwrap();
            }
            ids.push(id);
        }
        (Arc::new(store), ids)
    }

    #[test]
    fn test_extract_company_names() {
        let keywords = extract_keywords("worked with CNN or NBC on media deals");
        assert!(keywords.contains("cnn"));
        assert!(keywords.contains("nbc"));
        assert!(keywords.contains("media"));
    }

    #[test]
    fn test_extract_industry_terms() {
        let keywords = extract_keywords("experience with cryptocurrency regulations");
        assert!(keywords.contains("cryptocurrency"));
        assert!(keywords.contains("crypto"));
    }

    #[test]
    fn test_extract_quoted_phrase() {
        let keywords = extract_keywords(r#"cases involving "collateralized loan obligations""#);
        assert!(keywords.contains("collateralized loan obligations"));
    }

    #[test]
    fn test_extract_capitalized_entity() {
        let keywords = extract_keywords("represented Acme Widgets in court");
        assert!(keywords.contains("acme widgets"));
        assert!(keywords.contains("court"));
    }

    #[test]
    fn test_extract_nothing() {
        assert!(extract_keywords("experienced negotiators").is_empty());
    }

    #[test]
    fn test_no_keywords_is_noop() {
        let (store, ids) = store_with_texts(&["anything", "at all"]);
        let filter = KeywordFilter::new(store, FilterPolicy::default());

        assert_eq!(filter.filter(&ids, "experienced negotiators"), ids);
    }

    #[test]
    fn test_single_keyword_requires_one_match() {
        let (store, ids) = store_with_texts(&[
            "advised a streaming platform on carriage",
            "general corporate work",
        ]);
        let filter = KeywordFilter::new(store, FilterPolicy::default());

        let kept = filter.filter(&ids, "worked with streaming companies");
        assert_eq!(kept, vec![ids[0]]);
    }

    #[test]
    fn test_missing_cached_text_keeps_candidate() {
        let (store, ids) = store_with_texts(&["", "general corporate work"]);
        let filter = KeywordFilter::new(store, FilterPolicy::default());

        let kept = filter.filter(&ids, "worked with streaming companies");
        assert_eq!(kept, vec![ids[0]]);
    }

    #[test]
    fn test_strict_mode_requires_two_matches() {
        // "tv", "network", "television", "broadcast", "media" give >= 3
        // keywords, so strict mode wants two per candidate
        let query = "worked on television broadcast deals for a TV network in media";

        let texts: Vec<String> = (0..10)
            .map(|i| {
                if i < 6 {
                    format!("candidate {i}: television network counsel")
                } else {
                    format!("candidate {i}: mentions television once")
                }
            })
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let (store, ids) = store_with_texts(&refs);
        let filter = KeywordFilter::new(store, FilterPolicy::default());

        let kept = filter.filter(&ids, query);
        assert_eq!(kept, ids[..6].to_vec());
    }

    #[test]
    fn test_strict_mode_relaxes_when_too_few_survive() {
        let query = "worked on television broadcast deals for a TV network in media";

        // Only one candidate matches two keywords; relaxation to a single
        // match keeps the others that mention just one term
        let (store, ids) = store_with_texts(&[
            "television network counsel",
            "mentions television once",
            "broadcast practice",
            "nothing relevant",
        ]);
        let filter = KeywordFilter::new(store, FilterPolicy::default());

        let kept = filter.filter(&ids, query);
        assert_eq!(kept, vec![ids[0], ids[1], ids[2]]);
    }

    #[test]
    fn test_fallback_keeps_head_of_original_order() {
        let texts: Vec<String> = (0..25).map(|i| format!("candidate {i} tax work")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let (store, ids) = store_with_texts(&refs);
        let filter = KeywordFilter::new(store, FilterPolicy::default());

        // "netflix" appears nowhere, so everything is filtered out and the
        // first 20 of the original order come back instead
        let kept = filter.filter(&ids, "worked with Netflix");
        assert_eq!(kept, ids[..20].to_vec());
    }

    #[test]
    fn test_never_returns_more_than_input() {
        let (store, ids) = store_with_texts(&["streaming", "streaming", "streaming"]);
        let filter = KeywordFilter::new(store, FilterPolicy::default());

        let kept = filter.filter(&ids, "streaming work");
        assert!(kept.len() <= ids.len());
    }

    #[test]
    fn test_empty_input_stays_empty() {
        let (store, _) = store_with_texts(&[]);
        let filter = KeywordFilter::new(store, FilterPolicy::default());

        assert!(filter.filter(&[], "worked with Netflix").is_empty());
    }
}
