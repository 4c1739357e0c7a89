//! Query classification
//!
//! Decides whether a query can be resolved with structured attribute
//! lookups or needs the semantic pipeline. Stage one is a deterministic
//! signal match, so the fast path never waits on an external service;
//! only ambiguous queries escalate to the probabilistic judge.

use regex::Regex;
use std::sync::Arc;

use crate::judge::Judge;

/// Resolution strategy for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Answerable with structured attribute lookups
    Structured,
    /// Requires semantic retrieval over unstructured text
    Semantic,
}

/// Outcome of the deterministic first stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVerdict {
    Structured,
    Semantic,
    Unknown,
}

/// Phrasing strongly indicative of structured attribute lookups:
/// names, titles, schools, languages, regions.
const STRUCTURED_SIGNALS: &[&str] = &[
    "named",
    "name is",
    "partner",
    "associate",
    "counsel",
    "went to",
    "graduated",
    "law school",
    "speak",
    "language",
    "title",
    "practice",
    "office",
    "region",
    "asia",
    "china",
    "japan",
    "europe",
    "latin america",
    "israel",
    "london",
];

/// Phrasing indicative of unstructured-experience queries. These win over
/// structured signals: missing a match is worse than over-processing.
const SEMANTIC_SIGNALS: &[&str] = &[
    "worked",
    "work with",
    "represented",
    "experience",
    "handled",
    "advised",
    "defended",
    "prosecuted",
    "litigation",
    "lawsuit",
    "case",
    "deal",
    "ipo",
    "merger",
    "acquisition",
    "client",
    "company",
    "companies",
    "startup",
    "industry",
    "fortune 500",
];

const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are a query classifier for a lawyer search system.

Classify queries into two categories:

STRUCTURED queries - can be answered with direct database lookups:
- Name searches: "lawyers named John", "John Smith"
- Title searches: "partners", "associates", "counsel"
- School searches: "went to Yale", "graduated from Harvard"
- Practice area searches: "tax lawyers", "lawyers in corporate"
- Language searches: "lawyers who speak Spanish"
- Graduation year: "graduated after 2015"
- Location/region: "lawyers in Asia", "London office"
- Combinations of the above: "partners who went to Yale"

SEMANTIC queries - require understanding context and searching through unstructured text:
- Experience with specific companies: "worked with Google", "represented Apple"
- Industry expertise: "lawyers who worked on a case for a TV network"
- Deal types: "handled IPOs", "worked on mergers"
- Specific legal work: "defended pharmaceutical companies", "prosecuted antitrust cases"
- Contextual understanding: "lawyers who helped tech startups go public"
- Any query requiring inference: "lawyers experienced with streaming services"

Respond with only one word: 'structured' or 'semantic'"#;

/// Deterministic signal match over the fixed lexicons.
pub fn rule_classify(query: &str) -> RuleVerdict {
    let query = query.to_lowercase();

    if SEMANTIC_SIGNALS.iter().any(|signal| query.contains(signal)) {
        return RuleVerdict::Semantic;
    }

    let has_year = Regex::new(r"\b(19|20)\d{2}\b")
        .map(|re| re.is_match(&query))
        .unwrap_or(false);
    if has_year || STRUCTURED_SIGNALS.iter().any(|signal| query.contains(signal)) {
        return RuleVerdict::Structured;
    }

    RuleVerdict::Unknown
}

/// Two-stage classifier: rules first, probabilistic judge on ambiguity.
pub struct QueryClassifier {
    fallback: Option<Arc<dyn Judge>>,
}

impl QueryClassifier {
    /// Rules-only classifier; ambiguous queries default to Semantic.
    pub fn new() -> Self {
        Self { fallback: None }
    }

    /// Classifier with a probabilistic judge for ambiguous queries.
    pub fn with_fallback(judge: Arc<dyn Judge>) -> Self {
        Self {
            fallback: Some(judge),
        }
    }

    /// Classify a query. Never fails: every error path resolves to
    /// Semantic, the broader strategy.
    pub async fn classify(&self, query: &str) -> QueryKind {
        match rule_classify(query) {
            RuleVerdict::Structured => QueryKind::Structured,
            RuleVerdict::Semantic => QueryKind::Semantic,
            RuleVerdict::Unknown => self.escalate(query).await,
        }
    }

    async fn escalate(&self, query: &str) -> QueryKind {
        let Some(judge) = &self.fallback else {
            return QueryKind::Semantic;
        };

        let user_prompt = format!("Classify this query: {query}");
        match judge.evaluate(CLASSIFIER_SYSTEM_PROMPT, &user_prompt).await {
            Ok(response) => match response.trim().to_lowercase().as_str() {
                "structured" => QueryKind::Structured,
                "semantic" => QueryKind::Semantic,
                other => {
                    tracing::warn!("classifier judge returned invalid label {other:?}");
                    QueryKind::Semantic
                }
            },
            Err(e) => {
                tracing::warn!("classifier judge failed: {e}");
                QueryKind::Semantic
            }
        }
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new()
    }
}
