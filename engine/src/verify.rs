//! Judge-based candidate verification
//!
//! Fans independent per-candidate evaluations across a bounded worker
//! pool. Each evaluation carries its own timeout and every failure mode
//! (timeout, malformed response, transport error, panicked task) becomes
//! a negative verdict for that one candidate; the batch never aborts.

use async_trait::async_trait;
use lexfind_corpus::ProfileStore;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::judge::Judge;

/// Verdict for a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub profile_id: i64,
    pub passed: bool,
    pub rationale: String,
}

/// Optional slower text source consulted when the store has no cached
/// text for a candidate.
#[async_trait]
pub trait ProfileTextSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Worker-pool and per-call limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Maximum concurrent judge calls
    pub max_concurrency: usize,
    /// Per-evaluation timeout
    pub call_timeout: Duration,
    /// Profile text cap, in characters, to respect judge context limits
    pub max_profile_chars: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 15,
            call_timeout: Duration::from_secs(30),
            max_profile_chars: 3000,
        }
    }
}

const VERIFY_SYSTEM_PROMPT: &str = r#"You are evaluating whether a lawyer's profile matches a specific search query.

Focus on the EXPERIENCE section and any relevant work mentioned in their profile.
Be precise - only return "Pass" if the profile clearly indicates they have the requested experience.

For queries about specific companies or industries:
- Look for explicit mentions of those companies/industries
- Consider related terms (e.g., "TV network" includes CNN, NBC, Fox, ABC, CBS, etc.)
- Look for relevant deal types or case descriptions

Respond in the following format:
<thinking>Analyze the profile and query step by step</thinking>
<answer>Pass or Fail</answer>"#;

/// Parallel per-candidate verifier.
pub struct JudgeVerifier {
    store: Arc<ProfileStore>,
    judge: Arc<dyn Judge>,
    text_source: Option<Arc<dyn ProfileTextSource>>,
    config: VerifierConfig,
}

impl JudgeVerifier {
    pub fn new(store: Arc<ProfileStore>, judge: Arc<dyn Judge>) -> Self {
        Self {
            store,
            judge,
            text_source: None,
            config: VerifierConfig::default(),
        }
    }

    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_text_source(mut self, source: Arc<dyn ProfileTextSource>) -> Self {
        self.text_source = Some(source);
        self
    }

    /// Evaluate every candidate against the query.
    ///
    /// Returns one verdict per candidate, failed ones included, sorted by
    /// display name (concurrent completion order is not meaningful).
    pub async fn verify(&self, candidates: &[i64], query: &str) -> Vec<JudgeVerdict> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut handles = Vec::with_capacity(candidates.len());

        for &profile_id in candidates {
            let semaphore = Arc::clone(&semaphore);
            let store = Arc::clone(&self.store);
            let judge = Arc::clone(&self.judge);
            let text_source = self.text_source.clone();
            let config = self.config.clone();
            let query = query.to_string();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return JudgeVerdict {
                            profile_id,
                            passed: false,
                            rationale: "worker pool closed".to_string(),
                        }
                    }
                };
                evaluate_candidate(profile_id, &query, store, judge, text_source, &config).await
            });
            handles.push((profile_id, handle));
        }

        let mut verdicts = Vec::with_capacity(handles.len());
        for (profile_id, handle) in handles {
            match handle.await {
                Ok(verdict) => verdicts.push(verdict),
                Err(e) => {
                    tracing::warn!("evaluation task for {profile_id} aborted: {e}");
                    verdicts.push(JudgeVerdict {
                        profile_id,
                        passed: false,
                        rationale: format!("evaluation task aborted: {e}"),
                    });
                }
            }
        }

        // Deterministic order regardless of completion interleaving
        let mut keyed: Vec<(String, JudgeVerdict)> = verdicts
            .into_iter()
            .map(|verdict| {
                let name = self
                    .store
                    .display_name(verdict.profile_id)
                    .unwrap_or_default();
                (name, verdict)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.profile_id.cmp(&b.1.profile_id)));
        keyed.into_iter().map(|(_, verdict)| verdict).collect()
    }
}

async fn evaluate_candidate(
    profile_id: i64,
    query: &str,
    store: Arc<ProfileStore>,
    judge: Arc<dyn Judge>,
    text_source: Option<Arc<dyn ProfileTextSource>>,
    config: &VerifierConfig,
) -> JudgeVerdict {
    let profile_text = match store.cached_text(profile_id) {
        Some(text) => text,
        None => {
            let fetched = match (&text_source, store.profile_url(profile_id)) {
                (Some(source), Some(url)) => source.fetch(&url).await,
                _ => None,
            };
            match fetched {
                Some(text) => text,
                None => {
                    return JudgeVerdict {
                        profile_id,
                        passed: false,
                        rationale: "no profile text available".to_string(),
                    }
                }
            }
        }
    };

    let excerpt = truncate_chars(&profile_text, config.max_profile_chars);
    let user_prompt = format!(
        "Query: {query}\n\nLawyer Profile:\n{excerpt}\n\nDoes this lawyer's experience match the query?"
    );

    match timeout(
        config.call_timeout,
        judge.evaluate(VERIFY_SYSTEM_PROMPT, &user_prompt),
    )
    .await
    {
        Ok(Ok(response)) => parse_verdict(profile_id, &response),
        Ok(Err(e)) => {
            tracing::warn!("judge call failed for candidate {profile_id}: {e}");
            JudgeVerdict {
                profile_id,
                passed: false,
                rationale: format!("evaluation failed: {e}"),
            }
        }
        Err(_) => {
            tracing::warn!("judge call timed out for candidate {profile_id}");
            JudgeVerdict {
                profile_id,
                passed: false,
                rationale: format!("evaluation timed out after {:?}", config.call_timeout),
            }
        }
    }
}

fn parse_verdict(profile_id: i64, response: &str) -> JudgeVerdict {
    let rationale = between(response, "<thinking>", "</thinking>")
        .unwrap_or_default()
        .trim()
        .to_string();

    match between(response, "<answer>", "</answer>") {
        Some(answer) => JudgeVerdict {
            profile_id,
            passed: answer.trim().eq_ignore_ascii_case("pass"),
            rationale,
        },
        None => JudgeVerdict {
            profile_id,
            passed: false,
            rationale: if rationale.is_empty() {
                "judge response missing verdict tag".to_string()
            } else {
                rationale
            },
        },
    }
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::JudgeError;
    use lexfind_corpus::ProfileRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Judge that passes candidates whose profile text contains "match",
    /// with per-marker overrides for failure modes.
    struct MarkerJudge {
        error_marker: Option<String>,
        slow_marker: Option<String>,
        malformed_marker: Option<String>,
        concurrent: AtomicUsize,
        max_concurrent: AtomicUsize,
        calls: AtomicUsize,
    }

    impl MarkerJudge {
        fn new() -> Self {
            Self {
                error_marker: None,
                slow_marker: None,
                malformed_marker: None,
                concurrent: AtomicUsize::new(0),
                max_concurrent: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        fn erroring_on(marker: &str) -> Self {
            Self {
                error_marker: Some(marker.to_string()),
                ..Self::new()
            }
        }

        fn slow_on(marker: &str) -> Self {
            Self {
                slow_marker: Some(marker.to_string()),
                ..Self::new()
            }
        }

        fn malformed_on(marker: &str) -> Self {
            Self {
                malformed_marker: Some(marker.to_string()),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Judge for MarkerJudge {
        async fn evaluate(&self, _system: &str, user: &str) -> Result<String, JudgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(10)).await;

            if let Some(marker) = &self.slow_marker {
                if user.contains(marker.as_str()) {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }

            self.concurrent.fetch_sub(1, Ordering::SeqCst);

            if let Some(marker) = &self.error_marker {
                if user.contains(marker.as_str()) {
                    return Err(JudgeError::new("simulated transport failure"));
                }
            }
            if let Some(marker) = &self.malformed_marker {
                if user.contains(marker.as_str()) {
                    return Ok("I cannot answer that.".to_string());
                }
            }

            if user.contains("match") {
                Ok("<thinking>The profile shows the requested experience.</thinking>\n<answer>Pass</answer>".to_string())
            } else {
                Ok("<thinking>Nothing relevant in the profile.</thinking>\n<answer>Fail</answer>"
                    .to_string())
            }
        }
    }

    fn seeded_store(count: usize, text_for: impl Fn(usize) -> Option<String>) -> (Arc<ProfileStore>, Vec<i64>) {
        let store = ProfileStore::in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..count {
            let id = store
                .add_profile(
                    &ProfileRecord::builder()
                        .url(format!("https://example.com/{i}"))
                        .name(format!("Person {i:02}"))
                        .build()
                        .unwrap(),
                )
                .unwrap();
            if let Some(text) = text_for(i) {
                store.save_experience(id, &text, "").unwrap();
            }
            ids.push(id);
        }
        (Arc::new(store), ids)
    }

    #[tokio::test]
    async fn test_all_candidates_get_verdicts() {
        let (store, ids) =
            seeded_store(4, |i| Some(format!("profile {i}: match streaming work")));
        let verifier = JudgeVerifier::new(store, Arc::new(MarkerJudge::new()));

        let verdicts = verifier.verify(&ids, "streaming work").await;
        assert_eq!(verdicts.len(), 4);
        assert!(verdicts.iter().all(|v| v.passed));
        assert!(verdicts.iter().all(|v| !v.rationale.is_empty()));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_others() {
        let (store, ids) = seeded_store(10, |i| {
            if i == 3 {
                Some("profile poison match".to_string())
            } else {
                Some(format!("profile {i}: match"))
            }
        });
        let verifier =
            JudgeVerifier::new(Arc::clone(&store), Arc::new(MarkerJudge::erroring_on("poison")));

        let verdicts = verifier.verify(&ids, "anything").await;
        assert_eq!(verdicts.len(), 10);

        let failed: Vec<_> = verdicts.iter().filter(|v| !v.passed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].profile_id, ids[3]);
        assert!(!failed[0].rationale.is_empty());
        assert!(failed[0].rationale.contains("evaluation failed"));

        assert_eq!(verdicts.iter().filter(|v| v.passed).count(), 9);
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_verdict() {
        let (store, ids) = seeded_store(3, |i| {
            if i == 1 {
                Some("profile sluggish match".to_string())
            } else {
                Some(format!("profile {i}: match"))
            }
        });
        let verifier = JudgeVerifier::new(store, Arc::new(MarkerJudge::slow_on("sluggish")))
            .with_config(VerifierConfig {
                call_timeout: Duration::from_millis(100),
                ..VerifierConfig::default()
            });

        let verdicts = verifier.verify(&ids, "anything").await;
        let failed: Vec<_> = verdicts.iter().filter(|v| !v.passed).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].rationale.contains("timed out"));
    }

    #[tokio::test]
    async fn test_malformed_response_fails_candidate() {
        let (store, ids) = seeded_store(2, |i| {
            if i == 0 {
                Some("profile garbled match".to_string())
            } else {
                Some("profile ok match".to_string())
            }
        });
        let verifier =
            JudgeVerifier::new(store, Arc::new(MarkerJudge::malformed_on("garbled")));

        let verdicts = verifier.verify(&ids, "anything").await;
        let failed: Vec<_> = verdicts.iter().filter(|v| !v.passed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].profile_id, ids[0]);
        assert!(!failed[0].rationale.is_empty());
    }

    #[tokio::test]
    async fn test_no_text_no_source_fails_candidate() {
        let (store, ids) = seeded_store(1, |_| None);
        let verifier = JudgeVerifier::new(store, Arc::new(MarkerJudge::new()));

        let verdicts = verifier.verify(&ids, "anything").await;
        assert!(!verdicts[0].passed);
        assert_eq!(verdicts[0].rationale, "no profile text available");
    }

    #[tokio::test]
    async fn test_text_source_fallback() {
        struct CannedSource;

        #[async_trait]
        impl ProfileTextSource for CannedSource {
            async fn fetch(&self, url: &str) -> Option<String> {
                Some(format!("fetched from {url}: match"))
            }
        }

        let (store, ids) = seeded_store(1, |_| None);
        let verifier = JudgeVerifier::new(store, Arc::new(MarkerJudge::new()))
            .with_text_source(Arc::new(CannedSource));

        let verdicts = verifier.verify(&ids, "anything").await;
        assert!(verdicts[0].passed);
    }

    #[tokio::test]
    async fn test_verdicts_sorted_by_display_name() {
        let (store, mut ids) = seeded_store(5, |i| Some(format!("profile {i}: match")));
        ids.reverse();
        let verifier = JudgeVerifier::new(Arc::clone(&store), Arc::new(MarkerJudge::new()));

        let verdicts = verifier.verify(&ids, "anything").await;
        let names: Vec<String> = verdicts
            .iter()
            .map(|v| store.display_name(v.profile_id).unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let (store, ids) = seeded_store(8, |i| Some(format!("profile {i}: match")));
        let judge = Arc::new(MarkerJudge::new());
        let verifier = JudgeVerifier::new(store, judge.clone()).with_config(VerifierConfig {
            max_concurrency: 2,
            ..VerifierConfig::default()
        });

        verifier.verify(&ids, "anything").await;
        assert!(judge.max_concurrent.load(Ordering::SeqCst) <= 2);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let (store, _) = seeded_store(0, |_| None);
        let verifier = JudgeVerifier::new(store, Arc::new(MarkerJudge::new()));

        assert!(verifier.verify(&[], "anything").await.is_empty());
    }

    #[test]
    fn test_parse_verdict_pass() {
        let verdict = parse_verdict(
            1,
            "<thinking>Clear experience.</thinking>\n<answer>Pass</answer>",
        );
        assert!(verdict.passed);
        assert_eq!(verdict.rationale, "Clear experience.");
    }

    #[test]
    fn test_parse_verdict_case_insensitive() {
        assert!(parse_verdict(1, "<answer>pass</answer>").passed);
        assert!(!parse_verdict(1, "<answer>FAIL</answer>").passed);
    }

    #[test]
    fn test_parse_verdict_missing_tags() {
        let verdict = parse_verdict(1, "no tags here");
        assert!(!verdict.passed);
        assert!(!verdict.rationale.is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte characters must not be split
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
