//! Semantic judge contract
//!
//! An external LLM-backed evaluator consumed by the classifier fallback
//! and the candidate verifier. The engine only sees raw response text;
//! each caller parses what it needs and treats malformed output as a
//! negative outcome rather than an error.

use async_trait::async_trait;
use thiserror::Error;

/// A judge call that could not produce a response.
#[derive(Debug, Error)]
#[error("judge call failed: {0}")]
pub struct JudgeError(pub String);

impl JudgeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// External semantic evaluator.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Evaluate a prompt pair and return the raw model response.
    async fn evaluate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, JudgeError>;
}
