//! Contract for the AI collaborator that produces study aids.
//!
//! The reader only decides *what* text goes to the assistant; prompting and
//! transport live behind [`Assistant`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::models::Highlight;

const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallEvaluation {
    /// Nominally 0-100; models occasionally answer outside that range.
    pub score: f64,
    #[serde(default)]
    pub missing_points: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

impl RecallEvaluation {
    /// Score rounded and clamped into the 0-100 range stored with sessions.
    pub fn percent(&self) -> u8 {
        if self.score.is_nan() {
            return 0;
        }
        self.score.round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateChallenge {
    pub challenge: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateTurn {
    pub evaluation: String,
    pub rebuttal: String,
    #[serde(alias = "isResolved", default)]
    pub resolved: bool,
}

#[async_trait]
pub trait Assistant: Send + Sync {
    async fn summarize(&self, context: &str) -> Result<String>;

    async fn flashcards(&self, context: &str) -> Result<Vec<Flashcard>>;

    async fn evaluate_recall(&self, concept: &str, explanation: &str) -> Result<RecallEvaluation>;

    /// Rewrites a selection in plain language.
    async fn simplify(&self, text: &str) -> Result<String>;

    async fn debate_challenge(&self, concept: &str) -> Result<DebateChallenge>;

    async fn debate_continue(&self, challenge: &str, argument: &str) -> Result<DebateTurn>;
}

/// Text handed to the assistant: the user's highlights when there are any,
/// otherwise the whole document.
pub fn study_context(highlights: &[Highlight], content: &str) -> String {
    let texts: Vec<&str> = highlights
        .iter()
        .map(|h| h.text.as_str())
        .filter(|text| !text.trim().is_empty())
        .collect();

    if texts.is_empty() {
        content.to_string()
    } else {
        texts.join(CONTEXT_SEPARATOR)
    }
}
