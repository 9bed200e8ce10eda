//! Study session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary persisted once per reading-view lifecycle. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub document_id: String,
    pub duration_seconds: u64,
    pub distraction_count: u32,
    /// 0-100, absent when no recall evaluation happened during the session.
    pub recall_score: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate numbers for the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub total_documents: u64,
    pub total_highlights: u64,
    pub average_recall: f64,
    pub total_seconds: u64,
    pub total_distractions: u64,
}
