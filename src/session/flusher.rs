use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    db::models::SessionRecord, error::StudyError, focus::FocusSnapshot, persistence::Persistence,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const MAX_RECALL_SCORE: u8 = 100;

#[derive(Debug)]
pub enum FlushOutcome {
    AlreadyFlushed,
    /// The session was too short to be worth keeping.
    Skipped { elapsed_seconds: u64 },
    /// The save is running in the background. Awaiting the handle is optional;
    /// it resolves to whether the record was stored.
    Submitted {
        record: SessionRecord,
        handle: JoinHandle<bool>,
    },
}

/// Emits at most one session record per reading view.
pub struct SessionFlusher {
    persistence: Arc<dyn Persistence>,
    min_session_secs: u64,
    flushed: AtomicBool,
}

impl SessionFlusher {
    pub fn new(persistence: Arc<dyn Persistence>, min_session_secs: u64) -> Self {
        Self {
            persistence,
            min_session_secs,
            flushed: AtomicBool::new(false),
        }
    }

    /// Must be called from within a tokio runtime. Never fails: storage errors
    /// are logged and dropped since the view is already gone.
    pub fn flush(
        &self,
        document_id: &str,
        snapshot: FocusSnapshot,
        recall_score: Option<u8>,
    ) -> FlushOutcome {
        if self.flushed.swap(true, Ordering::SeqCst) {
            return FlushOutcome::AlreadyFlushed;
        }

        if snapshot.elapsed_seconds < self.min_session_secs {
            log_info!(
                "Skipping {}s session for document {document_id}",
                snapshot.elapsed_seconds
            );
            return FlushOutcome::Skipped {
                elapsed_seconds: snapshot.elapsed_seconds,
            };
        }

        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            duration_seconds: snapshot.elapsed_seconds,
            distraction_count: snapshot.distraction_count,
            recall_score: recall_score.map(|score| score.min(MAX_RECALL_SCORE)),
            created_at: Utc::now(),
        };

        let persistence = Arc::clone(&self.persistence);
        let saved = record.clone();
        let handle = tokio::spawn(async move {
            match persistence.save_session(&saved).await {
                Ok(()) => {
                    log_info!(
                        "Saved session {} ({}s, {} distractions)",
                        saved.id,
                        saved.duration_seconds,
                        saved.distraction_count
                    );
                    true
                }
                Err(err) => {
                    let err = StudyError::SessionFlush(format!("{err:#}"));
                    log_error!("Dropping session {}: {err}", saved.id);
                    false
                }
            }
        });

        FlushOutcome::Submitted { record, handle }
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed.load(Ordering::SeqCst)
    }
}
