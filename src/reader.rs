//! The reading view: one open document, its highlights and its focus session.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    assistant::{study_context, Assistant, DebateChallenge, DebateTurn, Flashcard, RecallEvaluation},
    db::models::{Document, DocumentBody, Highlight, HighlightColor, Tags},
    error::{StudyError, StudyResult},
    focus::{FocusConfig, FocusSnapshot, FocusStatus, FocusTracker},
    highlights::{render_blocks, HighlightStore, PendingHighlight, RenderedBlock, SortOrder},
    persistence::Persistence,
    session::{FlushOutcome, SessionFlusher},
    settings::StudySettings,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug)]
pub enum ReaderView<'a> {
    Empty,
    /// Raw upload that was never converted to text; nothing to mark.
    Binary,
    Blocks(Vec<RenderedBlock<'a, 'a>>),
}

pub struct Reader {
    document: Document,
    store: HighlightStore,
    tracker: FocusTracker,
    flusher: SessionFlusher,
    recall_score: Option<u8>,
    default_color: HighlightColor,
}

impl Reader {
    pub async fn open(
        document_id: &str,
        persistence: Arc<dyn Persistence>,
        settings: &StudySettings,
    ) -> StudyResult<Self> {
        let document = persistence
            .load_document(document_id)
            .await
            .map_err(|err| StudyError::persistence("load_document", err))?
            .ok_or_else(|| StudyError::NotFound(format!("document {document_id}")))?;

        let store = HighlightStore::load(document.id.clone(), Arc::clone(&persistence)).await?;

        log_info!(
            "Opened '{}' with {} highlights",
            document.title,
            store.len()
        );

        Ok(Self {
            document,
            store,
            tracker: FocusTracker::new(FocusConfig::from(settings)),
            flusher: SessionFlusher::new(persistence, settings.min_session_secs),
            recall_score: None,
            default_color: settings.default_color,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Subscribe to events or hand out a visibility sender through this.
    pub fn tracker(&self) -> &FocusTracker {
        &self.tracker
    }

    pub fn start(&self) -> StudyResult<()> {
        self.tracker.start()
    }

    pub fn render(&self) -> ReaderView<'_> {
        match self.document.body() {
            DocumentBody::Empty => ReaderView::Empty,
            DocumentBody::Binary => ReaderView::Binary,
            DocumentBody::Text(content) => {
                ReaderView::Blocks(render_blocks(content, self.store.as_slice()))
            }
        }
    }

    pub fn highlights(&self, order: SortOrder) -> Vec<Highlight> {
        self.store.list_sorted(order)
    }

    /// Records a selection. `tags` is the raw comma-separated input.
    pub fn add_highlight(
        &mut self,
        selection: &str,
        color: Option<HighlightColor>,
        tags: &str,
    ) -> StudyResult<PendingHighlight> {
        self.store.add(
            selection,
            color.unwrap_or(self.default_color),
            Tags::parse(tags),
        )
    }

    /// Clears highlights of a document deleted elsewhere while this view is
    /// open. Returns how many were dropped.
    pub fn forget_document(&mut self, document_id: &str) -> usize {
        let removed = self.store.remove(document_id);
        if removed > 0 {
            log_info!("Dropped {removed} highlights of deleted document {document_id}");
        }
        removed
    }

    /// Rolls back an optimistic highlight whose save failed.
    pub fn discard_highlight(&mut self, highlight_id: &str) -> Option<Highlight> {
        self.store.delete(highlight_id)
    }

    pub fn study_context(&self) -> String {
        study_context(self.store.as_slice(), &self.document.content)
    }

    /// Keeps the most recent evaluation's score for the session record.
    pub fn record_recall(&mut self, evaluation: &RecallEvaluation) {
        self.recall_score = Some(evaluation.percent());
    }

    pub fn recall_score(&self) -> Option<u8> {
        self.recall_score
    }

    pub async fn summarize(&self, assistant: &dyn Assistant) -> Result<String> {
        assistant
            .summarize(&self.study_context())
            .await
            .context("Failed to summarize document")
    }

    pub async fn flashcards(&self, assistant: &dyn Assistant) -> Result<Vec<Flashcard>> {
        assistant
            .flashcards(&self.study_context())
            .await
            .context("Failed to generate flashcards")
    }

    pub async fn simplify(&self, assistant: &dyn Assistant, selection: &str) -> Result<String> {
        let selection = selection.trim();
        if selection.is_empty() {
            return Err(StudyError::Validation("nothing selected to simplify".into()).into());
        }
        assistant
            .simplify(selection)
            .await
            .context("Failed to simplify selection")
    }

    pub async fn evaluate_recall(
        &mut self,
        assistant: &dyn Assistant,
        concept: &str,
        explanation: &str,
    ) -> Result<RecallEvaluation> {
        if concept.trim().is_empty() || explanation.trim().is_empty() {
            return Err(StudyError::Validation("concept and explanation are required".into()).into());
        }
        let evaluation = assistant
            .evaluate_recall(concept, explanation)
            .await
            .context("Failed to evaluate recall")?;
        self.record_recall(&evaluation);
        Ok(evaluation)
    }

    pub async fn debate(&self, assistant: &dyn Assistant, concept: &str) -> Result<DebateChallenge> {
        if concept.trim().is_empty() {
            return Err(StudyError::Validation("a concept is required to debate".into()).into());
        }
        assistant
            .debate_challenge(concept)
            .await
            .context("Failed to start debate")
    }

    pub async fn debate_reply(
        &self,
        assistant: &dyn Assistant,
        challenge: &DebateChallenge,
        argument: &str,
    ) -> Result<DebateTurn> {
        assistant
            .debate_continue(&challenge.challenge, argument)
            .await
            .context("Failed to continue debate")
    }

    /// Stops the tracker and emits the session record. Must be called from
    /// within a tokio runtime.
    pub fn close(self) -> (FocusSnapshot, FlushOutcome) {
        self.finish()
    }

    fn finish(&self) -> (FocusSnapshot, FlushOutcome) {
        let snapshot = self.tracker.stop();
        let outcome = self
            .flusher
            .flush(&self.document.id, snapshot, self.recall_score);
        (snapshot, outcome)
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        // A started view torn down without close() still gets its one record.
        if self.flusher.is_flushed() || self.tracker.status() != FocusStatus::Running {
            return;
        }
        if tokio::runtime::Handle::try_current().is_ok() {
            self.finish();
        } else {
            log_warn!(
                "Reader for {} dropped outside a runtime; session not saved",
                self.document.id
            );
            self.tracker.stop();
        }
    }
}
