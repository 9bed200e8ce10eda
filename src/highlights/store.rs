use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    db::models::{Highlight, HighlightColor, Tags},
    error::{StudyError, StudyResult},
    persistence::Persistence,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Reading view: oldest first.
    Ascending,
    /// Aggregate views: newest first.
    Descending,
}

/// Highlight appended to the store whose save may still be in flight.
pub struct PendingHighlight {
    pub highlight: Highlight,
    save: JoinHandle<anyhow::Result<()>>,
}

impl PendingHighlight {
    /// Waits for the save. On failure the highlight stays in the store; the
    /// caller decides whether to roll it back with [`HighlightStore::delete`].
    pub async fn confirmed(self) -> StudyResult<Highlight> {
        let outcome = match self.save.await {
            Ok(result) => result,
            Err(join_err) => Err(anyhow::anyhow!("save task aborted: {join_err}")),
        };

        match outcome {
            Ok(()) => Ok(self.highlight),
            Err(err) => {
                log_error!("Failed to save highlight {}: {err:#}", self.highlight.id);
                Err(StudyError::persistence("save_highlight", err))
            }
        }
    }
}

/// In-memory highlights for the one document currently open.
pub struct HighlightStore {
    document_id: String,
    highlights: Vec<Highlight>,
    persistence: Arc<dyn Persistence>,
}

impl HighlightStore {
    pub fn new(document_id: impl Into<String>, persistence: Arc<dyn Persistence>) -> StudyResult<Self> {
        let document_id = document_id.into();
        if document_id.trim().is_empty() {
            return Err(StudyError::Validation("document id must not be empty".into()));
        }

        Ok(Self {
            document_id,
            highlights: Vec::new(),
            persistence,
        })
    }

    pub async fn load(
        document_id: impl Into<String>,
        persistence: Arc<dyn Persistence>,
    ) -> StudyResult<Self> {
        let mut store = Self::new(document_id, persistence)?;
        let mut loaded = store
            .persistence
            .load_highlights(&store.document_id)
            .await
            .map_err(|err| StudyError::persistence("load_highlights", err))?;

        loaded.retain(|h| h.document_id == store.document_id);
        loaded.sort_by_key(|h| h.created_at);
        store.highlights = loaded;

        log_info!(
            "Loaded {} highlights for document {}",
            store.highlights.len(),
            store.document_id
        );
        Ok(store)
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Appends a highlight and starts saving it.
    ///
    /// The selection is trimmed; blank selections are rejected before anything
    /// changes. Must be called from within a tokio runtime.
    pub fn add(&mut self, text: &str, color: HighlightColor, tags: Tags) -> StudyResult<PendingHighlight> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StudyError::Validation("highlight text must not be empty".into()));
        }

        let highlight = Highlight {
            id: Uuid::new_v4().to_string(),
            document_id: self.document_id.clone(),
            text: text.to_string(),
            color,
            tags,
            created_at: Utc::now(),
        };
        self.highlights.push(highlight.clone());

        let persistence = Arc::clone(&self.persistence);
        let record = highlight.clone();
        let save = tokio::spawn(async move { persistence.save_highlight(&record).await });

        Ok(PendingHighlight { highlight, save })
    }

    /// Drops every highlight belonging to `document_id`. Returns how many went.
    pub fn remove(&mut self, document_id: &str) -> usize {
        let before = self.highlights.len();
        self.highlights.retain(|h| h.document_id != document_id);
        before - self.highlights.len()
    }

    /// Drops a single highlight from memory, e.g. to roll back a failed save.
    pub fn delete(&mut self, highlight_id: &str) -> Option<Highlight> {
        let index = self.highlights.iter().position(|h| h.id == highlight_id)?;
        Some(self.highlights.remove(index))
    }

    pub fn list_sorted(&self, order: SortOrder) -> Vec<Highlight> {
        let mut snapshot = self.highlights.clone();
        match order {
            SortOrder::Ascending => snapshot.sort_by_key(|h| h.created_at),
            SortOrder::Descending => snapshot.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        snapshot
    }

    /// Borrowed view in creation order, for rendering without a copy.
    pub fn as_slice(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn texts(&self) -> Vec<String> {
        self.list_sorted(SortOrder::Ascending)
            .into_iter()
            .map(|h| h.text)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::testing::MemoryPersistence;
    use chrono::{Duration, TimeZone};

    fn stored(id: &str, document_id: &str, text: &str, minute: u32) -> Highlight {
        Highlight {
            id: id.into(),
            document_id: document_id.into(),
            text: text.into(),
            color: HighlightColor::Blue,
            tags: Tags::default(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn add_appends_and_persists() {
        let persistence = Arc::new(MemoryPersistence::default());
        let mut store = HighlightStore::new("doc-1", persistence.clone()).unwrap();

        let pending = store
            .add("  wave function  ", HighlightColor::Green, Tags::parse("exam, quantum"))
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(pending.highlight.text, "wave function");

        let saved = pending.confirmed().await.unwrap();
        assert_eq!(persistence.highlights(), vec![saved.clone()]);
        assert_eq!(saved.document_id, "doc-1");
        assert_eq!(saved.tags.to_delimited(), "exam, quantum");
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_mutation() {
        let persistence = Arc::new(MemoryPersistence::default());
        let mut store = HighlightStore::new("doc-1", persistence.clone()).unwrap();

        let err = store.add(" \n ", HighlightColor::Yellow, Tags::default()).err();
        assert!(matches!(err, Some(StudyError::Validation(_))));
        assert!(store.is_empty());
        assert!(persistence.highlights().is_empty());
    }

    #[test]
    fn empty_document_id_is_rejected() {
        let persistence = Arc::new(MemoryPersistence::default());
        assert!(matches!(
            HighlightStore::new("  ", persistence),
            Err(StudyError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn failed_save_keeps_optimistic_highlight() {
        let persistence = Arc::new(MemoryPersistence::default());
        persistence.set_failing(true);
        let mut store = HighlightStore::new("doc-1", persistence.clone()).unwrap();

        let pending = store.add("entropy", HighlightColor::Yellow, Tags::default()).unwrap();
        let id = pending.highlight.id.clone();
        let err = pending.confirmed().await.unwrap_err();

        assert!(matches!(err, StudyError::PersistenceFailure { .. }));
        assert_eq!(store.len(), 1);

        // Rolling back is the caller's call.
        assert_eq!(store.delete(&id).map(|h| h.text), Some("entropy".to_string()));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn load_orders_by_creation_and_filters_other_documents() {
        let persistence = Arc::new(MemoryPersistence::default());
        {
            let mut rows = persistence.highlights.lock().unwrap();
            rows.push(stored("b", "doc-1", "second", 20));
            rows.push(stored("x", "doc-2", "elsewhere", 5));
            rows.push(stored("a", "doc-1", "first", 10));
        }

        let store = HighlightStore::load("doc-1", persistence).await.unwrap();
        let ids: Vec<String> = store
            .list_sorted(SortOrder::Ascending)
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.texts(), vec!["first", "second"]);

        let newest_first: Vec<String> = store
            .list_sorted(SortOrder::Descending)
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(newest_first, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn snapshots_are_detached_from_the_store() {
        let persistence = Arc::new(MemoryPersistence::default());
        let mut store = HighlightStore::new("doc-1", persistence).unwrap();
        store.add("one", HighlightColor::Yellow, Tags::default()).unwrap();

        let mut snapshot = store.list_sorted(SortOrder::Ascending);
        snapshot[0].text = "mutated".into();
        snapshot.clear();

        assert_eq!(store.texts(), vec!["one"]);
    }

    #[tokio::test]
    async fn remove_cascades_by_document() {
        let persistence = Arc::new(MemoryPersistence::default());
        let mut store = HighlightStore::new("doc-1", persistence).unwrap();
        store.add("one", HighlightColor::Yellow, Tags::default()).unwrap();
        store.add("two", HighlightColor::Green, Tags::default()).unwrap();

        assert_eq!(store.remove("doc-other"), 0);
        assert_eq!(store.remove("doc-1"), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn additions_keep_call_order() {
        let persistence = Arc::new(MemoryPersistence::default());
        let mut store = HighlightStore::new("doc-1", persistence).unwrap();
        for text in ["alpha", "beta", "gamma"] {
            store.add(text, HighlightColor::Yellow, Tags::default()).unwrap();
        }
        assert_eq!(store.texts(), vec!["alpha", "beta", "gamma"]);

        let base = store.list_sorted(SortOrder::Ascending)[0].created_at;
        assert!(store
            .list_sorted(SortOrder::Ascending)
            .iter()
            .all(|h| h.created_at >= base && h.created_at - base < Duration::seconds(5)));
    }
}
