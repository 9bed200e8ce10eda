//! Storage contract consumed by the reader components.
//!
//! The highlight store and the session flusher only see this trait, so the
//! SQLite database, a remote API or a test double can sit behind them.

use anyhow::Result;
use async_trait::async_trait;

use crate::db::{
    models::{Document, Highlight, SessionRecord},
    Database,
};

#[async_trait]
pub trait Persistence: Send + Sync {
    async fn save_highlight(&self, highlight: &Highlight) -> Result<()>;

    async fn save_session(&self, record: &SessionRecord) -> Result<()>;

    /// Removes the document and everything hanging off it.
    async fn delete_document_cascade(&self, document_id: &str) -> Result<()>;

    async fn load_highlights(&self, document_id: &str) -> Result<Vec<Highlight>>;

    async fn load_document(&self, document_id: &str) -> Result<Option<Document>>;
}

#[async_trait]
impl Persistence for Database {
    async fn save_highlight(&self, highlight: &Highlight) -> Result<()> {
        self.insert_highlight(highlight).await
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        self.insert_session(record).await
    }

    async fn delete_document_cascade(&self, document_id: &str) -> Result<()> {
        self.delete_document(document_id).await
    }

    async fn load_highlights(&self, document_id: &str) -> Result<Vec<Highlight>> {
        self.get_highlights_for_document(document_id).await
    }

    async fn load_document(&self, document_id: &str) -> Result<Option<Document>> {
        self.get_document(document_id).await
    }
}
