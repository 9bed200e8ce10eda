use anyhow::{bail, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_kind},
    models::Document,
    Database,
};

fn row_to_document(row: &Row) -> Result<Document> {
    let kind: String = row.get("kind")?;
    let created_at: String = row.get("created_at")?;

    Ok(Document {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        kind: parse_kind(&kind)?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_document(&self, document: &Document) -> Result<()> {
        let record = document.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO documents (id, title, content, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.title,
                    record.content,
                    record.kind.as_str(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        let document_id = document_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, kind, created_at
                 FROM documents
                 WHERE id = ?1",
            )?;

            let document = stmt
                .query_row(params![document_id], |row| Ok(row_to_document(row)))
                .optional()?
                .transpose()?;
            Ok(document)
        })
        .await
    }

    /// Newest first, like the dashboard list.
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, kind, created_at
                 FROM documents
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut documents = Vec::new();
            while let Some(row) = rows.next()? {
                documents.push(row_to_document(row)?);
            }

            Ok(documents)
        })
        .await
    }

    /// Delete a document together with its highlights and study sessions.
    ///
    /// The foreign keys cascade as well; the explicit deletes keep databases
    /// created with `foreign_keys` off consistent.
    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let document_id = document_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM highlights WHERE document_id = ?1",
                params![document_id],
            )?;
            tx.execute(
                "DELETE FROM study_sessions WHERE document_id = ?1",
                params![document_id],
            )?;
            let rows_affected =
                tx.execute("DELETE FROM documents WHERE id = ?1", params![document_id])?;

            if rows_affected == 0 {
                bail!("Document not found");
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }
}
