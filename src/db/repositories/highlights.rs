use anyhow::{anyhow, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_color, parse_datetime},
    models::{Highlight, Tags},
    Database,
};

fn row_to_highlight(row: &Row) -> Result<Highlight> {
    let color: String = row.get("color")?;
    let tags: String = row.get("tags")?;
    let created_at: String = row.get("created_at")?;

    Ok(Highlight {
        id: row.get("id")?,
        document_id: row.get("document_id")?,
        text: row.get("text")?,
        color: parse_color(&color)?,
        tags: Tags::parse(&tags),
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_highlight(&self, highlight: &Highlight) -> Result<()> {
        let record = highlight.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO highlights (id, document_id, text, color, tags, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.document_id,
                    record.text,
                    record.color.as_str(),
                    record.tags.to_delimited(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Highlights of one document in reading order (oldest first).
    pub async fn get_highlights_for_document(&self, document_id: &str) -> Result<Vec<Highlight>> {
        let document_id = document_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, document_id, text, color, tags, created_at
                 FROM highlights
                 WHERE document_id = ?1
                 ORDER BY created_at ASC",
            )?;

            let mut rows = stmt.query(params![document_id])?;
            let mut highlights = Vec::new();
            while let Some(row) = rows.next()? {
                highlights.push(row_to_highlight(row)?);
            }

            Ok(highlights)
        })
        .await
    }

    /// Every highlight across documents, newest first.
    pub async fn list_highlights(&self) -> Result<Vec<Highlight>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, document_id, text, color, tags, created_at
                 FROM highlights
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut highlights = Vec::new();
            while let Some(row) = rows.next()? {
                highlights.push(row_to_highlight(row)?);
            }

            Ok(highlights)
        })
        .await
    }

    pub async fn delete_highlight(&self, highlight_id: &str) -> Result<()> {
        let highlight_id = highlight_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM highlights WHERE id = ?1",
                params![highlight_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Highlight not found"));
            }

            Ok(())
        })
        .await
    }
}
