use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_recall_score, to_i64, to_u32, to_u64},
    models::{SessionRecord, StudyStats},
    Database,
};

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let duration_seconds: i64 = row.get("duration_seconds")?;
    let distraction_count: i64 = row.get("distraction_count")?;
    let recall_score: Option<i64> = row.get("recall_score")?;
    let created_at: String = row.get("created_at")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        document_id: row.get("document_id")?,
        duration_seconds: to_u64(duration_seconds, "duration_seconds")?,
        distraction_count: to_u32(distraction_count, "distraction_count")?,
        recall_score: parse_recall_score(recall_score)?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO study_sessions (id, document_id, duration_seconds, distraction_count, recall_score, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.document_id,
                    to_i64(record.duration_seconds)?,
                    record.distraction_count,
                    record.recall_score,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_sessions_for_document(&self, document_id: &str) -> Result<Vec<SessionRecord>> {
        let document_id = document_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, document_id, duration_seconds, distraction_count, recall_score, created_at
                 FROM study_sessions
                 WHERE document_id = ?1
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query(params![document_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn study_stats(&self) -> Result<StudyStats> {
        self.execute(|conn| {
            let total_documents: i64 =
                conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
            let total_highlights: i64 =
                conn.query_row("SELECT COUNT(*) FROM highlights", [], |row| row.get(0))?;
            let (total_seconds, total_distractions, average_recall): (i64, i64, Option<f64>) = conn
                .query_row(
                    "SELECT COALESCE(SUM(duration_seconds), 0),
                            COALESCE(SUM(distraction_count), 0),
                            AVG(recall_score)
                     FROM study_sessions",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;

            Ok(StudyStats {
                total_documents: to_u64(total_documents, "total_documents")?,
                total_highlights: to_u64(total_highlights, "total_highlights")?,
                average_recall: average_recall.unwrap_or(0.0),
                total_seconds: to_u64(total_seconds, "total_seconds")?,
                total_distractions: to_u64(total_distractions, "total_distractions")?,
            })
        })
        .await
    }
}
