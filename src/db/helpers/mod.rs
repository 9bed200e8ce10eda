use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::{DocumentKind, HighlightColor};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} value {value} is out of range"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_color(value: &str) -> Result<HighlightColor> {
    value.parse().map_err(|err: String| anyhow!(err))
}

pub fn parse_kind(value: &str) -> Result<DocumentKind> {
    value.parse().map_err(|err: String| anyhow!(err))
}

pub fn parse_recall_score(value: Option<i64>) -> Result<Option<u8>> {
    match value {
        Some(raw) if (0..=100).contains(&raw) => Ok(Some(raw as u8)),
        Some(raw) => Err(anyhow!("recall_score {raw} is outside 0-100")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_score_bounds() {
        assert_eq!(parse_recall_score(None).unwrap(), None);
        assert_eq!(parse_recall_score(Some(100)).unwrap(), Some(100));
        assert!(parse_recall_score(Some(101)).is_err());
        assert!(parse_recall_score(Some(-1)).is_err());
    }

    #[test]
    fn integer_conversions_reject_out_of_range() {
        assert!(to_i64(u64::MAX).is_err());
        assert!(to_u64(-3, "duration_seconds").is_err());
        assert_eq!(to_u32(7, "distraction_count").unwrap(), 7);
    }

    #[test]
    fn datetimes_round_trip_rfc3339() {
        let now = Utc::now();
        let parsed = parse_datetime(&now.to_rfc3339(), "created_at").unwrap();
        assert_eq!(parsed, now);
        assert!(parse_datetime("yesterday", "created_at").is_err());
    }
}
