//! Highlight data models.
//!
//! A highlight is anchored by the literal text the user selected, never by a
//! character offset: document content may be regenerated upstream and the
//! matcher re-locates every highlight on each render.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    Yellow,
    Green,
    Blue,
}

impl Default for HighlightColor {
    fn default() -> Self {
        HighlightColor::Yellow
    }
}

impl HighlightColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightColor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yellow" => Ok(HighlightColor::Yellow),
            "green" => Ok(HighlightColor::Green),
            "blue" => Ok(HighlightColor::Blue),
            other => Err(format!("unknown highlight color '{other}'")),
        }
    }
}

/// Ordered set of free-text labels.
///
/// Comma-delimited at the storage boundary; entries are trimmed, blanks are
/// dropped and the first spelling of a duplicate wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = Self::default();
        for label in labels {
            tags.insert(label.as_ref());
        }
        tags
    }

    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// Commas delimit labels in storage, so `"a,b"` inserts two labels.
    /// Returns false when nothing new was added.
    pub fn insert(&mut self, label: &str) -> bool {
        let mut added = false;
        for part in label.split(',') {
            let part = part.trim();
            if part.is_empty() || self.0.iter().any(|existing| existing == part) {
                continue;
            }
            self.0.push(part.to_string());
            added = true;
        }
        added
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_delimited(&self) -> String {
        self.0.join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub color: HighlightColor,
    pub tags: Tags,
    pub created_at: DateTime<Utc>,
}
