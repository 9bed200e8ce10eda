use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
    Url,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
            DocumentKind::Url => "url",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pdf" => Ok(DocumentKind::Pdf),
            "text" => Ok(DocumentKind::Text),
            "url" => Ok(DocumentKind::Url),
            other => Err(format!("unknown document kind '{other}'")),
        }
    }
}

/// Imported study material. The reader only ever borrows `content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub kind: DocumentKind,
    pub created_at: DateTime<Utc>,
}

/// What the reading view can do with a document's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentBody<'a> {
    Empty,
    /// A raw `data:` URI left behind by an upload that was never extracted.
    Binary,
    Text(&'a str),
}

impl Document {
    pub fn body(&self) -> DocumentBody<'_> {
        if self.content.trim().is_empty() {
            DocumentBody::Empty
        } else if self.content.starts_with("data:") {
            DocumentBody::Binary
        } else {
            DocumentBody::Text(&self.content)
        }
    }
}
