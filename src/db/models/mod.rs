pub mod document;
pub mod highlight;
pub mod session;

pub use document::{Document, DocumentBody, DocumentKind};
pub use highlight::{Highlight, HighlightColor, Tags};
pub use session::{SessionRecord, StudyStats};
