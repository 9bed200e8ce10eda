pub mod blocks;
pub mod matcher;
pub mod store;

pub use blocks::{parse_blocks, render_blocks, Block, BlockKind, RenderedBlock};
pub use matcher::{plain_text, render, Segment, SpanMatcher};
pub use store::{HighlightStore, PendingHighlight, SortOrder};
