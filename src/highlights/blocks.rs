//! Block-level rendering for the markdown dialect produced by the importer.
//!
//! Highlights are matched inside one block at a time, so a selection never
//! bleeds across a heading, a list item or a paragraph break.

use serde::Serialize;

use crate::db::models::Highlight;

use super::matcher::{Segment, SpanMatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Heading(u8),
    ListItem,
    Paragraph,
}

/// A block's text with its markup prefix stripped. Borrowed from the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'c> {
    pub kind: BlockKind,
    pub text: &'c str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock<'c, 'h> {
    pub kind: BlockKind,
    pub segments: Vec<Segment<'c, 'h>>,
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some((hashes as u8, rest.trim()))
}

fn list_item(line: &str) -> Option<&str> {
    line.strip_prefix("* ")
        .or_else(|| line.strip_prefix("- "))
        .map(str::trim)
}

fn flush_paragraph<'c>(
    content: &'c str,
    paragraph: &mut Option<(usize, usize)>,
    blocks: &mut Vec<Block<'c>>,
) {
    if let Some((start, end)) = paragraph.take() {
        blocks.push(Block {
            kind: BlockKind::Paragraph,
            text: &content[start..end],
        });
    }
}

pub fn parse_blocks(content: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    // Byte range of the paragraph being accumulated.
    let mut paragraph: Option<(usize, usize)> = None;
    let mut offset = 0;

    for raw in content.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();

        let line = raw.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();
        if trimmed.trim_end().is_empty() {
            flush_paragraph(content, &mut paragraph, &mut blocks);
            continue;
        }

        if let Some((level, text)) = heading(trimmed) {
            flush_paragraph(content, &mut paragraph, &mut blocks);
            if !text.is_empty() {
                blocks.push(Block {
                    kind: BlockKind::Heading(level),
                    text,
                });
            }
            continue;
        }

        if let Some(text) = list_item(trimmed) {
            flush_paragraph(content, &mut paragraph, &mut blocks);
            if !text.is_empty() {
                blocks.push(Block {
                    kind: BlockKind::ListItem,
                    text,
                });
            }
            continue;
        }

        let start = line_start + (line.len() - trimmed.len());
        let end = line_start + line.trim_end().len();
        paragraph = Some(match paragraph {
            Some((first, _)) => (first, end),
            None => (start, end),
        });
    }
    flush_paragraph(content, &mut paragraph, &mut blocks);

    blocks
}

/// Parses `content` into blocks and marks highlights inside each one, using a
/// single compiled matcher for the whole document.
pub fn render_blocks<'c, 'h>(
    content: &'c str,
    highlights: &'h [Highlight],
) -> Vec<RenderedBlock<'c, 'h>> {
    let matcher = SpanMatcher::new(highlights);
    parse_blocks(content)
        .into_iter()
        .map(|block| RenderedBlock {
            kind: block.kind,
            segments: match &matcher {
                Some(matcher) => matcher.segments(block.text),
                None => vec![Segment::Plain(block.text)],
            },
        })
        .collect()
}
