//! Re-locates saved highlights inside document content.
//!
//! Every usable highlight text is escaped and folded into one case-insensitive
//! alternation, longest text first, so a single left-to-right scan marks the
//! content. The regex engine prefers the earliest alternative at a given
//! position, which is what makes "quantum physics" win over "physics" when
//! both start at the same offset.

use regex::{Regex, RegexBuilder};

use crate::db::models::Highlight;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Generous compiled-size ceiling: case-insensitive Unicode literals expand
/// into character classes, and dozens of long selections add up.
const PATTERN_SIZE_LIMIT: usize = 64 * (1 << 20);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment<'c, 'h> {
    Plain(&'c str),
    Marked {
        text: &'c str,
        highlight: &'h Highlight,
    },
}

impl<'c, 'h> Segment<'c, 'h> {
    /// The content slice this segment covers, with its original casing.
    pub fn text(&self) -> &'c str {
        match self {
            Segment::Plain(text) => *text,
            Segment::Marked { text, .. } => *text,
        }
    }

    pub fn highlight(&self) -> Option<&'h Highlight> {
        match self {
            Segment::Plain(_) => None,
            Segment::Marked { highlight, .. } => Some(*highlight),
        }
    }

    pub fn is_marked(&self) -> bool {
        matches!(self, Segment::Marked { .. })
    }
}

/// Compiled matcher for one snapshot of the highlight collection.
#[derive(Debug)]
pub struct SpanMatcher<'h> {
    pattern: Regex,
    /// `owners[i]` is the highlight behind capture group `i + 1`.
    owners: Vec<&'h Highlight>,
}

impl<'h> SpanMatcher<'h> {
    /// Returns `None` when no highlight is usable or the combined pattern
    /// cannot be compiled; callers then render the content unmarked.
    pub fn new(highlights: &'h [Highlight]) -> Option<Self> {
        let mut owners: Vec<&'h Highlight> = Vec::with_capacity(highlights.len());
        let mut seen: Vec<String> = Vec::with_capacity(highlights.len());

        for highlight in highlights {
            if highlight.text.trim().is_empty() {
                continue;
            }
            // Identical texts collapse onto the earliest highlight.
            let folded = highlight.text.to_lowercase();
            if seen.contains(&folded) {
                continue;
            }
            seen.push(folded);
            owners.push(highlight);
        }

        if owners.is_empty() {
            return None;
        }

        // Stable sort: equal lengths keep creation order.
        owners.sort_by(|a, b| b.text.chars().count().cmp(&a.text.chars().count()));

        let alternation = owners
            .iter()
            .map(|highlight| format!("({})", regex::escape(&highlight.text)))
            .collect::<Vec<_>>()
            .join("|");

        match RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(pattern) => Some(Self { pattern, owners }),
            Err(err) => {
                log_warn!(
                    "highlight pattern for {} highlights failed to compile, rendering unmarked: {err}",
                    owners.len()
                );
                None
            }
        }
    }

    pub fn segments<'c>(&self, content: &'c str) -> Vec<Segment<'c, 'h>> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for captures in self.pattern.captures_iter(content) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let Some(owner) = captures
                .iter()
                .skip(1)
                .position(|group| group.is_some())
                .and_then(|index| self.owners.get(index).copied())
            else {
                continue;
            };

            if whole.start() > cursor {
                segments.push(Segment::Plain(&content[cursor..whole.start()]));
            }
            segments.push(Segment::Marked {
                text: whole.as_str(),
                highlight: owner,
            });
            cursor = whole.end();
        }

        if cursor < content.len() {
            segments.push(Segment::Plain(&content[cursor..]));
        }

        segments
    }
}

/// Splits `content` into plain and marked segments.
///
/// Concatenating the segment texts always reproduces `content`. Neither input
/// is modified, and the same inputs always produce the same output.
pub fn render<'c, 'h>(content: &'c str, highlights: &'h [Highlight]) -> Vec<Segment<'c, 'h>> {
    match SpanMatcher::new(highlights) {
        Some(matcher) => matcher.segments(content),
        None if content.is_empty() => Vec::new(),
        None => vec![Segment::Plain(content)],
    }
}

/// Joins segment texts back into the plain content they were cut from.
pub fn plain_text(segments: &[Segment<'_, '_>]) -> String {
    segments.iter().map(Segment::text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{HighlightColor, Tags};
    use chrono::{Duration, TimeZone, Utc};

    fn highlights(texts: &[&str]) -> Vec<Highlight> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Highlight {
                id: format!("h{i}"),
                document_id: "doc".into(),
                text: (*text).to_string(),
                color: HighlightColor::Yellow,
                tags: Tags::default(),
                created_at: base + Duration::seconds(i as i64),
            })
            .collect()
    }

    fn marked(segments: &[Segment<'_, '_>]) -> Vec<(String, String)> {
        segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Marked { text, highlight } => {
                    Some((text.to_string(), highlight.id.clone()))
                }
                Segment::Plain(_) => None,
            })
            .collect()
    }

    fn boundaries(segments: &[Segment<'_, '_>]) -> Vec<(usize, usize, bool)> {
        let mut offset = 0;
        segments
            .iter()
            .map(|segment| {
                let start = offset;
                offset += segment.text().len();
                (start, offset, segment.is_marked())
            })
            .collect()
    }

    #[test]
    fn marks_every_occurrence_and_preserves_content() {
        let content = "The cat sat. The cat ran.";
        let hs = highlights(&["The cat"]);
        let segments = render(content, &hs);

        assert_eq!(
            segments,
            vec![
                Segment::Marked { text: "The cat", highlight: &hs[0] },
                Segment::Plain(" sat. "),
                Segment::Marked { text: "The cat", highlight: &hs[0] },
                Segment::Plain(" ran."),
            ]
        );
        assert_eq!(plain_text(&segments), content);
    }

    #[test]
    fn matching_ignores_case_but_keeps_content_casing() {
        let hs = highlights(&["the CAT"]);
        let segments = render("THE cat and The Cat", &hs);
        let texts: Vec<String> = marked(&segments).into_iter().map(|(t, _)| t).collect();
        assert_eq!(texts, vec!["THE cat", "The Cat"]);
    }

    #[test]
    fn metacharacters_match_literally() {
        let hs = highlights(&["a.b*c"]);
        assert!(render("axbbbc aXbc abc", &hs).iter().all(|s| !s.is_marked()));

        let segments = render("see a.b*c here", &hs);
        assert_eq!(marked(&segments), vec![("a.b*c".to_string(), "h0".to_string())]);

        let hs = highlights(&["f(x) = [y]+$", "^start|end"]);
        let content = "Given f(x) = [y]+$ and ^start|end.";
        let texts: Vec<String> = marked(&render(content, &hs)).into_iter().map(|(t, _)| t).collect();
        assert_eq!(texts, vec!["f(x) = [y]+$", "^start|end"]);
    }

    #[test]
    fn longer_overlapping_highlight_wins() {
        // "physics" saved first so creation order alone would favour it.
        let hs = highlights(&["physics", "quantum physics"]);
        let content = "quantum physics is still physics";
        let segments = render(content, &hs);

        assert_eq!(
            marked(&segments),
            vec![
                ("quantum physics".to_string(), "h1".to_string()),
                ("physics".to_string(), "h0".to_string()),
            ]
        );
        assert_eq!(plain_text(&segments), content);
    }

    #[test]
    fn earliest_occurrence_wins_when_spans_cross() {
        let hs = highlights(&["cat sat", "the cat"]);
        let segments = render("the cat sat", &hs);
        assert_eq!(marked(&segments), vec![("the cat".to_string(), "h1".to_string())]);
        assert_eq!(segments.last(), Some(&Segment::Plain(" sat")));
    }

    #[test]
    fn equal_length_ties_follow_creation_order() {
        let hs = highlights(&["abcd", "bcde"]);
        // Same length, different start: leftmost still wins.
        assert_eq!(marked(&render("abcde", &hs))[0].1, "h0");

        let hs = highlights(&["Mars", "mars"]);
        let segments = render("mars", &hs);
        assert_eq!(marked(&segments), vec![("mars".to_string(), "h0".to_string())]);
    }

    #[test]
    fn identical_texts_share_occurrences() {
        let hs = highlights(&["entropy", "entropy", "ENTROPY"]);
        let segments = render("entropy rises; entropy falls", &hs);
        let found = marked(&segments);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|(_, id)| id == "h0"));
    }

    #[test]
    fn blank_highlights_are_ignored() {
        let hs = highlights(&["", "   ", "\n\t"]);
        assert_eq!(render("some text", &hs), vec![Segment::Plain("some text")]);

        let hs = highlights(&["  ", "text"]);
        assert_eq!(marked(&render("some text", &hs)).len(), 1);
    }

    #[test]
    fn empty_inputs() {
        assert!(render("", &highlights(&["x"])).is_empty());
        assert!(render("", &[]).is_empty());
        assert_eq!(render("abc", &[]), vec![Segment::Plain("abc")]);
    }

    #[test]
    fn unmatched_highlights_leave_content_plain() {
        let hs = highlights(&["absent"]);
        assert_eq!(render("nothing here", &hs), vec![Segment::Plain("nothing here")]);
    }

    #[test]
    fn rendering_is_idempotent_and_stable_across_rerender() {
        let hs = highlights(&["quantum physics", "physics", "wave", "a.b"]);
        let snapshot = hs.clone();
        let content = "Wave mechanics: quantum physics meets wave-particle physics. a.b axb";

        let first = render(content, &hs);
        let second = render(content, &hs);
        assert_eq!(first, second);
        assert_eq!(hs, snapshot);

        let extracted = plain_text(&first);
        assert_eq!(extracted, content);
        let rerendered = render(&extracted, &hs);
        assert_eq!(boundaries(&first), boundaries(&rerendered));
    }

    #[test]
    fn any_contained_highlight_is_marked_at_least_once() {
        let content = "Mitochondria is the POWERHOUSE of the cell (allegedly).";
        for text in ["powerhouse", "the cell (allegedly)", "M", "cell", "."] {
            let hs = highlights(&[text]);
            let found = marked(&render(content, &hs));
            assert!(
                found.iter().any(|(t, _)| t.to_lowercase() == text.to_lowercase()),
                "expected '{text}' to be marked"
            );
        }
    }

    #[test]
    fn non_ascii_text_keeps_char_boundaries() {
        let hs = highlights(&["élan vital", "ÜBER"]);
        let content = "Bergson's Élan vital, über alles.";
        let segments = render(content, &hs);
        let texts: Vec<String> = marked(&segments).into_iter().map(|(t, _)| t).collect();
        assert_eq!(texts, vec!["Élan vital", "über"]);
        assert_eq!(plain_text(&segments), content);
    }

    #[test]
    fn large_document_single_pass() {
        let paragraph = "Entropy of an isolated system never decreases over time. ";
        let content = paragraph.repeat(5_000);
        let texts: Vec<String> = (0..40).map(|i| format!("unused phrase {i}")).collect();
        let mut refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        refs.push("isolated system");
        let hs = highlights(&refs);

        let segments = render(&content, &hs);
        assert_eq!(segments.iter().filter(|s| s.is_marked()).count(), 5_000);
        assert_eq!(plain_text(&segments).len(), content.len());
    }
}
