use anyhow::{Context, Result};
use regex::Regex;

use super::timestamp::{TimestampMatch, TimestampParser};

const ANCHOR_PATTERN: &str = r"(?i)\b(?:trans[a@]ct[i1l|][o0]n|s[o0][l1|]d|pl[a@]c[e3]d\s+(?:[a@]n\s+)?[o0]rder|l[i1l|]st[e3]d|registered|w[i1l|]thdr[ae3]wn?|purch[a@]s[e3]d|c[o0]ll[e3]ct\w*)\b";

/// One log entry's worth of raw text paired with the timestamp assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub offset: usize,
    pub timestamp_text: Option<String>,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentMode {
    /// Timestamps rendered as a column ahead of the rows; the n-th anchor takes
    /// the n-th leading timestamp.
    ClusterIndex,
    /// Each anchor takes the nearest timestamp before it.
    Proximity,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub mode: AssignmentMode,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    anchors: Regex,
    timestamps: TimestampParser,
    max_snippet_chars: usize,
}

impl Segmenter {
    pub fn new(timestamps: TimestampParser, max_snippet_chars: usize) -> Result<Self> {
        Ok(Self {
            anchors: Regex::new(ANCHOR_PATTERN).context("failed to compile anchor pattern")?,
            timestamps,
            max_snippet_chars,
        })
    }

    pub fn segment(&self, text: &str) -> Segmentation {
        let stamps = self.timestamps.find_all(text);
        let anchors: Vec<usize> = self.anchors.find_iter(text).map(|m| m.start()).collect();

        let Some(&first_anchor) = anchors.first() else {
            return Segmentation {
                mode: AssignmentMode::Proximity,
                segments: Vec::new(),
            };
        };

        let leading: Vec<&TimestampMatch> = stamps
            .iter()
            .take_while(|stamp| stamp.end <= first_anchor)
            .collect();
        let mode = if leading.len() >= 2 {
            AssignmentMode::ClusterIndex
        } else {
            AssignmentMode::Proximity
        };

        let segments = anchors
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let stamp = match mode {
                    AssignmentMode::ClusterIndex if n < leading.len() => Some(leading[n]),
                    _ => nearest_preceding(&stamps, start),
                };

                let next_anchor = anchors.get(n + 1).copied().unwrap_or(text.len());
                let next_stamp = stamps
                    .iter()
                    .find(|stamp| stamp.start > start)
                    .map(|stamp| stamp.start)
                    .unwrap_or(text.len());
                let end = clip_chars(text, start, self.max_snippet_chars)
                    .min(next_anchor)
                    .min(next_stamp);

                Segment {
                    offset: start,
                    timestamp_text: stamp.map(|s| s.text.clone()),
                    snippet: text[start..end].trim().to_string(),
                }
            })
            .collect();

        Segmentation { mode, segments }
    }
}

fn nearest_preceding(stamps: &[TimestampMatch], offset: usize) -> Option<&TimestampMatch> {
    stamps.iter().take_while(|stamp| stamp.end <= offset).last()
}

/// Byte index `max_chars` characters after `start`, or the end of `text`.
fn clip_chars(text: &str, start: usize, max_chars: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| start + idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> Segmenter {
        Segmenter::new(TimestampParser::new().unwrap(), 300).unwrap()
    }

    #[test]
    fn proximity_assigns_preceding_timestamp() {
        let text = "2025.10.12 04:04 Listed Black Stone x10 for 1,000 Silver \
                    2025.10.12 04:06 Transaction of Black Stone x10 worth 1,000 Silver";
        let result = segmenter().segment(text);
        assert_eq!(result.mode, AssignmentMode::Proximity);
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].timestamp_text.as_deref(), Some("2025.10.12 04:04"));
        assert_eq!(result.segments[0].snippet, "Listed Black Stone x10 for 1,000 Silver");
        assert_eq!(result.segments[1].timestamp_text.as_deref(), Some("2025.10.12 04:06"));
    }

    #[test]
    fn leading_timestamp_column_uses_cluster_index() {
        let text = "2025.10.12 04:06\n2025.10.12 04:04\n\
                    Transaction of Black Stone x10 worth 1,000 Silver\n\
                    Listed Black Stone x10 for 1,000 Silver\n\
                    Purchased Memory Fragment x1 for 2,000 Silver";
        let result = segmenter().segment(text);
        assert_eq!(result.mode, AssignmentMode::ClusterIndex);
        let stamps: Vec<_> = result
            .segments
            .iter()
            .map(|segment| segment.timestamp_text.as_deref())
            .collect();
        // Third anchor is past the column and falls back to the last one.
        assert_eq!(
            stamps,
            vec![
                Some("2025.10.12 04:06"),
                Some("2025.10.12 04:04"),
                Some("2025.10.12 04:04"),
            ]
        );
    }

    #[test]
    fn snippet_is_bounded() {
        let filler = "a".repeat(400);
        let text = format!("2025.10.12 04:04 Listed {filler}");
        let result = Segmenter::new(TimestampParser::new().unwrap(), 50)
            .unwrap()
            .segment(&text);
        assert_eq!(result.segments[0].snippet.chars().count(), 50);
    }

    #[test]
    fn anchor_without_timestamp_has_none() {
        let result = segmenter().segment("Listed Black Stone x10 for 1,000 Silver");
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].timestamp_text, None);
    }

    #[test]
    fn garbled_anchor_still_starts_a_segment() {
        let result = segmenter().segment("2025.10.12 04:04 Transacti0n of Magica1 Shard x2 w0rth 1,000 Si1ver");
        assert_eq!(result.segments.len(), 1);
        assert!(result.segments[0].snippet.starts_with("Transacti0n"));
    }

    #[test]
    fn no_anchor_no_segments() {
        assert!(segmenter().segment("2025.10.12 04:04 nothing").segments.is_empty());
    }
}
