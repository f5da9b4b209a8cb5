use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use super::confusables::confusable_digit;

/// Digit or digit-lookalike, as timestamps come through OCR as well.
const D: &str = "[0-9OoDIl|SZ]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Finds and parses `YYYY.MM.DD hh.mm` timestamps (also `-`, `/` and `:`
/// separated variants).
#[derive(Debug, Clone)]
pub struct TimestampParser {
    pattern: Regex,
}

impl TimestampParser {
    pub fn new() -> Result<Self> {
        let pattern = format!(
            r"\b({D}{{4}})\s?[.\-/]\s?({D}{{1,2}})\s?[.\-/]\s?({D}{{1,2}})\s+({D}{{1,2}})\s?[.:\-]\s?({D}{{2}})\b"
        );
        let pattern = Regex::new(&pattern).context("failed to compile timestamp pattern")?;
        Ok(Self { pattern })
    }

    pub fn find_all(&self, text: &str) -> Vec<TimestampMatch> {
        self.pattern
            .find_iter(text)
            .map(|m| TimestampMatch {
                start: m.start(),
                end: m.end(),
                text: m.as_str().to_string(),
            })
            .collect()
    }

    /// Parse the first timestamp found in `text`. Out-of-range fields fail.
    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let caps = self.pattern.captures(text)?;
        let field = |idx: usize| -> Option<u32> {
            let digits: String = caps
                .get(idx)?
                .as_str()
                .chars()
                .map(confusable_digit)
                .collect::<Option<String>>()?;
            digits.parse().ok()
        };

        let year = field(1)? as i32;
        let date = NaiveDate::from_ymd_opt(year, field(2)?, field(3)?)?;
        date.and_hms_opt(field(4)?, field(5)?, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn parses_separator_variants() {
        let parser = TimestampParser::new().unwrap();
        let expected = at(2025, 10, 12, 4, 4);
        assert_eq!(parser.parse("2025.10.12 04.04"), Some(expected));
        assert_eq!(parser.parse("2025-10-12 04:04"), Some(expected));
        assert_eq!(parser.parse("2025/10/12 04-04"), Some(expected));
    }

    #[test]
    fn parses_confusable_digits() {
        let parser = TimestampParser::new().unwrap();
        assert_eq!(parser.parse("2O25.1O.12 O4:O4"), Some(at(2025, 10, 12, 4, 4)));
    }

    #[test]
    fn rejects_impossible_dates() {
        let parser = TimestampParser::new().unwrap();
        assert_eq!(parser.parse("2025.13.12 04:04"), None);
        assert_eq!(parser.parse("2025.10.12 25:04"), None);
        assert_eq!(parser.parse("no timestamp here"), None);
    }

    #[test]
    fn finds_all_with_offsets() {
        let parser = TimestampParser::new().unwrap();
        let text = "2025.10.12 04:04 Listed A x1 2025.10.12 04:05 Sold B";
        let found = parser.find_all(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].start, 0);
        assert_eq!(&text[found[1].start..found[1].end], "2025.10.12 04:05");
    }
}
