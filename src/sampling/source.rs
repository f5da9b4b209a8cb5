use std::{collections::VecDeque, fs, io::ErrorKind, path::PathBuf};

use anyhow::{Context, Result};

use crate::models::{Sample, WindowTab};

/// Where samples come from. Screen capture and OCR live behind this seam.
pub trait SampleSource: Send {
    /// The currently visible sample, or `None` when nothing is on screen.
    fn capture(&mut self) -> Result<Option<Sample>>;
}

/// Reads the OCR output another process keeps writing to a file. The file
/// holds either a JSON `Sample` or plain text for `default_tab`.
pub struct FileSampleSource {
    path: PathBuf,
    default_tab: WindowTab,
}

impl FileSampleSource {
    pub fn new(path: PathBuf, default_tab: WindowTab) -> Self {
        Self { path, default_tab }
    }

    pub fn parse(contents: &str, default_tab: WindowTab) -> Option<Sample> {
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('{') {
            if let Ok(sample) = serde_json::from_str::<Sample>(trimmed) {
                return Some(sample);
            }
        }
        Some(Sample::new(contents, default_tab))
    }
}

impl SampleSource for FileSampleSource {
    fn capture(&mut self) -> Result<Option<Sample>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Self::parse(&contents, self.default_tab)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read sample file {}", self.path.display())),
        }
    }
}

/// Replays a fixed list of samples, then reports nothing.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    samples: VecDeque<Sample>,
}

impl ScriptedSource {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SampleSource for ScriptedSource {
    fn capture(&mut self) -> Result<Option<Sample>> {
        Ok(self.samples.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_uses_default_tab() {
        let sample = FileSampleSource::parse("2025.10.12 04.04 Listed Shard", WindowTab::Sell).unwrap();
        assert_eq!(sample.tab, WindowTab::Sell);
        assert!(sample.counters.is_empty());
    }

    #[test]
    fn json_sample_carries_tab_and_counters() {
        let sample = FileSampleSource::parse(
            r#"{"text": "log", "tab": "buy", "counters": {"Shard": {"completedCount": 2, "collectedAmount": 50}}}"#,
            WindowTab::Overview,
        )
        .unwrap();
        assert_eq!(sample.tab, WindowTab::Buy);
        assert_eq!(sample.counters["Shard"].completed_count, 2);
    }

    #[test]
    fn missing_or_empty_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        let mut source = FileSampleSource::new(path.clone(), WindowTab::Overview);
        assert!(source.capture().unwrap().is_none());

        fs::write(&path, "   \n").unwrap();
        assert!(source.capture().unwrap().is_none());

        fs::write(&path, "2025.10.12 04.04 Listed Shard").unwrap();
        assert!(source.capture().unwrap().is_some());
    }

    #[test]
    fn scripted_source_drains() {
        let mut source = ScriptedSource::new(vec![Sample::new("a", WindowTab::Sell)]);
        assert_eq!(source.remaining(), 1);
        assert!(source.capture().unwrap().is_some());
        assert!(source.capture().unwrap().is_none());
    }
}
