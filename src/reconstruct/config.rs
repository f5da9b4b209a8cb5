use crate::parsing::ExtractionLimits;

/// Tunable thresholds for the reconstruction pipeline.
#[derive(Debug, Clone)]
pub struct ReconstructConfig {
    /// Clustering window outside first-scan mode
    pub normal_window_secs: i64,

    /// Clustering window while importing the very first snapshot
    pub first_scan_window_secs: i64,

    /// Window for pairing a withdrawal with the order it reduced
    pub withdraw_pair_window_secs: i64,

    pub min_quantity: u32,
    pub max_quantity: u32,

    /// Unit-price sanity range applied alongside the oracle's bounds
    pub min_unit_price: u64,
    pub max_unit_price: u64,

    /// Leading chunks OCR tends to drop from long totals
    pub leading_chunks: Vec<u64>,

    /// Relative slack around the oracle's min/max unit price
    pub oracle_tolerance: f64,

    pub max_snippet_chars: usize,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            normal_window_secs: 3,
            first_scan_window_secs: 600,
            withdraw_pair_window_secs: 8,
            min_quantity: 1,
            max_quantity: 100_000,
            min_unit_price: 1,
            max_unit_price: 100_000_000_000,
            leading_chunks: vec![10_000_000, 100_000_000, 1_000_000_000],
            oracle_tolerance: 0.15,
            max_snippet_chars: 300,
        }
    }
}

impl ReconstructConfig {
    pub fn extraction_limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            min_quantity: self.min_quantity,
            max_quantity: self.max_quantity,
        }
    }

    pub fn quantity_in_bounds(&self, quantity: u64) -> bool {
        quantity >= self.min_quantity as u64 && quantity <= self.max_quantity as u64
    }
}
