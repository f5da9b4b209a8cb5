pub mod confusables;
pub mod extractor;
pub mod rules;
pub mod segmenter;
pub mod timestamp;

pub use extractor::{ExtractionLimits, Extractor};
pub use rules::RuleSet;
pub use segmenter::{AssignmentMode, Segment, Segmentation, Segmenter};
pub use timestamp::TimestampParser;
