//! Novelty decisions against the last saved sample and the store, plus
//! stable occurrence indices for same-minute repeats.

pub mod novelty;
pub mod occurrence;
pub mod snapshot;

pub use novelty::{anchor_key, assess, Novelty, Ordinals, PriorText};
pub use occurrence::{OccurrenceSlot, OccurrenceState};
pub use snapshot::BaselineSnapshot;
