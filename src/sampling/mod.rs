//! Periodic capture and the bounded capture -> ingest pipeline.

pub mod controller;
pub mod loop_worker;
pub mod scheduler;
pub mod source;

pub use controller::SamplingController;
pub use scheduler::{Scheduler, SchedulerState};
pub use source::{FileSampleSource, SampleSource, ScriptedSource};
