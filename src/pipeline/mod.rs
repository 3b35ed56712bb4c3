//! Pipeline orchestration: frame capture glue and the alert loop

pub mod runner;
pub mod source;

pub use runner::{PipelineRunner, RunnerStats};
pub use source::{FrameEvent, FrameSource, JpegDirSource, SyntheticSource};
