//! Shared data structures for the obstacle-alerting pipeline
//!
//! - `severity`: distance → tier classification and per-tier alert data
//! - `prediction`: inbound prediction messages and outbound frame messages

mod prediction;
mod severity;

pub use prediction::*;
pub use severity::*;
