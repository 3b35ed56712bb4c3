//! Streaming transport to the remote prediction service
//!
//! - `backoff`: capped exponential retry delay state
//! - `client`: the self-healing WebSocket client

mod backoff;
mod client;

pub use backoff::Backoff;
pub use client::{ConnectionState, StreamError, StreamingClient, StreamingClientStats};
