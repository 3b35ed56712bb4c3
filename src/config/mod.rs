//! Runtime configuration
//!
//! TOML-backed settings with a single process-wide handle: `main` loads
//! and validates a [`ClientConfig`], publishes it via [`init`], and the
//! rest of the process reads it through [`get`].
//!
//! The file search order is `$WAYSENSE_CONFIG`, then `./waysense.toml` in
//! the working directory, then built-in defaults.

mod client_config;
pub mod defaults;

pub use client_config::*;

use std::sync::OnceLock;

static CLIENT_CONFIG: OnceLock<ClientConfig> = OnceLock::new();

/// Publish the validated startup configuration. Later calls are ignored
/// with a warning; the first value wins for the life of the process.
pub fn init(config: ClientConfig) {
    if CLIENT_CONFIG.set(config).is_err() {
        tracing::warn!("Configuration already initialized — keeping the first value");
    }
}

/// The process-wide configuration published by [`init`].
///
/// Panics when called before [`init`]; a missing configuration is a
/// startup wiring bug, not a recoverable condition.
#[must_use]
pub fn get() -> &'static ClientConfig {
    CLIENT_CONFIG
        .get()
        .expect("configuration read before config::init()")
}

/// Whether [`init`] has run.
#[must_use]
pub fn is_initialized() -> bool {
    CLIENT_CONFIG.get().is_some()
}
