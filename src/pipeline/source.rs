//! Frame source abstraction for the capture tick
//!
//! Camera acquisition itself is a platform concern; the runner only needs
//! something that yields JPEG bytes on demand. The implementations here
//! cover development and replay use: synthetic payloads and a directory of
//! captured JPEGs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Events produced by a frame source.
pub enum FrameEvent {
    /// A JPEG frame is ready to send.
    Frame(Vec<u8>),
    /// Source has no more frames.
    Eof,
}

/// Trait abstracting where camera frames come from.
///
/// The pipeline runner calls [`next_frame`](FrameSource::next_frame) on each
/// capture tick; a slow source delays only its own tick, never the
/// prediction loop.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Produce the next frame, or `FrameEvent::Eof` when exhausted.
    async fn next_frame(&mut self) -> Result<FrameEvent>;

    /// Human-readable name for logging (e.g. "synthetic", "jpeg-dir").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Synthetic Source (soak testing)
// ============================================================================

/// Emits placeholder JPEG payloads, optionally bounded in count.
pub struct SyntheticSource {
    remaining: Option<u64>,
    counter: u64,
}

/// Smallest payload the predictor accepts as a JPEG: SOI + EOI markers.
const SYNTHETIC_JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

impl SyntheticSource {
    /// Unbounded synthetic source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            remaining: None,
            counter: 0,
        }
    }

    /// Synthetic source that ends after `count` frames.
    #[must_use]
    pub fn with_frame_count(count: u64) -> Self {
        Self {
            remaining: Some(count),
            counter: 0,
        }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        if let Some(ref mut remaining) = self.remaining {
            if *remaining == 0 {
                return Ok(FrameEvent::Eof);
            }
            *remaining -= 1;
        }
        self.counter += 1;
        Ok(FrameEvent::Frame(SYNTHETIC_JPEG.to_vec()))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

// ============================================================================
// JPEG Directory Source (captured-frame replay)
// ============================================================================

/// Replays `.jpg` / `.jpeg` files from a directory in name order.
pub struct JpegDirSource {
    files: std::vec::IntoIter<PathBuf>,
}

impl JpegDirSource {
    /// Scan a directory for JPEG files. Fails if the directory cannot be
    /// read; an empty directory yields an immediate `Eof`.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            })
            .collect();
        files.sort();
        tracing::info!(dir = %dir.display(), frames = files.len(), "Loaded frame directory");
        Ok(Self {
            files: files.into_iter(),
        })
    }
}

#[async_trait]
impl FrameSource for JpegDirSource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        match self.files.next() {
            Some(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read frame {}", path.display()))?;
                Ok(FrameEvent::Frame(bytes))
            }
            None => Ok(FrameEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "jpeg-dir"
    }
}
