//! media_frame - single-frame extraction for media pipelines
//!
//! Pulls one still frame (JPEG or raw RGB24) out of a video given as a path
//! or an in-memory buffer, at a fractional or absolute position. Probing and
//! extraction shell out to system `ffprobe`/`ffmpeg` (LGPL-safe, no linking).
//! Small buffers stream through pipes; large ones are spilled to a temporary
//! file first.
//!
//! ```rust,no_run
//! use media_frame::{FrameConfig, FrameReader, FrameRequest, SelectionMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = FrameReader::new(FrameConfig::default());
//! let thumb = reader.read_frame("clip.mp4", &FrameRequest::new(0.5, SelectionMode::FrameIndex))?;
//! std::fs::write("thumb.jpg", &thumb.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
mod config;
mod engine;
mod error;
mod extract;
mod ffmpeg;
pub mod metrics;
pub mod organ;
mod position;
mod probe;
mod reader;
mod validation;

pub use archive::{classify, read_all, ArchiveError, ArchiveKind, FileRecord};
pub use config::{FrameConfig, DEFAULT_SPILL_SUFFIX, JPEG_QUALITY, SPILL_PREFIX, SPILL_THRESHOLD_BYTES};
pub use engine::{FfmpegEngine, MediaEngine, MediaHandle};
pub use error::{ExtractionError, MediaError, ProbeError, Result};
pub use extract::{ExtractedFrame, FrameEncoding, FrameExtractor};
pub use ffmpeg::{is_installed, FfmpegCommand, FfmpegError};
pub use position::{resolve, PositionSpec, ResolvedTarget, SelectionMode};
pub use probe::{FrameCountSource, MediaProbe, ProbeResult};
pub use reader::{read_frame, FrameReader, FrameRequest, MediaSource, Route};
