//! Engine seam between the dispatcher and the external transcoder

use crate::config::FrameConfig;
use crate::error::{ExtractionError, ProbeError};
use crate::extract::{ExtractedFrame, FrameEncoding, FrameExtractor};
use crate::position::ResolvedTarget;
use crate::probe::{FrameCountSource, MediaProbe};
use std::path::Path;

/// Media payload for a single probe or extraction: a file the engine reads
/// itself, or bytes streamed over its stdin.
#[derive(Debug, Clone, Copy)]
pub enum MediaHandle<'a> {
    Path(&'a Path),
    Buffer(&'a [u8]),
}

impl MediaHandle<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            MediaHandle::Path(_) => "path",
            MediaHandle::Buffer(_) => "buffer",
        }
    }
}

/// Probe and extract operations the dispatcher drives.
pub trait MediaEngine: Send + Sync {
    fn probe_frame_count(&self, handle: MediaHandle<'_>, source: FrameCountSource) -> Result<u64, ProbeError>;

    fn probe_duration(&self, handle: MediaHandle<'_>) -> Result<f64, ProbeError>;

    fn extract(
        &self,
        handle: MediaHandle<'_>,
        target: ResolvedTarget,
        encoding: FrameEncoding,
    ) -> Result<ExtractedFrame, ExtractionError>;
}

/// `ffprobe` + `ffmpeg` subprocess engine.
pub struct FfmpegEngine {
    probe: MediaProbe,
    extractor: FrameExtractor,
}

impl FfmpegEngine {
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            probe: MediaProbe::new(&config.ffprobe_bin),
            extractor: FrameExtractor::new(&config.ffmpeg_bin, config.jpeg_quality),
        }
    }

    pub fn extractor(&self) -> &FrameExtractor {
        &self.extractor
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(&FrameConfig::default())
    }
}

impl MediaEngine for FfmpegEngine {
    fn probe_frame_count(&self, handle: MediaHandle<'_>, source: FrameCountSource) -> Result<u64, ProbeError> {
        self.probe.frame_count(handle, source)
    }

    fn probe_duration(&self, handle: MediaHandle<'_>) -> Result<f64, ProbeError> {
        self.probe.duration(handle)
    }

    fn extract(
        &self,
        handle: MediaHandle<'_>,
        target: ResolvedTarget,
        encoding: FrameEncoding,
    ) -> Result<ExtractedFrame, ExtractionError> {
        self.extractor.extract(handle, target, encoding)
    }
}
