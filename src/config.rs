//! Tunables for probing, extraction and the spill-to-disk policy

use crate::probe::FrameCountSource;
use std::path::PathBuf;

/// Byte buffers larger than this are written to a temporary file and handled
/// by the path pipeline; smaller ones are streamed through pipes.
pub const SPILL_THRESHOLD_BYTES: usize = 100 * 1024 * 1024;

/// ffmpeg `-q:v` value for JPEG output (2 = near-best, 31 = worst).
pub const JPEG_QUALITY: u8 = 2;

/// Suffix for spilled temporary files. ffmpeg probes content, so this only
/// matters for tooling that inspects the temp dir.
pub const DEFAULT_SPILL_SUFFIX: &str = ".mp4";

/// Prefix for spilled temporary files; a random part is appended per file.
pub const SPILL_PREFIX: &str = "vid";

#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub spill_threshold_bytes: usize,
    pub jpeg_quality: u8,
    /// Where spilled buffers go; `None` means the OS temp dir.
    pub temp_dir: Option<PathBuf>,
    pub spill_suffix: String,
    /// Frame counting used by the one-based index strategy.
    pub frame_count_source: FrameCountSource,
    /// Frame counting used by the zero-based index strategy.
    pub zero_based_frame_count_source: FrameCountSource,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            spill_threshold_bytes: SPILL_THRESHOLD_BYTES,
            jpeg_quality: JPEG_QUALITY,
            temp_dir: None,
            spill_suffix: DEFAULT_SPILL_SUFFIX.to_string(),
            frame_count_source: FrameCountSource::Header,
            zero_based_frame_count_source: FrameCountSource::Decode,
        }
    }
}

impl FrameConfig {
    pub fn with_engine_bins(mut self, ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffmpeg_bin = ffmpeg.into();
        self.ffprobe_bin = ffprobe.into();
        self
    }

    pub fn with_spill_threshold(mut self, bytes: usize) -> Self {
        self.spill_threshold_bytes = bytes;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FrameConfig::default();
        assert_eq!(config.spill_threshold_bytes, 104_857_600);
        assert_eq!(config.jpeg_quality, 2);
        assert_eq!(config.spill_suffix, ".mp4");
        assert_eq!(config.frame_count_source, FrameCountSource::Header);
        assert_eq!(config.zero_based_frame_count_source, FrameCountSource::Decode);
        assert!(config.temp_dir.is_none());
    }
}
