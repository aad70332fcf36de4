//! Media probing via ffprobe
//!
//! Asks the engine for total frame count or total duration, reading either a
//! file path or a buffer streamed over stdin.

use crate::engine::MediaHandle;
use crate::error::ProbeError;
use crate::ffmpeg::FfmpegCommand;
use std::path::PathBuf;
use tracing::debug;

/// Where the frame count comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameCountSource {
    /// `nb_frames` from the stream header. Cheap, but absent for some
    /// containers (e.g. piped fragmented MP4 prints `N/A`).
    #[default]
    Header,
    /// `-count_frames` / `nb_read_frames`: decodes the whole stream.
    Decode,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeResult {
    pub total_frames: Option<u64>,
    pub total_duration_seconds: Option<f64>,
}

impl ProbeResult {
    pub fn frames(total_frames: u64) -> Self {
        Self {
            total_frames: Some(total_frames),
            total_duration_seconds: None,
        }
    }

    pub fn duration(seconds: f64) -> Self {
        Self {
            total_frames: None,
            total_duration_seconds: Some(seconds),
        }
    }

    /// Frame count, which must be known and non-zero.
    pub fn require_frames(&self) -> Result<u64, ProbeError> {
        match self.total_frames {
            None => Err(ProbeError::Missing("total frame count")),
            Some(0) => Err(ProbeError::EmptyStream),
            Some(n) => Ok(n),
        }
    }

    pub fn require_duration(&self) -> Result<f64, ProbeError> {
        self.total_duration_seconds
            .ok_or(ProbeError::Missing("total duration"))
    }
}

pub struct MediaProbe {
    ffprobe_bin: PathBuf,
}

impl MediaProbe {
    pub fn new(ffprobe_bin: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_bin: ffprobe_bin.into(),
        }
    }

    /// Total number of frames in the first video stream.
    pub fn frame_count(&self, handle: MediaHandle<'_>, source: FrameCountSource) -> Result<u64, ProbeError> {
        let cmd = FfmpegCommand::new(&self.ffprobe_bin).args(&["-v", "error", "-select_streams", "v:0"]);
        let cmd = match source {
            FrameCountSource::Header => cmd.args(&["-show_entries", "stream=nb_frames"]),
            FrameCountSource::Decode => {
                cmd.args(&["-count_frames", "-show_entries", "stream=nb_read_frames"])
            }
        };
        let cmd = cmd.args(&["-of", "csv=p=0"]);

        let out = self.run(cmd, handle)?;
        let frames = parse_frame_count(&out)?;
        debug!(frames, ?source, "probed frame count");
        Ok(frames)
    }

    /// Container duration in seconds.
    pub fn duration(&self, handle: MediaHandle<'_>) -> Result<f64, ProbeError> {
        let cmd = FfmpegCommand::new(&self.ffprobe_bin).args(&[
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]);

        let out = self.run(cmd, handle)?;
        let seconds = parse_duration(&out)?;
        debug!(seconds, "probed duration");
        Ok(seconds)
    }

    fn run(&self, cmd: FfmpegCommand, handle: MediaHandle<'_>) -> Result<String, ProbeError> {
        let output = match handle {
            MediaHandle::Path(path) => cmd.input(path).execute(),
            MediaHandle::Buffer(data) => cmd.input_pipe().execute_with_input(data),
        }
        .map_err(ProbeError::Engine)?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn parse_frame_count(output: &str) -> Result<u64, ProbeError> {
    let trimmed = output.trim();
    trimmed
        .parse::<u64>()
        .map_err(|e| ProbeError::MalformedOutput {
            output: trimmed.to_string(),
            reason: format!("parse frames: {}", e),
        })
}

pub fn parse_duration(output: &str) -> Result<f64, ProbeError> {
    let trimmed = output.trim();
    let seconds = trimmed
        .parse::<f64>()
        .map_err(|e| ProbeError::MalformedOutput {
            output: trimmed.to_string(),
            reason: format!("parse duration: {}", e),
        })?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ProbeError::MalformedOutput {
            output: trimmed.to_string(),
            reason: "duration must be a finite, non-negative number".to_string(),
        });
    }
    Ok(seconds)
}
