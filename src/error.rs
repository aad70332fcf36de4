use crate::archive::ArchiveError;
use crate::ffmpeg::FfmpegError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while asking the engine for frame count or duration.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The engine could not be started or exited non-zero.
    #[error("Probe engine failed: {0}")]
    Engine(#[source] FfmpegError),

    /// The engine ran but printed something that is not a number.
    #[error("Malformed probe output {output:?}: {reason}")]
    MalformedOutput { output: String, reason: String },

    #[error("Probe result has no {0}")]
    Missing(&'static str),

    #[error("Video stream reports zero frames")]
    EmptyStream,
}

/// Failure while producing the frame itself.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Frame extraction failed: {0}")]
    Engine(#[source] FfmpegError),

    #[error("Frame extraction produced empty output: {stderr}")]
    EmptyOutput { stderr: String },
}

impl ExtractionError {
    /// Captured engine stderr.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ExtractionError::Engine(e) => e.stderr(),
            ExtractionError::EmptyOutput { stderr } => Some(stderr),
        }
    }
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(f64),

    #[error("Video file does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("Failed to {action} temporary file {path:?}: {source}")]
    Resource {
        action: &'static str,
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("Extract/read failed for {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },
}

impl MediaError {
    pub(crate) fn resource(action: &'static str, path: Option<PathBuf>, source: std::io::Error) -> Self {
        MediaError::Resource { action, path, source }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
