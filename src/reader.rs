//! Size-gated dispatch
//!
//! [`FrameReader`] routes a caller source to one of three pipelines:
//!
//! - a path goes straight to the engine,
//! - a buffer above [`FrameConfig::spill_threshold_bytes`] is written to a
//!   temporary file first and then handled like a path,
//! - any other buffer is streamed through the engine's stdin/stdout.
//!
//! Each pipeline is probe → resolve → extract. A spilled file is removed once,
//! after the pipeline finishes, whatever its outcome.

use crate::config::{FrameConfig, SPILL_PREFIX};
use crate::engine::{FfmpegEngine, MediaEngine, MediaHandle};
use crate::error::{MediaError, Result};
use crate::extract::{ExtractedFrame, FrameEncoding};
use crate::position::{resolve, PositionSpec, ResolvedTarget, SelectionMode};
use crate::probe::ProbeResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Caller input: a file on disk or bytes already in memory.
#[derive(Debug, Clone, Copy)]
pub enum MediaSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

impl<'a> From<&'a Path> for MediaSource<'a> {
    fn from(path: &'a Path) -> Self {
        MediaSource::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for MediaSource<'a> {
    fn from(path: &'a PathBuf) -> Self {
        MediaSource::Path(path.as_path())
    }
}

impl<'a> From<&'a str> for MediaSource<'a> {
    fn from(path: &'a str) -> Self {
        MediaSource::Path(Path::new(path))
    }
}

impl<'a> From<&'a [u8]> for MediaSource<'a> {
    fn from(data: &'a [u8]) -> Self {
        MediaSource::Bytes(data)
    }
}

impl<'a> From<&'a Vec<u8>> for MediaSource<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        MediaSource::Bytes(data.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Path,
    Memory,
    Spill,
}

impl Route {
    pub fn as_str(&self) -> &str {
        match self {
            Route::Path => "path",
            Route::Memory => "memory",
            Route::Spill => "spill",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    pub position: PositionSpec,
    pub mode: SelectionMode,
    pub encoding: FrameEncoding,
}

impl FrameRequest {
    pub fn new(position: f64, mode: SelectionMode) -> Self {
        Self {
            position: PositionSpec::new(position),
            mode,
            encoding: FrameEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: FrameEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

pub struct FrameReader<E = FfmpegEngine> {
    engine: E,
    config: FrameConfig,
}

impl FrameReader<FfmpegEngine> {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            engine: FfmpegEngine::new(&config),
            config,
        }
    }
}

impl Default for FrameReader<FfmpegEngine> {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl<E: MediaEngine> FrameReader<E> {
    pub fn with_engine(engine: E, config: FrameConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Pipeline a source would take. Buffers exactly at the threshold stay in memory.
    pub fn route(&self, source: MediaSource<'_>) -> Route {
        match source {
            MediaSource::Path(_) => Route::Path,
            MediaSource::Bytes(data) if data.len() > self.config.spill_threshold_bytes => Route::Spill,
            MediaSource::Bytes(_) => Route::Memory,
        }
    }

    /// Probe, resolve and extract one frame.
    pub fn read_frame<'a>(&self, source: impl Into<MediaSource<'a>>, request: &FrameRequest) -> Result<ExtractedFrame> {
        let source = source.into();
        let ((frame, target), route) = self.dispatch(source, |handle| self.run_pipeline(handle, request))?;

        info!(
            route = route.as_str(),
            resolved = ?target,
            mode = request.mode.as_str(),
            encoding = request.encoding.as_str(),
            bytes = frame.len(),
            "read video frame"
        );
        Ok(frame)
    }

    /// Probe only: what `read_frame` would learn about the source for `mode`.
    pub fn probe<'a>(&self, source: impl Into<MediaSource<'a>>, mode: SelectionMode) -> Result<ProbeResult> {
        let (result, _) = self.dispatch(source.into(), |handle| self.probe_for(handle, mode))?;
        Ok(result)
    }

    fn dispatch<T>(&self, source: MediaSource<'_>, pipeline: impl FnOnce(MediaHandle<'_>) -> Result<T>) -> Result<(T, Route)> {
        validate(source)?;

        let route = self.route(source);
        let value = match source {
            MediaSource::Path(path) => pipeline(MediaHandle::Path(path))?,
            MediaSource::Bytes(data) if route == Route::Spill => self.with_spilled(data, pipeline)?,
            MediaSource::Bytes(data) => pipeline(MediaHandle::Buffer(data))?,
        };
        Ok((value, route))
    }

    fn run_pipeline(&self, handle: MediaHandle<'_>, request: &FrameRequest) -> Result<(ExtractedFrame, ResolvedTarget)> {
        let probed = self.probe_for(handle, request.mode)?;
        let target = resolve(request.position, &probed, request.mode)?;
        debug!(handle = handle.kind(), ?probed, ?target, "resolved frame target");

        let frame = self.engine.extract(handle, target, request.encoding)?;
        Ok((frame, target))
    }

    fn probe_for(&self, handle: MediaHandle<'_>, mode: SelectionMode) -> Result<ProbeResult> {
        let result = match mode {
            SelectionMode::FrameIndex => {
                ProbeResult::frames(self.engine.probe_frame_count(handle, self.config.frame_count_source)?)
            }
            SelectionMode::ZeroBasedFrameIndex => ProbeResult::frames(
                self.engine
                    .probe_frame_count(handle, self.config.zero_based_frame_count_source)?,
            ),
            SelectionMode::Timestamp => ProbeResult::duration(self.engine.probe_duration(handle)?),
        };
        Ok(result)
    }

    fn with_spilled<T>(&self, data: &[u8], pipeline: impl FnOnce(MediaHandle<'_>) -> Result<T>) -> Result<T> {
        let temp = self.spill(data)?;
        let path: &Path = &temp;
        debug!(path = %path.display(), bytes = data.len(), "spilled buffer to disk");

        let result = pipeline(MediaHandle::Path(path));

        let path = path.to_path_buf();
        if let Err(e) = temp.close() {
            warn!(path = %path.display(), error = %e, "failed to remove spilled temp file");
        }
        result
    }

    fn spill(&self, data: &[u8]) -> Result<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder
            .prefix(SPILL_PREFIX)
            .suffix(self.config.spill_suffix.as_str());

        let created = match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = created.map_err(|e| MediaError::resource("create", self.config.temp_dir.clone(), e))?;

        // On error the NamedTempFile is dropped here, which deletes it
        if let Err(e) = file.write_all(data).and_then(|()| file.flush()) {
            return Err(MediaError::resource("write", Some(file.path().to_path_buf()), e));
        }
        Ok(file.into_temp_path())
    }
}

fn validate(source: MediaSource<'_>) -> Result<()> {
    match source {
        MediaSource::Path(path) => {
            if !path.exists() {
                return Err(MediaError::SourceMissing(path.to_path_buf()));
            }
            if path.is_dir() {
                return Err(MediaError::UnsupportedInput(format!(
                    "{} is a directory",
                    path.display()
                )));
            }
        }
        MediaSource::Bytes(data) => {
            if data.is_empty() {
                return Err(MediaError::UnsupportedInput("empty video data".to_string()));
            }
        }
    }
    Ok(())
}

/// One-shot read with the default ffmpeg engine and configuration.
pub fn read_frame<'a>(source: impl Into<MediaSource<'a>>, position: f64, mode: SelectionMode) -> Result<ExtractedFrame> {
    FrameReader::<FfmpegEngine>::default().read_frame(source, &FrameRequest::new(position, mode))
}
