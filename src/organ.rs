//! UMA Organ Interface for media_frame
//!
//! Exposes frame extraction, probing and archive normalization to an
//! orchestrator through the stimulus/response pattern. Blocking engine work
//! runs on tokio's blocking pool so `stimulate` never stalls the runtime.
//!
//! ## Available Operations
//!
//! 1. `frame.read` - Extract one frame and write it to a file
//! 2. `frame.probe` - Frame count or duration of a video
//! 3. `archive.read` - List the files inside a zip/tar/tar.gz (or a single file)
//! 4. `media.capabilities` - Capability card query
//! 5. `metrics` - Metrics snapshot
//!
//! ## Example
//!
//! ```rust,no_run
//! use media_frame::organ::{FrameOrgan, Organ, Stimulus};
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let organ = FrameOrgan::new();
//!
//! let response = organ.stimulate(Stimulus {
//!     op: "frame.read".to_string(),
//!     input: json!({"input_path": "clip.mp4", "output_path": "/tmp/thumb.jpg", "position": 0.5}),
//!     context: HashMap::new(),
//! }).await?;
//! assert!(response.ok);
//! # Ok(())
//! # }
//! ```

use crate::archive::{self, FileRecord};
use crate::config::FrameConfig;
use crate::error::MediaError;
use crate::extract::FrameEncoding;
use crate::metrics::{Metrics, Timer};
use crate::position::SelectionMode;
use crate::reader::{FrameReader, FrameRequest};
use crate::validation::validate_input;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// UMA Stimulus - input to organ operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stimulus {
    pub op: String,
    pub input: Value,
    pub context: HashMap<String, String>,
}

/// UMA Response - output from organ operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub output: Value,
    pub latency_ms: u64,
    pub cost: Option<f64>,
}

#[async_trait]
pub trait Organ: Send + Sync {
    async fn stimulate(&self, stimulus: Stimulus) -> Result<Response, OrganError>;
    fn describe(&self) -> OrganCard;
}

#[derive(Debug, Error)]
pub enum OrganError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganCard {
    pub name: String,
    pub version: String,
    pub description: String,
    pub division: String,
    pub subsystem: String,
    pub tags: Vec<String>,
    pub execution_modes: Vec<String>,
    pub functions: Vec<FunctionCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCard {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
    pub idempotent: bool,
    pub side_effects: Vec<String>,
    pub input_schema: Option<Value>,
    pub output_schema: Value,
}

const OPERATIONS: [&str; 5] = ["frame.read", "frame.probe", "archive.read", "media.capabilities", "metrics"];

/// Frame extraction organ
pub struct FrameOrgan {
    reader: Arc<FrameReader>,
    metrics: Arc<Metrics>,
}

impl FrameOrgan {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            reader: Arc::new(FrameReader::new(config)),
            metrics: Metrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    fn validate(&self, op: &str, input: &Value) -> Result<(), OrganError> {
        let card = self.describe();
        let schema = card
            .functions
            .iter()
            .find(|f| f.name == op)
            .and_then(|f| f.input_schema.as_ref());

        match schema {
            Some(schema) => validate_input(input, schema).map_err(OrganError::InvalidInput),
            None => Ok(()),
        }
    }

    async fn handle_frame_read(&self, input: Value) -> Result<Value, OrganError> {
        let input_path = PathBuf::from(required_str(&input, "input_path")?);
        let position = input["position"]
            .as_f64()
            .ok_or_else(|| OrganError::InvalidInput("Missing position".to_string()))?;
        let mode: SelectionMode = optional_field(&input, "mode")?;
        let encoding: FrameEncoding = optional_field(&input, "encoding")?;
        let output_path = match input["output_path"].as_str() {
            Some(path) => PathBuf::from(path),
            None => default_output_path(&input_path, encoding),
        };

        let request = FrameRequest::new(position, mode).with_encoding(encoding);
        let reader = Arc::clone(&self.reader);
        let out = output_path.clone();

        let size = blocking(move || {
            let frame = reader.read_frame(&input_path, &request)?;
            let size = frame.len();
            std::fs::write(&out, frame.into_bytes())
                .map_err(|e| OrganError::ProcessingError(format!("Failed to write frame: {}", e)))?;
            Ok(size)
        })
        .await?;

        self.metrics.record_frame_bytes(size as u64);

        Ok(json!({
            "output_path": output_path.to_string_lossy(),
            "mode": mode.as_str(),
            "encoding": encoding.as_str(),
            "size_bytes": size,
        }))
    }

    async fn handle_frame_probe(&self, input: Value) -> Result<Value, OrganError> {
        let input_path = PathBuf::from(required_str(&input, "input_path")?);
        let mode: SelectionMode = optional_field(&input, "mode")?;
        let reader = Arc::clone(&self.reader);

        let result = blocking(move || Ok(reader.probe(&input_path, mode)?)).await?;

        Ok(json!({
            "mode": mode.as_str(),
            "total_frames": result.total_frames,
            "duration_seconds": result.total_duration_seconds,
        }))
    }

    async fn handle_archive_read(&self, input: Value) -> Result<Value, OrganError> {
        let input_path = PathBuf::from(required_str(&input, "input_path")?);
        let kind = archive::classify(&input_path);

        let records: Vec<FileRecord> = blocking(move || Ok(archive::read_all(&input_path)?)).await?;
        let files: Vec<Value> = records
            .iter()
            .map(|r| {
                json!({
                    "mime_type": r.mime_type,
                    "extension": r.extension,
                    "size_bytes": r.data.len(),
                })
            })
            .collect();

        Ok(json!({
            "kind": kind,
            "file_count": files.len(),
            "files": files,
        }))
    }

    fn handle_capabilities(&self) -> Result<Value, OrganError> {
        let card = self.describe();
        serde_json::to_value(&card).map_err(OrganError::SerializationError)
    }

    async fn dispatch(&self, op: &str, input: Value) -> Result<Value, OrganError> {
        self.validate(op, &input)?;

        match op {
            "frame.read" => self.handle_frame_read(input).await,
            "frame.probe" => self.handle_frame_probe(input).await,
            "archive.read" => self.handle_archive_read(input).await,
            "media.capabilities" => self.handle_capabilities(),
            "metrics" => Ok(json!(self.metrics.snapshot())),
            _ => Err(OrganError::UnsupportedOperation(op.to_string())),
        }
    }
}

impl Default for FrameOrgan {
    fn default() -> Self {
        Self::new()
    }
}

async fn blocking<T, F>(f: F) -> Result<T, OrganError>
where
    F: FnOnce() -> Result<T, OrganError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OrganError::ProcessingError(format!("Worker failed: {}", e)))?
}

/// `clip.mp4` becomes `clip_frame.jpg` (or `.rgb`) next to the input.
fn default_output_path(input_path: &Path, encoding: FrameEncoding) -> PathBuf {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    input_path.with_file_name(format!("{}_frame.{}", stem, encoding.extension()))
}

fn required_str<'a>(input: &'a Value, field: &str) -> Result<&'a str, OrganError> {
    input[field]
        .as_str()
        .ok_or_else(|| OrganError::InvalidInput(format!("Missing {}", field)))
}

fn optional_field<T: DeserializeOwned + Default>(input: &Value, field: &str) -> Result<T, OrganError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => Ok(serde_json::from_value(value.clone())?),
    }
}

#[async_trait]
impl Organ for FrameOrgan {
    async fn stimulate(&self, stimulus: Stimulus) -> Result<Response, OrganError> {
        let timer = Timer::new();
        let op = stimulus.op;
        debug!(op = %op, "stimulus received");

        let result = self.dispatch(&op, stimulus.input).await;
        let latency = timer.elapsed_ms();
        self.metrics.record_request(&op, result.is_ok(), latency);

        let output = match result {
            Ok(output) => {
                return Ok(Response {
                    ok: true,
                    output,
                    latency_ms: latency,
                    cost: None,
                })
            }
            Err(OrganError::UnsupportedOperation(_)) => json!({
                "error": "UnsupportedOperation",
                "op": op,
                "available_operations": OPERATIONS,
            }),
            Err(e) => json!({
                "error": e.to_string(),
                "op": op,
            }),
        };

        Ok(Response {
            ok: false,
            output,
            latency_ms: latency,
            cost: None,
        })
    }

    fn describe(&self) -> OrganCard {
        OrganCard {
            name: "media_frame".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "FFmpeg-based single-frame extraction and archive normalization for thumbnail pipelines".to_string(),
            division: "media".to_string(),
            subsystem: "frame_extraction".to_string(),
            tags: vec![
                "media".to_string(),
                "video".to_string(),
                "frames".to_string(),
                "thumbnail".to_string(),
                "ffmpeg".to_string(),
                "archive".to_string(),
            ],
            execution_modes: vec!["embedded".to_string(), "sidecar".to_string()],
            functions: vec![
                FunctionCard {
                    name: "frame.read".to_string(),
                    description: "Extract a single frame at a fractional or absolute position and write it to a file".to_string(),
                    tags: vec!["video".to_string(), "frames".to_string(), "thumbnail".to_string()],
                    examples: vec![
                        "Grab the middle frame of a clip as JPEG".to_string(),
                        "Extract frame 120 as raw RGB24".to_string(),
                        "Seek to 2.5 seconds and save a preview".to_string(),
                    ],
                    idempotent: true,
                    side_effects: vec!["writes image file".to_string(), "invokes ffmpeg".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "properties": {
                            "input_path": { "type": "string", "description": "Path to video file" },
                            "output_path": { "type": "string", "description": "Where to write the frame (default: <input stem>_frame.jpg|.rgb beside the input)" },
                            "position": { "type": "number", "description": "Below 1.0: fraction of the video; otherwise absolute frame number or seconds" },
                            "mode": { "type": "string", "enum": ["frame_index", "zero_based_frame_index", "timestamp"], "description": "Position interpretation (default: frame_index)" },
                            "encoding": { "type": "string", "enum": ["jpeg", "raw_rgb24"], "description": "Output encoding (default: jpeg)" }
                        },
                        "required": ["input_path", "position"]
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "output_path": { "type": "string" },
                            "mode": { "type": "string" },
                            "encoding": { "type": "string" },
                            "size_bytes": { "type": "integer" }
                        }
                    }),
                },
                FunctionCard {
                    name: "frame.probe".to_string(),
                    description: "Report the frame count or duration a frame read would use".to_string(),
                    tags: vec!["video".to_string(), "probe".to_string(), "metadata".to_string()],
                    examples: vec![
                        "Count frames in a clip".to_string(),
                        "Read container duration in seconds".to_string(),
                    ],
                    idempotent: true,
                    side_effects: vec!["invokes ffprobe".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "properties": {
                            "input_path": { "type": "string", "description": "Path to video file" },
                            "mode": { "type": "string", "enum": ["frame_index", "zero_based_frame_index", "timestamp"], "description": "Which quantity to probe (default: frame_index)" }
                        },
                        "required": ["input_path"]
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "mode": { "type": "string" },
                            "total_frames": { "type": ["integer", "null"] },
                            "duration_seconds": { "type": ["number", "null"] }
                        }
                    }),
                },
                FunctionCard {
                    name: "archive.read".to_string(),
                    description: "Unpack a zip, tar or tar.gz (or read a plain file) and describe each contained file".to_string(),
                    tags: vec!["archive".to_string(), "zip".to_string(), "tar".to_string(), "mime".to_string()],
                    examples: vec![
                        "List videos inside a downloaded zip".to_string(),
                        "Sniff the MIME type of a plain file".to_string(),
                    ],
                    idempotent: true,
                    side_effects: vec!["reads archive file".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "properties": {
                            "input_path": { "type": "string", "description": "Path to archive or file" }
                        },
                        "required": ["input_path"]
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "kind": { "type": "string" },
                            "file_count": { "type": "integer" },
                            "files": { "type": "array" }
                        }
                    }),
                },
                FunctionCard {
                    name: "media.capabilities".to_string(),
                    description: "Return organ capability card with all available functions and metadata".to_string(),
                    tags: vec!["metadata".to_string(), "discovery".to_string(), "mcp".to_string()],
                    examples: vec!["Discover available frame extraction operations".to_string()],
                    idempotent: true,
                    side_effects: vec![],
                    input_schema: None,
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "version": { "type": "string" },
                            "functions": { "type": "array" }
                        }
                    }),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stimulus(op: &str, input: Value) -> Stimulus {
        Stimulus {
            op: op.to_string(),
            input,
            context: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_organ_capabilities() {
        let organ = FrameOrgan::new();
        let response = organ.stimulate(stimulus("media.capabilities", json!({}))).await.unwrap();
        assert!(response.ok);
        assert_eq!(response.output["name"], "media_frame");
    }

    #[tokio::test]
    async fn test_unsupported_operation() {
        let organ = FrameOrgan::new();
        let response = organ.stimulate(stimulus("invalid.operation", json!({}))).await.unwrap();
        assert!(!response.ok);
        assert_eq!(response.output["error"], "UnsupportedOperation");
        assert_eq!(response.output["available_operations"].as_array().unwrap().len(), OPERATIONS.len());
    }

    #[tokio::test]
    async fn test_schema_rejects_bad_mode() {
        let organ = FrameOrgan::new();
        let response = organ
            .stimulate(stimulus(
                "frame.read",
                json!({"input_path": "a.mp4", "output_path": "b.jpg", "position": 0.5, "mode": "sideways"}),
            ))
            .await
            .unwrap();
        assert!(!response.ok);
        assert!(response.output["error"].as_str().unwrap().contains("mode"));
    }

    #[test]
    fn test_default_output_path_follows_encoding() {
        assert_eq!(
            default_output_path(Path::new("/media/clip.mp4"), FrameEncoding::Jpeg),
            PathBuf::from("/media/clip_frame.jpg")
        );
        assert_eq!(
            default_output_path(Path::new("clip.mov"), FrameEncoding::RawRgb24),
            PathBuf::from("clip_frame.rgb")
        );
    }

    #[test]
    fn test_organ_card() {
        let card = FrameOrgan::new().describe();
        assert_eq!(card.name, "media_frame");
        assert_eq!(card.division, "media");
        assert_eq!(card.subsystem, "frame_extraction");
        assert_eq!(card.functions.len(), 4);
        for op in &OPERATIONS[..4] {
            assert!(card.functions.iter().any(|f| f.name == *op), "missing {op}");
        }
    }
}
