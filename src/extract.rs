//! Single-frame extraction via ffmpeg

use crate::engine::MediaHandle;
use crate::error::ExtractionError;
use crate::ffmpeg::FfmpegCommand;
use crate::position::ResolvedTarget;
use image::error::{ParameterError, ParameterErrorKind};
use image::{DynamicImage, ImageError, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameEncoding {
    #[default]
    Jpeg,
    /// Packed 8-bit RGB, 3 bytes per pixel, no header.
    RawRgb24,
}

impl FrameEncoding {
    pub fn as_str(&self) -> &str {
        match self {
            FrameEncoding::Jpeg => "jpeg",
            FrameEncoding::RawRgb24 => "raw_rgb24",
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            FrameEncoding::Jpeg => "jpg",
            FrameEncoding::RawRgb24 => "rgb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFrame {
    pub bytes: Vec<u8>,
    pub encoding: FrameEncoding,
}

impl ExtractedFrame {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Decode into an image. Raw RGB carries no header, so the frame size must
    /// be supplied; JPEG ignores it.
    pub fn to_image(&self, width: u32, height: u32) -> Result<DynamicImage, ImageError> {
        match self.encoding {
            FrameEncoding::Jpeg => image::load_from_memory_with_format(&self.bytes, ImageFormat::Jpeg),
            FrameEncoding::RawRgb24 => {
                let expected = (width as usize)
                    .checked_mul(height as usize)
                    .and_then(|pixels| pixels.checked_mul(3));
                if expected != Some(self.bytes.len()) {
                    return Err(dimension_mismatch());
                }
                RgbImage::from_raw(width, height, self.bytes.clone())
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(dimension_mismatch)
            }
        }
    }
}

fn dimension_mismatch() -> ImageError {
    ImageError::Parameter(ParameterError::from_kind(ParameterErrorKind::DimensionMismatch))
}

pub struct FrameExtractor {
    ffmpeg_bin: PathBuf,
    jpeg_quality: u8,
}

impl FrameExtractor {
    pub fn new(ffmpeg_bin: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            jpeg_quality,
        }
    }

    /// Build the full ffmpeg invocation, minus the output destination.
    pub fn command(&self, handle: MediaHandle<'_>, target: ResolvedTarget, encoding: FrameEncoding, to_file: bool) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(&self.ffmpeg_bin).args(&["-hide_banner", "-v", "error", "-y"]);

        // Seeking before the input skips decoding of everything in front of it
        if let ResolvedTarget::Timestamp(seconds) = target {
            cmd = cmd.arg("-ss").arg(format!("{:.6}", seconds));
        }

        cmd = match handle {
            MediaHandle::Path(path) => cmd.input(path),
            MediaHandle::Buffer(_) => cmd.input_pipe(),
        };

        cmd = match target {
            ResolvedTarget::FrameIndex(frame) => {
                cmd.args(&["-vf", &format!("select=gte(n\\,{})", frame.saturating_sub(1))])
            }
            ResolvedTarget::ZeroBasedFrameIndex(frame) => cmd.args(&[
                "-vf",
                &format!("select=eq(n\\,{})", frame),
                "-vsync",
                "vfr",
            ]),
            ResolvedTarget::Timestamp(_) => cmd,
        };

        cmd = cmd.args(&["-frames:v", "1"]);

        match encoding {
            FrameEncoding::Jpeg => cmd.args(&[
                "-f",
                if to_file { "image2" } else { "image2pipe" },
                "-vcodec",
                "mjpeg",
                "-q:v",
                &self.jpeg_quality.to_string(),
            ]),
            FrameEncoding::RawRgb24 => cmd.args(&["-f", "rawvideo", "-pix_fmt", "rgb24"]),
        }
    }

    /// Extract one frame and return its encoded bytes.
    pub fn extract(
        &self,
        handle: MediaHandle<'_>,
        target: ResolvedTarget,
        encoding: FrameEncoding,
    ) -> Result<ExtractedFrame, ExtractionError> {
        let cmd = self.command(handle, target, encoding, false).output_pipe();
        let output = match handle {
            MediaHandle::Path(_) => cmd.execute(),
            MediaHandle::Buffer(data) => cmd.execute_with_input(data),
        }
        .map_err(ExtractionError::Engine)?;

        if output.stdout.is_empty() {
            return Err(ExtractionError::EmptyOutput {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(?target, encoding = encoding.as_str(), bytes = output.stdout.len(), "extracted frame");
        Ok(ExtractedFrame {
            bytes: output.stdout,
            encoding,
        })
    }

    /// Extract one frame into `output_path`, overwriting it. Returns the file size.
    pub fn extract_to_path(
        &self,
        handle: MediaHandle<'_>,
        target: ResolvedTarget,
        encoding: FrameEncoding,
        output_path: &Path,
    ) -> Result<u64, ExtractionError> {
        let cmd = self.command(handle, target, encoding, true).output(output_path);
        let output = match handle {
            MediaHandle::Path(_) => cmd.execute(),
            MediaHandle::Buffer(data) => cmd.execute_with_input(data),
        }
        .map_err(ExtractionError::Engine)?;

        let size = fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(ExtractionError::EmptyOutput {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(?target, output = %output_path.display(), bytes = size, "extracted frame to file");
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn args(handle: MediaHandle<'_>, target: ResolvedTarget, encoding: FrameEncoding) -> Vec<String> {
        FrameExtractor::new("ffmpeg", 2)
            .command(handle, target, encoding, false)
            .output_pipe()
            .get_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn position(args: &[String], needle: &str) -> usize {
        args.iter()
            .position(|a| a == needle)
            .unwrap_or_else(|| panic!("{needle} missing from {args:?}"))
    }

    #[test]
    fn test_one_based_index_selects_previous_n() {
        let args = args(MediaHandle::Buffer(b""), ResolvedTarget::FrameIndex(50), FrameEncoding::RawRgb24);
        assert!(args.contains(&"select=gte(n\\,49)".to_string()));
        assert!(!args.contains(&"-vsync".to_string()));
        assert_eq!(args[position(&args, "-i") + 1], "pipe:0");
        assert_eq!(args[position(&args, "-frames:v") + 1], "1");
        assert_eq!(args[position(&args, "-pix_fmt") + 1], "rgb24");
        assert_eq!(args[position(&args, "-f") + 1], "rawvideo");
        assert_eq!(args.last().unwrap(), "pipe:1");
    }

    #[test]
    fn test_zero_based_index_selects_exact_n() {
        let args = args(MediaHandle::Buffer(b""), ResolvedTarget::ZeroBasedFrameIndex(50), FrameEncoding::Jpeg);
        assert!(args.contains(&"select=eq(n\\,50)".to_string()));
        assert_eq!(args[position(&args, "-vsync") + 1], "vfr");
        assert_eq!(args[position(&args, "-vcodec") + 1], "mjpeg");
        assert_eq!(args[position(&args, "-q:v") + 1], "2");
        assert_eq!(args[position(&args, "-f") + 1], "image2pipe");
    }

    #[test]
    fn test_timestamp_seeks_before_input() {
        let path = Path::new("/videos/clip.mp4");
        let args = args(MediaHandle::Path(path), ResolvedTarget::Timestamp(2.5), FrameEncoding::Jpeg);
        let ss = position(&args, "-ss");
        let input = position(&args, "-i");
        assert!(ss < input);
        assert_eq!(args[ss + 1], "2.500000");
        assert_eq!(args[input + 1], "/videos/clip.mp4");
        assert!(!args.iter().any(|a| a.starts_with("select=")));
    }

    #[test]
    fn test_file_output_uses_image2_muxer() {
        let extractor = FrameExtractor::new("ffmpeg", 5);
        let cmd = extractor
            .command(MediaHandle::Path(Path::new("in.mp4")), ResolvedTarget::FrameIndex(1), FrameEncoding::Jpeg, true)
            .output("out.jpg");
        let args: Vec<String> = cmd.get_args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[position(&args, "-f") + 1], "image2");
        assert_eq!(args[position(&args, "-q:v") + 1], "5");
        assert!(args.contains(&"select=gte(n\\,0)".to_string()));
        assert_eq!(args.last().unwrap(), "out.jpg");
    }

    #[test]
    fn test_raw_frame_to_image_checks_length() {
        let frame = ExtractedFrame {
            bytes: vec![255; 2 * 2 * 3],
            encoding: FrameEncoding::RawRgb24,
        };
        let img = frame.to_image(2, 2).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert!(frame.to_image(3, 2).is_err());
        // A larger buffer must not be silently cropped either
        assert!(frame.to_image(1, 2).is_err());
        assert!(frame.to_image(u32::MAX, u32::MAX).is_err());

        let full_hd = ExtractedFrame {
            bytes: vec![0; 1920 * 1080 * 3],
            encoding: FrameEncoding::RawRgb24,
        };
        assert!(full_hd.to_image(640, 480).is_err());
        assert!(full_hd.to_image(1920, 1080).is_ok());
    }

    #[test]
    fn test_jpeg_frame_to_image() {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(8, 6)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();
        let frame = ExtractedFrame {
            bytes,
            encoding: FrameEncoding::Jpeg,
        };
        let img = frame.to_image(0, 0).unwrap();
        assert_eq!((img.width(), img.height()), (8, 6));
    }

    #[test]
    fn test_missing_engine_is_engine_error() {
        let extractor = FrameExtractor::new("media-frame-no-such-ffmpeg", 2);
        let err = extractor
            .extract(MediaHandle::Buffer(b"xx"), ResolvedTarget::FrameIndex(1), FrameEncoding::Jpeg)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Engine(_)));
    }
}
