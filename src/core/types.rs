//! Core types for conversion settings and results.

use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::utils::ConvertError;

/// Configuration for one batch, as supplied by the front end.
///
/// These are the raw user-facing values; the planner validates them and
/// turns them into typed policies on each [`crate::core::JobSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertSettings {
    /// Output format (png, jpeg, bmp, gif, tiff, webp, or "original")
    pub output_format: String,
    /// Quality dial (1-100), used by lossy formats
    pub quality: u32,
    /// Compress each output to at most this many kilobytes
    pub target_size_kb: Option<u64>,
    /// Highest quality the size search may pick (defaults to 100)
    pub target_max_quality: Option<u32>,
    /// Resize settings for image dimensions
    pub resize: ResizeSettings,
    /// Cut mode: "none", "horizontal", "vertical"
    pub cut_mode: String,
    /// Text watermark, if enabled
    pub watermark: Option<WatermarkSettings>,
    /// Drop embedded colour profiles and other metadata
    pub strip_metadata: bool,
    /// Where outputs go; defaults to "processed images" beside the first input
    pub output_dir: Option<PathBuf>,
    pub filename_prefix: String,
    pub filename_suffix: String,
    /// Number of parallel workers (defaults to available cores, capped)
    pub concurrency: Option<usize>,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            output_format: "webp".to_string(),
            quality: 85,
            target_size_kb: None,
            target_max_quality: None,
            resize: ResizeSettings::default(),
            cut_mode: "none".to_string(),
            watermark: None,
            strip_metadata: false,
            output_dir: None,
            filename_prefix: String::new(),
            filename_suffix: String::new(),
            concurrency: None,
        }
    }
}

/// Resize settings for image dimensions.
///
/// Supports modes: "none", "preset" (width-based web sizes), "custom"
/// (width and/or height), "percentage".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResizeSettings {
    pub mode: String,
    /// Target width in pixels (preset and custom modes)
    pub width: Option<u32>,
    /// Target height in pixels (custom mode)
    pub height: Option<u32>,
    /// Whether to maintain aspect ratio when resizing
    pub maintain_aspect: bool,
    /// Scale factor in percent (percentage mode, 1-500)
    pub percentage: Option<u32>,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            mode: "none".to_string(),
            width: None,
            height: None,
            maintain_aspect: true,
            percentage: None,
        }
    }
}

/// Text watermark settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkSettings {
    pub text: String,
    /// "top-left", "top-right", "bottom-left", "bottom-right" or "center"
    pub position: String,
    /// Font size in points (10-200), relative to the final image
    pub font_size: u32,
    /// Opacity in percent (0-100)
    pub opacity: u32,
    /// TrueType/OpenType font; a system font is used when absent
    pub font_path: Option<PathBuf>,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: "bottom-right".to_string(),
            font_size: 36,
            opacity: 50,
            font_path: None,
        }
    }
}

/// One file written by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub path: PathBuf,
    /// Encoded size in bytes
    pub bytes: u64,
    /// Quality used, for lossy formats
    pub quality: Option<u8>,
    /// Size target requested but not reachable even at the lowest quality
    pub size_target_unmet: bool,
}

/// Result of converting one source image.
///
/// A cut produces two [`OutputFile`]s; a failed job carries `error` and no
/// outputs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Position of the job in the planned batch
    pub index: usize,
    pub source: PathBuf,
    pub outputs: Vec<OutputFile>,
    /// Source file size in bytes
    pub input_bytes: u64,
    /// Sum of output sizes in bytes
    pub output_bytes: u64,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub error: Option<ConvertError>,
}

impl ConversionResult {
    pub fn succeeded(
        index: usize,
        source: PathBuf,
        input_bytes: u64,
        outputs: Vec<OutputFile>,
        elapsed: Duration,
    ) -> Self {
        let output_bytes = outputs.iter().map(|o| o.bytes).sum();
        Self { index, source, outputs, input_bytes, output_bytes, elapsed, error: None }
    }

    pub fn failed(index: usize, source: PathBuf, error: ConvertError, elapsed: Duration) -> Self {
        Self {
            index,
            source,
            outputs: Vec::new(),
            input_bytes: 0,
            output_bytes: 0,
            elapsed,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Lowest quality used across the outputs, if any output was lossy
    pub fn achieved_quality(&self) -> Option<u8> {
        self.outputs.iter().filter_map(|o| o.quality).min()
    }

    /// True when any output missed its size target
    pub fn size_target_unmet(&self) -> bool {
        self.outputs.iter().any(|o| o.size_target_unmet)
    }

    pub fn output_paths(&self) -> Vec<&PathBuf> {
        self.outputs.iter().map(|o| &o.path).collect()
    }
}

pub(crate) fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
