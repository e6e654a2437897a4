//! Planned job definition and the typed policies it carries.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use ab_glyph::FontArc;
use crate::utils::{ConfigError, ImageFormat, output_file_name};

/// How the encoder quality is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPolicy {
    /// Fixed quality dial, 1-100
    Fixed(u8),
    /// Highest quality, up to `max_quality`, whose output fits `max_bytes`
    TargetSize { max_bytes: u64, max_quality: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    None,
    /// One of the width-based web sizes
    Preset { width: u32, lock_aspect: bool },
    /// Explicit width and/or height
    Custom { width: Option<u32>, height: Option<u32>, lock_aspect: bool },
    /// Scale both axes by a percentage, 1-500
    Percent(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutPolicy {
    None,
    /// Top and bottom halves
    Horizontal,
    /// Left and right halves
    Vertical,
}

/// Which half of a cut an image is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutPart {
    Top,
    Bottom,
    Left,
    Right,
}

impl CutPart {
    /// Suffix appended to the output file stem
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::Top => "-top",
            Self::Bottom => "-bottom",
            Self::Left => "-left",
            Self::Right => "-right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl FromStr for WatermarkAnchor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            "center" | "centre" => Ok(Self::Center),
            other => Err(ConfigError::watermark(format!("unknown position '{other}'"))),
        }
    }
}

/// Validated watermark, shared read-only by every job of a batch.
#[derive(Clone)]
pub struct WatermarkPolicy {
    pub text: String,
    pub anchor: WatermarkAnchor,
    /// Font size in points, applied to the final pixel dimensions
    pub font_size: u32,
    /// Opacity in percent, 0-100
    pub opacity: u8,
    pub font: FontArc,
}

impl fmt::Debug for WatermarkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkPolicy")
            .field("text", &self.text)
            .field("anchor", &self.anchor)
            .field("font_size", &self.font_size)
            .field("opacity", &self.opacity)
            .finish_non_exhaustive()
    }
}

/// One stage of the per-image pipeline, in execution order.
#[derive(Debug, Clone)]
pub enum TransformStep {
    Cut(CutPolicy),
    Resize(ResizePolicy),
    Watermark(Arc<WatermarkPolicy>),
    StripMetadata,
}

/// Output location and naming shared by a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    pub dir: PathBuf,
    pub prefix: String,
    pub suffix: String,
}

/// Represents a single planned conversion.
///
/// Built by the planner, never mutated afterwards, and owned by the one
/// worker that executes it.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Position in the input list
    pub index: usize,
    /// Path to the source image file
    pub source: PathBuf,
    /// File stem the output names are built from, unique within the batch
    pub output_stem: String,
    pub format: ImageFormat,
    pub quality: QualityPolicy,
    /// Stages between decode and encode, only those that apply
    pub steps: Vec<TransformStep>,
    pub naming: OutputNaming,
}

impl JobSpec {
    /// Where the output (or one cut half) of this job is written
    pub fn output_path(&self, part: Option<CutPart>) -> PathBuf {
        let part = part.map(CutPart::file_suffix).unwrap_or("");
        let name = output_file_name(
            &self.output_stem,
            &self.naming.prefix,
            &self.naming.suffix,
            part,
            self.format,
        );
        self.naming.dir.join(name)
    }
}
