use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use crate::utils::ConfigError;

/// Formats the converter can both decode and encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    PNG,
    JPEG,
    BMP,
    GIF,
    TIFF,
    WebP,
}

/// What an encoder for a format can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCapabilities {
    /// Lossy codec with a 1-100 quality dial
    pub supports_quality: bool,
    /// Can store an alpha channel
    pub supports_alpha: bool,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 6] = [
        Self::PNG,
        Self::JPEG,
        Self::BMP,
        Self::GIF,
        Self::TIFF,
        Self::WebP,
    ];

    /// Capability table, one row per format
    pub const fn capabilities(self) -> FormatCapabilities {
        match self {
            Self::JPEG => FormatCapabilities { supports_quality: true, supports_alpha: false },
            Self::WebP => FormatCapabilities { supports_quality: true, supports_alpha: true },
            Self::PNG | Self::BMP | Self::GIF | Self::TIFF => {
                FormatCapabilities { supports_quality: false, supports_alpha: true }
            }
        }
    }

    pub fn supports_quality(self) -> bool {
        self.capabilities().supports_quality
    }

    pub fn supports_alpha(self) -> bool {
        self.capabilities().supports_alpha
    }

    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::PNG => &["png"],
            Self::JPEG => &["jpg", "jpeg"],
            Self::BMP => &["bmp"],
            Self::GIF => &["gif"],
            Self::TIFF => &["tiff", "tif"],
            Self::WebP => &["webp"],
        }
    }

    /// Check if the extension matches this format
    pub fn matches_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.extensions().contains(&ext.as_str())
    }

    /// Get the primary extension for this format
    pub fn primary_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Format implied by a path's extension, if it is a supported one
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|f| f.matches_extension(ext))
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::PNG => image::ImageFormat::Png,
            Self::JPEG => image::ImageFormat::Jpeg,
            Self::BMP => image::ImageFormat::Bmp,
            Self::GIF => image::ImageFormat::Gif,
            Self::TIFF => image::ImageFormat::Tiff,
            Self::WebP => image::ImageFormat::WebP,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.matches_extension(&name))
            .ok_or(ConfigError::UnsupportedFormat(name))
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PNG => "PNG",
            Self::JPEG => "JPEG",
            Self::BMP => "BMP",
            Self::GIF => "GIF",
            Self::TIFF => "TIFF",
            Self::WebP => "WebP",
        };
        f.write_str(name)
    }
}
