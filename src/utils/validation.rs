use std::path::Path;
use crate::utils::{ConfigError, ImageFormat};

/// Validates that an input exists, is a file, and carries a supported extension
pub fn validate_input_path(path: &Path) -> Result<ImageFormat, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::InputNotFound(path.to_path_buf()));
    }

    if !path.is_file() {
        return Err(ConfigError::NotAFile(path.to_path_buf()));
    }

    ImageFormat::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        ConfigError::UnsupportedFormat(ext)
    })
}

/// Validates a quality dial value and narrows it to `u8`
pub fn validate_quality(quality: u32) -> Result<u8, ConfigError> {
    if quality == 0 || quality > 100 {
        return Err(ConfigError::InvalidQuality(quality));
    }
    Ok(quality as u8)
}

/// Validates an optional dimension; `Some(0)` is rejected
pub fn validate_dimension(name: &str, value: Option<u32>) -> Result<Option<u32>, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::resize(format!("{name} cannot be 0"))),
        other => Ok(other),
    }
}
