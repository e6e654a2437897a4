use std::path::{Path, PathBuf};
use crate::utils::{ConvertError, ConvertResult, ImageFormat};

/// Folder created next to the first input when no output directory is set.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "processed images";

/// File stem of a source image, `output` when it has none
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// File name component of a path, for progress messages and logs
pub fn extract_filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Default output directory for a batch: `<parent of first input>/processed images`
pub fn default_output_dir(first_input: &Path) -> PathBuf {
    first_input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_OUTPUT_DIR_NAME)
}

/// Builds `{prefix}{stem}{suffix}{part}.{ext}`.
///
/// `part` is the cut suffix (`-top`, `-left`, ...) or empty.
pub fn output_file_name(
    stem: &str,
    prefix: &str,
    suffix: &str,
    part: &str,
    format: ImageFormat,
) -> String {
    format!("{prefix}{stem}{suffix}{part}.{}", format.primary_extension())
}

/// Writes `bytes` to `path`, creating the parent directory if needed.
///
/// Returns the number of bytes written.
pub fn write_output(path: &Path, bytes: &[u8]) -> ConvertResult<u64> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConvertError::io_write(parent, &e))?;
    }
    std::fs::write(path, bytes).map_err(|e| ConvertError::io_write(path, &e))?;
    Ok(bytes.len() as u64)
}
