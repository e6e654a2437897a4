//! Size-targeting quality search.
//!
//! Binary search over the integer quality dial for the highest quality whose
//! encoded output fits a byte budget. Each attempt is a full encode, so the
//! attempt count is capped and no quality is encoded twice.

use tracing::debug;

use crate::utils::{ConvertResult, ImageFormat};
use super::codec::{encode, RasterImage};

/// Upper bound on encodes per search; ceil(log2(100)) + 1.
pub const MAX_ATTEMPTS: u32 = 8;

/// Outcome of a quality search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualitySearch {
    /// Chosen quality, `None` for formats without a quality dial
    pub quality: Option<u8>,
    /// Encoded output at `quality`
    pub bytes: Vec<u8>,
    /// Whether `bytes` fits the budget
    pub met: bool,
    /// Number of encodes performed
    pub attempts: u32,
}

impl QualitySearch {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Finds the highest quality in `low..=high` whose encoding of `image` is at
/// most `max_bytes`.
///
/// When nothing fits, returns the output at `low` with `met == false`.
/// Lossless formats are encoded once and reported as-is.
pub fn find_quality(
    image: &RasterImage,
    format: ImageFormat,
    max_bytes: u64,
    low: u8,
    high: u8,
) -> ConvertResult<QualitySearch> {
    if !format.supports_quality() {
        let bytes = encode(image, format, high)?;
        let met = bytes.len() as u64 <= max_bytes;
        debug!("{format} has no quality dial; {} bytes against {max_bytes}", bytes.len());
        return Ok(QualitySearch { quality: None, bytes, met, attempts: 1 });
    }

    search_with(low, high, max_bytes, |quality| encode(image, format, quality))
}

/// Search driver, generic over the encoder so it can be tested without encoding.
pub(crate) fn search_with<F>(low: u8, high: u8, max_bytes: u64, mut encode_at: F) -> ConvertResult<QualitySearch>
where
    F: FnMut(u8) -> ConvertResult<Vec<u8>>,
{
    let low = low.clamp(1, 100);
    let high = high.clamp(low, 100);

    let mut lo = u32::from(low);
    let mut hi = u32::from(high);
    let mut attempts = 0;
    // Highest quality known to fit
    let mut best: Option<(u8, Vec<u8>)> = None;
    // Lowest quality known not to fit; reused if nothing fits
    let mut floor: Option<(u8, Vec<u8>)> = None;

    while lo <= hi && attempts < MAX_ATTEMPTS {
        let mid = lo + (hi - lo) / 2;
        let quality = mid as u8;
        let bytes = encode_at(quality)?;
        attempts += 1;

        let size = bytes.len() as u64;
        debug!("Attempt {attempts}: quality {quality} -> {size} bytes (budget {max_bytes})");

        if size <= max_bytes {
            best = Some((quality, bytes));
            lo = mid + 1;
        } else {
            if floor.as_ref().is_none_or(|(q, _)| quality < *q) {
                floor = Some((quality, bytes));
            }
            // lo >= 1, so mid >= 1
            hi = mid - 1;
        }
    }

    if let Some((quality, bytes)) = best {
        return Ok(QualitySearch { quality: Some(quality), bytes, met: true, attempts });
    }

    // Nothing fit: settle on the lowest bound
    let bytes = match floor {
        Some((quality, bytes)) if quality == low => bytes,
        _ => {
            attempts += 1;
            encode_at(low)?
        }
    };
    let met = bytes.len() as u64 <= max_bytes;
    Ok(QualitySearch { quality: Some(low), bytes, met, attempts })
}
