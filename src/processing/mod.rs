//! Image processing: planning, the codec adapter, quality search and the
//! per-job pipeline.

pub mod codec;
pub mod executor;
pub mod planner;
pub mod search;

pub use codec::RasterImage;
pub use executor::{apply_steps, convert_job};
pub use planner::plan;
pub use search::{find_quality, QualitySearch, MAX_ATTEMPTS};
