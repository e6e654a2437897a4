pub mod error;
pub mod validation;
pub mod formats;
pub mod fs;

pub use error::{ConfigError, ConvertError, ConvertResult};
pub use validation::{validate_dimension, validate_input_path, validate_quality};
pub use formats::{FormatCapabilities, ImageFormat};
pub use fs::{
    default_output_dir,
    extract_filename,
    file_stem,
    output_file_name,
    write_output,
};
