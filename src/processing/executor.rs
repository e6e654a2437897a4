//! Runs one planned job end to end on the calling thread.
//!
//! Read, decode, apply the planned steps, resolve quality, encode, write.
//! Called from a blocking task by the scheduler.

use std::time::Instant;
use tracing::{debug, warn};

use crate::core::{ConversionResult, CutPart, JobSpec, OutputFile, QualityPolicy, TransformStep};
use crate::utils::{extract_filename, write_output, ConvertError, ConvertResult};
use super::codec::{self, RasterImage};
use super::search::find_quality;

/// Lowest quality the size search may fall back to.
pub const MIN_SEARCH_QUALITY: u8 = 1;

/// Converts one job. Never fails: errors are captured in the result.
pub fn convert_job(job: &JobSpec) -> ConversionResult {
    let started = Instant::now();
    match run_pipeline(job) {
        Ok((input_bytes, outputs)) => {
            let result = ConversionResult::succeeded(
                job.index,
                job.source.clone(),
                input_bytes,
                outputs,
                started.elapsed(),
            );
            debug!(
                "'{}' -> {} bytes in {} file(s), {:?}",
                extract_filename(&job.source),
                result.output_bytes,
                result.outputs.len(),
                result.elapsed
            );
            result
        }
        Err(e) => {
            warn!("Conversion failed for {}: {}", job.source.display(), e);
            ConversionResult::failed(job.index, job.source.clone(), e, started.elapsed())
        }
    }
}

fn run_pipeline(job: &JobSpec) -> ConvertResult<(u64, Vec<OutputFile>)> {
    let data = std::fs::read(&job.source).map_err(|e| ConvertError::read(&job.source, &e))?;
    let input_bytes = data.len() as u64;

    let image = codec::decode(&data)?;
    drop(data);
    debug!(
        "Decoded '{}': {}x{}",
        extract_filename(&job.source),
        image.width(),
        image.height()
    );

    let pieces = apply_steps(image, &job.steps)?;

    let mut outputs = Vec::with_capacity(pieces.len());
    for (part, piece) in pieces {
        outputs.push(encode_and_write(job, part, &piece)?);
    }
    Ok((input_bytes, outputs))
}

/// Applies every planned step, in order, to every piece.
///
/// A cut turns the single piece into two; later steps then run on each half.
pub fn apply_steps(
    image: RasterImage,
    steps: &[TransformStep],
) -> ConvertResult<Vec<(Option<CutPart>, RasterImage)>> {
    let mut pieces = vec![(None, image)];

    for step in steps {
        pieces = match step {
            TransformStep::Cut(policy) => {
                let mut halves = Vec::with_capacity(pieces.len() * 2);
                for (_, piece) in pieces {
                    halves.extend(codec::cut(piece, *policy)?);
                }
                halves
            }
            TransformStep::Resize(policy) => pieces
                .into_iter()
                .map(|(part, piece)| (part, codec::apply_resize(piece, policy)))
                .collect(),
            TransformStep::Watermark(policy) => pieces
                .into_iter()
                .map(|(part, piece)| (part, codec::apply_watermark(piece, policy)))
                .collect(),
            TransformStep::StripMetadata => pieces
                .into_iter()
                .map(|(part, piece)| (part, codec::strip_metadata(piece)))
                .collect(),
        };
    }

    Ok(pieces)
}

fn encode_and_write(job: &JobSpec, part: Option<CutPart>, image: &RasterImage) -> ConvertResult<OutputFile> {
    let format = job.format;
    let (bytes, quality, size_target_unmet) = match job.quality {
        QualityPolicy::Fixed(q) => {
            let bytes = codec::encode(image, format, q)?;
            (bytes, format.supports_quality().then_some(q), false)
        }
        QualityPolicy::TargetSize { max_bytes, max_quality } => {
            let search = find_quality(image, format, max_bytes, MIN_SEARCH_QUALITY, max_quality)?;
            if !search.met {
                warn!(
                    "{}{}: size target of {} bytes unmet, best effort is {} bytes",
                    extract_filename(&job.source),
                    part.map(CutPart::file_suffix).unwrap_or(""),
                    max_bytes,
                    search.size()
                );
            }
            (search.bytes, search.quality, !search.met)
        }
    };

    let path = job.output_path(part);
    let written = write_output(&path, &bytes)?;
    debug!("Wrote {} ({} bytes, quality {:?})", path.display(), written, quality);

    Ok(OutputFile { path, bytes: written, quality, size_target_unmet })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CutPolicy, OutputNaming, ResizePolicy};
    use crate::processing::codec::{decode, encode, test_images};
    use crate::utils::ImageFormat;
    use std::path::{Path, PathBuf};

    fn write_image(path: &Path, width: u32, height: u32) {
        let image = RasterImage::new(test_images::gradient(width, height));
        let format = ImageFormat::from_path(path).unwrap();
        std::fs::write(path, encode(&image, format, 90).unwrap()).unwrap();
    }

    fn job(source: PathBuf, out: &Path, format: ImageFormat, quality: QualityPolicy, steps: Vec<TransformStep>) -> JobSpec {
        JobSpec {
            index: 0,
            output_stem: crate::utils::file_stem(&source),
            source,
            format,
            quality,
            steps,
            naming: OutputNaming {
                dir: out.to_path_buf(),
                prefix: String::new(),
                suffix: String::new(),
            },
        }
    }

    #[test]
    fn converts_and_writes_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        write_image(&source, 64, 48);
        let out = dir.path().join("out");

        let result = convert_job(&job(
            source.clone(),
            &out,
            ImageFormat::JPEG,
            QualityPolicy::Fixed(70),
            vec![TransformStep::Resize(ResizePolicy::Percent(50))],
        ));

        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.input_bytes, std::fs::metadata(&source).unwrap().len());
        assert_eq!(result.outputs.len(), 1);
        let output = &result.outputs[0];
        assert_eq!(output.path, out.join("photo.jpg"));
        assert_eq!(output.quality, Some(70));
        assert_eq!(output.bytes, std::fs::metadata(&output.path).unwrap().len());

        let written = decode(&std::fs::read(&output.path).unwrap()).unwrap();
        assert_eq!(written.dimensions(), (32, 24));
    }

    #[test]
    fn cut_writes_two_halves() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wide.bmp");
        write_image(&source, 41, 20);

        let result = convert_job(&job(
            source,
            dir.path(),
            ImageFormat::PNG,
            QualityPolicy::Fixed(80),
            vec![TransformStep::Cut(CutPolicy::Vertical), TransformStep::StripMetadata],
        ));

        assert!(result.is_success());
        let paths: Vec<_> = result.outputs.iter().map(|o| o.path.clone()).collect();
        assert_eq!(paths, vec![dir.path().join("wide-left.png"), dir.path().join("wide-right.png")]);
        // Lossless outputs report no quality
        assert!(result.outputs.iter().all(|o| o.quality.is_none()));

        let left = decode(&std::fs::read(&paths[0]).unwrap()).unwrap();
        let right = decode(&std::fs::read(&paths[1]).unwrap()).unwrap();
        assert_eq!(left.dimensions(), (20, 20));
        assert_eq!(right.dimensions(), (21, 20));
        assert_eq!(result.output_bytes, result.outputs.iter().map(|o| o.bytes).sum::<u64>());
    }

    #[test]
    fn cut_halves_are_resized_independently() {
        let image = RasterImage::new(test_images::gradient(200, 100));
        let steps = vec![
            TransformStep::Cut(CutPolicy::Horizontal),
            TransformStep::Resize(ResizePolicy::Custom { width: Some(50), height: None, lock_aspect: true }),
        ];

        let pieces = apply_steps(image, &steps).unwrap();

        let dims: Vec<_> = pieces.iter().map(|(part, img)| (*part, img.dimensions())).collect();
        assert_eq!(
            dims,
            vec![(Some(CutPart::Top), (50, 13)), (Some(CutPart::Bottom), (50, 13))]
        );
    }

    #[test]
    fn corrupt_source_fails_with_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        std::fs::write(&source, b"\xFF\xD8\xFF garbage, not a jpeg").unwrap();

        let result = convert_job(&job(source, dir.path(), ImageFormat::PNG, QualityPolicy::Fixed(80), Vec::new()));

        assert!(!result.is_success());
        assert!(matches!(result.error, Some(ConvertError::Decode(_))));
        assert!(result.outputs.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn vanished_source_fails_with_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("gone.png");

        let result = convert_job(&job(source, dir.path(), ImageFormat::PNG, QualityPolicy::Fixed(80), Vec::new()));
        assert!(matches!(result.error, Some(ConvertError::Read { .. })));
    }

    #[test]
    fn unwritable_output_fails_with_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.png");
        write_image(&source, 8, 8);
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let result = convert_job(&job(source, &blocker, ImageFormat::PNG, QualityPolicy::Fixed(80), Vec::new()));
        assert!(matches!(result.error, Some(ConvertError::IoWrite { .. })));
    }

    #[test]
    fn each_cut_half_gets_its_own_size_search() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mixed.png");
        // Smooth left half, noisy right half
        let smooth = test_images::gradient(100, 120).to_rgb8();
        let noisy = test_images::noise(100, 120, 5).to_rgb8();
        let pixels = image::RgbImage::from_fn(200, 120, |x, y| {
            if x < 100 { *smooth.get_pixel(x, y) } else { *noisy.get_pixel(x - 100, y) }
        });
        let image = RasterImage::new(image::DynamicImage::ImageRgb8(pixels));
        std::fs::write(&source, encode(&image, ImageFormat::PNG, 90).unwrap()).unwrap();

        let max_bytes = 8_000;
        let steps = vec![TransformStep::Cut(CutPolicy::Vertical)];
        let result = convert_job(&job(
            source,
            dir.path(),
            ImageFormat::JPEG,
            QualityPolicy::TargetSize { max_bytes, max_quality: 100 },
            steps.clone(),
        ));

        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.outputs.len(), 2);
        let halves = apply_steps(image, &steps).unwrap();
        for (output, (_, half)) in result.outputs.iter().zip(&halves) {
            let expected = find_quality(half, ImageFormat::JPEG, max_bytes, MIN_SEARCH_QUALITY, 100).unwrap();
            assert!(!output.size_target_unmet, "{}", output.path.display());
            assert!(output.bytes <= max_bytes);
            assert_eq!(output.quality, expected.quality);
            assert_eq!(output.bytes, expected.size());
        }
    }

    #[test]
    fn size_target_is_met_or_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("noise.png");
        let image = RasterImage::new(test_images::noise(200, 200, 11));
        std::fs::write(&source, encode(&image, ImageFormat::PNG, 90).unwrap()).unwrap();

        for max_bytes in [20_000, 50] {
            let result = convert_job(&job(
                source.clone(),
                dir.path(),
                ImageFormat::JPEG,
                QualityPolicy::TargetSize { max_bytes, max_quality: 100 },
                Vec::new(),
            ));
            assert!(result.is_success());
            let output = &result.outputs[0];
            if output.size_target_unmet {
                assert_eq!(output.quality, Some(MIN_SEARCH_QUALITY));
            } else {
                assert!(output.bytes <= max_bytes);
            }
        }
        // 50 bytes is below any JPEG header
        let tiny = convert_job(&job(
            source,
            dir.path(),
            ImageFormat::JPEG,
            QualityPolicy::TargetSize { max_bytes: 50, max_quality: 100 },
            Vec::new(),
        ));
        assert!(tiny.size_target_unmet());
    }
}
