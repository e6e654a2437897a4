//! Turns raw settings plus a file list into immutable job specs.
//!
//! All validation happens here, once per batch, so a bad setting fails the
//! batch before any image is touched.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{
    ConvertSettings,
    CutPolicy,
    JobSpec,
    OutputNaming,
    QualityPolicy,
    ResizePolicy,
    ResizeSettings,
    TransformStep,
    WatermarkAnchor,
    WatermarkPolicy,
    WatermarkSettings,
};
use crate::utils::{
    default_output_dir,
    file_stem,
    validate_dimension,
    validate_input_path,
    validate_quality,
    ConfigError,
    ImageFormat,
};
use super::codec::resize::{MAX_PERCENT, PRESET_WIDTHS};
use super::codec::watermark::load_font;

/// Accepted watermark font sizes, in points.
pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<u32> = 10..=200;

/// Output format requested for the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatChoice {
    /// Keep each source's own format
    Original,
    Fixed(ImageFormat),
}

impl FormatChoice {
    fn parse(name: &str) -> Result<Self, ConfigError> {
        if name.trim().eq_ignore_ascii_case("original") {
            Ok(Self::Original)
        } else {
            name.parse().map(Self::Fixed)
        }
    }

    fn resolve(self, source_format: ImageFormat) -> ImageFormat {
        match self {
            Self::Original => source_format,
            Self::Fixed(format) => format,
        }
    }
}

/// Plans one job per input file, in input order.
///
/// Fails with the first [`ConfigError`] found; no job is produced in that
/// case. The only I/O is checking that inputs exist and loading the
/// watermark font.
///
/// Inputs whose outputs would land on the same path get distinct stems, see
/// [`disambiguate_outputs`].
pub fn plan(files: &[PathBuf], settings: &ConvertSettings) -> Result<Vec<JobSpec>, ConfigError> {
    let first = files.first().ok_or(ConfigError::NoInputs)?;

    let format = FormatChoice::parse(&settings.output_format)?;
    let quality = quality_policy(settings)?;
    let steps = transform_steps(settings)?;
    if settings.concurrency == Some(0) {
        return Err(ConfigError::InvalidConcurrency);
    }

    let naming = OutputNaming {
        dir: settings
            .output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(first)),
        prefix: settings.filename_prefix.clone(),
        suffix: settings.filename_suffix.clone(),
    };

    let mut jobs = Vec::with_capacity(files.len());
    for (index, source) in files.iter().enumerate() {
        let source_format = validate_input_path(source)?;
        jobs.push(JobSpec {
            index,
            source: source.clone(),
            output_stem: file_stem(source),
            format: format.resolve(source_format),
            quality,
            steps: steps.clone(),
            naming: naming.clone(),
        });
    }
    disambiguate_outputs(&mut jobs);

    debug!(
        "Planned {} jobs -> {} ({:?}, {} steps)",
        jobs.len(),
        naming.dir.display(),
        quality,
        steps.len()
    );
    Ok(jobs)
}

/// Gives every job its own output path.
///
/// Jobs sharing a path get the lowercased source extension appended to their
/// stem (`photo.png` + `photo.bmp` -> `photo-png.jpg`, `photo-bmp.jpg`). Any
/// path still taken after that gets `-2`, `-3`, ... in input order. Paths are
/// compared case-insensitively.
fn disambiguate_outputs(jobs: &mut [JobSpec]) {
    let key = |job: &JobSpec| job.output_path(None).to_string_lossy().to_lowercase();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for job in jobs.iter() {
        *counts.entry(key(job)).or_default() += 1;
    }

    let mut taken = HashSet::new();
    for job in jobs.iter_mut() {
        let original = job.output_stem.clone();
        if counts.get(&key(job)).is_some_and(|&n| n > 1) {
            if let Some(ext) = job.source.extension() {
                job.output_stem = format!("{original}-{}", ext.to_string_lossy().to_lowercase());
            }
        }

        let base = job.output_stem.clone();
        let mut n = 2;
        while !taken.insert(key(job)) {
            job.output_stem = format!("{base}-{n}");
            n += 1;
        }

        if job.output_stem != original {
            warn!(
                "{} shares its output name with another input; writing it as {}",
                job.source.display(),
                job.output_path(None).display()
            );
        }
    }
}

fn quality_policy(settings: &ConvertSettings) -> Result<QualityPolicy, ConfigError> {
    let quality = validate_quality(settings.quality)?;
    let max_quality = settings
        .target_max_quality
        .map(validate_quality)
        .transpose()?
        .unwrap_or(100);

    match settings.target_size_kb {
        None => Ok(QualityPolicy::Fixed(quality)),
        Some(0) => Err(ConfigError::InvalidTargetSize),
        Some(kb) => {
            let max_bytes = kb.checked_mul(1024).ok_or(ConfigError::InvalidTargetSize)?;
            Ok(QualityPolicy::TargetSize { max_bytes, max_quality })
        }
    }
}

/// The optional stages, in execution order: cut, resize, watermark, strip.
fn transform_steps(settings: &ConvertSettings) -> Result<Vec<TransformStep>, ConfigError> {
    let mut steps = Vec::new();

    let cut = cut_policy(&settings.cut_mode)?;
    if cut != CutPolicy::None {
        steps.push(TransformStep::Cut(cut));
    }

    let resize = resize_policy(&settings.resize)?;
    if resize != ResizePolicy::None {
        steps.push(TransformStep::Resize(resize));
    }

    if let Some(watermark) = settings.watermark.as_ref() {
        steps.push(TransformStep::Watermark(Arc::new(watermark_policy(watermark)?)));
    }

    if settings.strip_metadata {
        steps.push(TransformStep::StripMetadata);
    }

    Ok(steps)
}

pub fn cut_policy(mode: &str) -> Result<CutPolicy, ConfigError> {
    match mode.trim().to_lowercase().as_str() {
        "" | "none" => Ok(CutPolicy::None),
        "horizontal" => Ok(CutPolicy::Horizontal),
        "vertical" => Ok(CutPolicy::Vertical),
        other => Err(ConfigError::UnknownCutMode(other.to_string())),
    }
}

pub fn resize_policy(resize: &ResizeSettings) -> Result<ResizePolicy, ConfigError> {
    let lock_aspect = resize.maintain_aspect;
    match resize.mode.trim().to_lowercase().as_str() {
        "" | "none" => Ok(ResizePolicy::None),
        "preset" => {
            let width = resize
                .width
                .ok_or_else(|| ConfigError::resize("preset mode needs a width"))?;
            if !PRESET_WIDTHS.contains(&width) {
                return Err(ConfigError::resize(format!(
                    "{width} is not a preset width ({PRESET_WIDTHS:?})"
                )));
            }
            Ok(ResizePolicy::Preset { width, lock_aspect })
        }
        "custom" => {
            let width = validate_dimension("width", resize.width)?;
            let height = validate_dimension("height", resize.height)?;
            if width.is_none() && height.is_none() {
                return Err(ConfigError::resize("custom mode needs a width or a height"));
            }
            Ok(ResizePolicy::Custom { width, height, lock_aspect })
        }
        "percentage" => match resize.percentage {
            Some(p) if (1..=MAX_PERCENT).contains(&p) => Ok(ResizePolicy::Percent(p)),
            Some(p) => Err(ConfigError::resize(format!(
                "percentage {p} is outside 1..={MAX_PERCENT}"
            ))),
            None => Err(ConfigError::resize("percentage mode needs a percentage")),
        },
        other => Err(ConfigError::resize(format!("unknown resize mode '{other}'"))),
    }
}

fn watermark_policy(settings: &WatermarkSettings) -> Result<WatermarkPolicy, ConfigError> {
    let text = settings.text.trim();
    if text.is_empty() {
        return Err(ConfigError::watermark("text is empty"));
    }
    let anchor: WatermarkAnchor = settings.position.parse()?;
    if !FONT_SIZE_RANGE.contains(&settings.font_size) {
        return Err(ConfigError::watermark(format!(
            "font size {} is outside {}..={}",
            settings.font_size,
            FONT_SIZE_RANGE.start(),
            FONT_SIZE_RANGE.end()
        )));
    }
    if settings.opacity > 100 {
        return Err(ConfigError::watermark(format!(
            "opacity {} is above 100",
            settings.opacity
        )));
    }
    let font = load_font(settings.font_path.as_deref())?;

    Ok(WatermarkPolicy {
        text: text.to_string(),
        anchor,
        font_size: settings.font_size,
        opacity: settings.opacity as u8,
        font,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Creates placeholder inputs; planning never decodes them
    fn inputs(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, b"placeholder").unwrap();
                path
            })
            .collect()
    }

    fn settings(format: &str) -> ConvertSettings {
        ConvertSettings { output_format: format.to_string(), ..Default::default() }
    }

    #[test]
    fn one_job_per_input_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["b.png", "a.jpg", "c.gif"]);

        let jobs = plan(&files, &settings("webp")).unwrap();

        assert_eq!(jobs.len(), 3);
        for (i, job) in jobs.iter().enumerate() {
            assert_eq!(job.index, i);
            assert_eq!(job.source, files[i]);
            assert_eq!(job.format, ImageFormat::WebP);
            assert_eq!(job.quality, QualityPolicy::Fixed(85));
            assert!(job.steps.is_empty());
        }
        assert_eq!(jobs[0].naming.dir, dir.path().join("processed images"));
        assert_eq!(jobs[1].output_path(None), dir.path().join("processed images/a.webp"));
    }

    #[test]
    fn planning_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["x.png", "y.bmp"]);
        let mut config = settings("jpeg");
        config.cut_mode = "vertical".to_string();
        config.target_size_kb = Some(40);

        let first = format!("{:?}", plan(&files, &config).unwrap());
        let second = format!("{:?}", plan(&files, &config).unwrap());
        assert_eq!(first, second);
    }

    fn output_names(jobs: &[JobSpec]) -> Vec<String> {
        jobs.iter()
            .map(|job| job.output_path(None).file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn same_stem_inputs_get_distinct_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["photo.png", "other.gif", "photo.bmp"]);

        let jobs = plan(&files, &settings("jpeg")).unwrap();

        assert_eq!(output_names(&jobs), vec!["photo-png.jpg", "other.jpg", "photo-bmp.jpg"]);
    }

    #[test]
    fn same_name_in_different_folders_is_numbered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        let files = inputs(&dir, &["a/photo.png", "b/Photo.PNG"]);
        let mut config = settings("webp");
        config.output_dir = Some(dir.path().join("out"));

        let jobs = plan(&files, &config).unwrap();

        assert_eq!(output_names(&jobs), vec!["photo-png.webp", "Photo-png-2.webp"]);
    }

    #[test]
    fn original_format_keeps_same_stem_outputs_apart() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["photo.png", "photo.bmp"]);

        let jobs = plan(&files, &settings("original")).unwrap();

        assert_eq!(output_names(&jobs), vec!["photo.png", "photo.bmp"]);
    }

    #[test]
    fn original_format_follows_each_source() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["a.PNG", "b.jpeg", "c.tif"]);

        let formats: Vec<_> = plan(&files, &settings("Original"))
            .unwrap()
            .iter()
            .map(|job| job.format)
            .collect();

        assert_eq!(formats, vec![ImageFormat::PNG, ImageFormat::JPEG, ImageFormat::TIFF]);
    }

    #[test]
    fn steps_follow_pipeline_order() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["a.png"]);
        let mut config = settings("png");
        config.strip_metadata = true;
        config.cut_mode = "horizontal".to_string();
        config.resize = ResizeSettings {
            mode: "percentage".to_string(),
            percentage: Some(50),
            ..Default::default()
        };

        let jobs = plan(&files, &config).unwrap();
        let steps = &jobs[0].steps;

        assert_eq!(steps.len(), 3);
        assert!(matches!(steps[0], TransformStep::Cut(CutPolicy::Horizontal)));
        assert!(matches!(steps[1], TransformStep::Resize(ResizePolicy::Percent(50))));
        assert!(matches!(steps[2], TransformStep::StripMetadata));
    }

    #[test]
    fn target_size_becomes_byte_budget() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["a.png"]);
        let mut config = settings("jpg");
        config.target_size_kb = Some(100);
        config.target_max_quality = Some(90);

        let jobs = plan(&files, &config).unwrap();
        assert_eq!(
            jobs[0].quality,
            QualityPolicy::TargetSize { max_bytes: 102_400, max_quality: 90 }
        );
    }

    #[test]
    fn config_errors_abort_planning() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["a.png"]);

        assert_eq!(plan(&[], &settings("png")).unwrap_err(), ConfigError::NoInputs);
        assert_eq!(
            plan(&files, &settings("avif")).unwrap_err(),
            ConfigError::UnsupportedFormat("avif".to_string())
        );

        let mut config = settings("png");
        config.quality = 0;
        assert_eq!(plan(&files, &config).unwrap_err(), ConfigError::InvalidQuality(0));

        let mut config = settings("png");
        config.target_size_kb = Some(0);
        assert_eq!(plan(&files, &config).unwrap_err(), ConfigError::InvalidTargetSize);

        let mut config = settings("png");
        config.cut_mode = "diagonal".to_string();
        assert_eq!(
            plan(&files, &config).unwrap_err(),
            ConfigError::UnknownCutMode("diagonal".to_string())
        );

        let mut config = settings("png");
        config.concurrency = Some(0);
        assert_eq!(plan(&files, &config).unwrap_err(), ConfigError::InvalidConcurrency);
    }

    #[test]
    fn missing_input_fails_the_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = inputs(&dir, &["a.png"]);
        let missing = dir.path().join("missing.png");
        files.push(missing.clone());

        assert_eq!(
            plan(&files, &settings("png")).unwrap_err(),
            ConfigError::InputNotFound(missing)
        );
    }

    #[test]
    fn resize_validation() {
        let resize = |mode: &str, width, height, percentage| ResizeSettings {
            mode: mode.to_string(),
            width,
            height,
            maintain_aspect: true,
            percentage,
        };

        assert_eq!(
            resize_policy(&resize("preset", Some(800), None, None)),
            Ok(ResizePolicy::Preset { width: 800, lock_aspect: true })
        );
        assert!(resize_policy(&resize("preset", Some(1000), None, None)).is_err());
        assert!(resize_policy(&resize("preset", None, None, None)).is_err());

        assert_eq!(
            resize_policy(&resize("custom", None, Some(300), None)),
            Ok(ResizePolicy::Custom { width: None, height: Some(300), lock_aspect: true })
        );
        assert!(resize_policy(&resize("custom", None, None, None)).is_err());
        assert!(resize_policy(&resize("custom", Some(0), Some(10), None)).is_err());

        assert_eq!(resize_policy(&resize("percentage", None, None, Some(500))), Ok(ResizePolicy::Percent(500)));
        assert!(resize_policy(&resize("percentage", None, None, Some(0))).is_err());
        assert!(resize_policy(&resize("percentage", None, None, Some(501))).is_err());

        assert_eq!(resize_policy(&resize("none", Some(5), None, None)), Ok(ResizePolicy::None));
        assert!(matches!(
            resize_policy(&resize("stretch", None, None, None)),
            Err(ConfigError::InvalidResize(_))
        ));
    }

    #[test]
    fn watermark_validation() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["a.png"]);
        let with_watermark = |watermark: WatermarkSettings| ConvertSettings {
            watermark: Some(watermark),
            ..settings("png")
        };

        let blank = WatermarkSettings { text: "   ".to_string(), ..Default::default() };
        assert!(matches!(
            plan(&files, &with_watermark(blank)),
            Err(ConfigError::InvalidWatermark(_))
        ));

        let tiny = WatermarkSettings { text: "x".to_string(), font_size: 5, ..Default::default() };
        assert!(plan(&files, &with_watermark(tiny)).is_err());

        let opaque = WatermarkSettings { text: "x".to_string(), opacity: 101, ..Default::default() };
        assert!(plan(&files, &with_watermark(opaque)).is_err());

        let nowhere = WatermarkSettings {
            text: "x".to_string(),
            position: "middle".to_string(),
            ..Default::default()
        };
        assert!(plan(&files, &with_watermark(nowhere)).is_err());

        let no_font = WatermarkSettings {
            text: "x".to_string(),
            font_path: Some(Path::new("/nonexistent/font.ttf").to_path_buf()),
            ..Default::default()
        };
        assert!(plan(&files, &with_watermark(no_font)).is_err());
    }

    #[test]
    fn watermark_is_shared_across_jobs() {
        // Needs a system font to build the policy
        if load_font(None).is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(&dir, &["a.png", "b.png"]);
        let config = ConvertSettings {
            watermark: Some(WatermarkSettings { text: " (c) 2024 ".to_string(), ..Default::default() }),
            ..settings("png")
        };

        let jobs = plan(&files, &config).unwrap();
        let marks: Vec<_> = jobs
            .iter()
            .map(|job| match &job.steps[..] {
                [TransformStep::Watermark(w)] => Arc::clone(w),
                other => panic!("unexpected steps {other:?}"),
            })
            .collect();

        assert!(Arc::ptr_eq(&marks[0], &marks[1]));
        assert_eq!(marks[0].text, "(c) 2024");
        assert_eq!(marks[0].anchor, WatermarkAnchor::BottomRight);
    }
}
