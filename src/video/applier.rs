use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::ImageError;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::FilteringConfig;
use crate::error::{Result, SketchError};
use crate::filters::FrameTransform;
use crate::pipeline::CancelToken;
use crate::video::types::{FilterJob, FilteredFrameManifest, FrameManifest, FrameNaming, Resolution};

/// Called with `(completed, total)` as frames finish
pub type FrameProgress = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Runs one filter over every frame of a sequence on a bounded worker pool
pub struct FrameFilterApplier {
    config: FilteringConfig,
    cancel: CancelToken,
    progress: Option<FrameProgress>,
}

fn image_error(path: &Path, error: ImageError) -> SketchError {
    match error {
        ImageError::IoError(source) => SketchError::io(path, source),
        other => SketchError::codec(format!("{}: {}", path.display(), other)),
    }
}

impl FrameFilterApplier {
    pub fn new(config: FilteringConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: FrameProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Filter every frame of `job` into `output_directory`
    pub fn apply<P: AsRef<Path>>(&self, job: &FilterJob, output_directory: P) -> Result<FilteredFrameManifest> {
        self.apply_transform(job, output_directory.as_ref(), job.filter.transform())
    }

    /// Run an arbitrary transform over the job's frames
    ///
    /// Output frames keep their index; the first failing frame (by index)
    /// aborts the stage.
    pub fn apply_transform(
        &self,
        job: &FilterJob,
        output_directory: &Path,
        transform: FrameTransform,
    ) -> Result<FilteredFrameManifest> {
        if job.frames.len() != job.frame_count {
            return Err(SketchError::FrameCountMismatch {
                expected: job.frame_count,
                actual: job.frames.len(),
            });
        }
        if job.frame_count == 0 {
            return Err(SketchError::invalid_argument("no frames to filter"));
        }

        std::fs::create_dir_all(output_directory).map_err(|e| SketchError::io(output_directory, e))?;

        let extension = job.frames[0]
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        let naming = FrameNaming::new(output_directory, extension);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .build()
            .map_err(|e| SketchError::invalid_argument(format!("worker pool: {}", e)))?;

        info!(
            "Applying {} to {} frames on {} workers",
            job.filter,
            job.frame_count,
            self.config.workers.max(1)
        );

        let total = job.frame_count;
        let completed = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let interval = self.config.progress_interval.max(1);

        let mut slots: Vec<Option<Result<Resolution>>> = (0..total).map(|_| None).collect();
        pool.install(|| {
            slots.par_iter_mut().enumerate().for_each(|(index, slot)| {
                if self.cancel.is_cancelled() || failed.load(Ordering::SeqCst) {
                    return;
                }

                let result = filter_frame(index, &job.frames[index], &naming.path(index), transform);
                if result.is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
                *slot = Some(result);

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = &self.progress {
                    if done % interval == 0 || done == total {
                        progress(done, total);
                    }
                }
            });
        });

        if self.cancel.is_cancelled() {
            return Err(SketchError::Cancelled);
        }

        let mut resolution = None;
        let mut filled = 0;
        for slot in slots {
            match slot {
                Some(Ok(r)) => {
                    resolution.get_or_insert(r);
                    filled += 1;
                }
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }

        let on_disk = naming.count_on_disk()?;
        if filled != total || on_disk != total {
            return Err(SketchError::FrameCountMismatch {
                expected: total,
                actual: filled.min(on_disk),
            });
        }

        let resolution = resolution.ok_or_else(|| SketchError::codec("no frame was filtered"))?;

        Ok(FilteredFrameManifest {
            filter: job.filter,
            manifest: FrameManifest {
                staging_directory: output_directory.to_path_buf(),
                frame_count: total,
                target_frame_rate: job.target_frame_rate,
                duration_seconds: job.target_duration_seconds,
                resolution,
                frames: naming.paths(total),
            },
        })
    }
}

fn filter_frame(index: usize, source: &Path, target: &Path, transform: FrameTransform) -> Result<Resolution> {
    let input = image::open(source)
        .map_err(|e| image_error(source, e))?
        .to_rgb8();
    let expected = Resolution::from(input.dimensions());

    let output = transform(&input);
    let actual = Resolution::from(output.dimensions());
    if actual != expected {
        return Err(SketchError::DimensionMismatch {
            index,
            expected,
            actual,
        });
    }

    output.save(target).map_err(|e| image_error(target, e))?;
    debug!("Filtered frame {} -> {}", index, target.display());
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::filters::FilterId;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn stage_frames(dir: &Path, count: usize, width: u32, height: u32) -> Vec<PathBuf> {
        std::fs::create_dir_all(dir).unwrap();
        let naming = FrameNaming::new(dir, "png");
        (0..count)
            .map(|i| {
                let shade = (i * 20 % 256) as u8;
                let frame = RgbImage::from_pixel(width, height, Rgb([shade, 128, 255 - shade]));
                let path = naming.path(i);
                frame.save(&path).unwrap();
                path
            })
            .collect()
    }

    fn job(frames: Vec<PathBuf>, filter: FilterId) -> FilterJob {
        FilterJob {
            frame_count: frames.len(),
            frames,
            filter,
            target_duration_seconds: 2.0,
            target_frame_rate: 6.0,
        }
    }

    fn config(workers: usize) -> FilteringConfig {
        FilteringConfig {
            workers,
            progress_interval: 1,
        }
    }

    #[test]
    fn test_output_matches_input_count_and_size() {
        let dir = TempDir::new().unwrap();
        let frames = stage_frames(&dir.path().join("frames"), 12, 17, 9);
        let out = dir.path().join("filtered");

        let manifest = FrameFilterApplier::new(config(3))
            .apply(&job(frames, FilterId::Grayscale), &out)
            .unwrap();

        assert_eq!(manifest.frame_count, 12);
        assert_eq!(manifest.frames.len(), 12);
        assert_eq!(manifest.resolution, Resolution::new(17, 9));
        assert_eq!(manifest.filter, FilterId::Grayscale);
        assert_eq!(manifest.duration_seconds, 2.0);
        for path in &manifest.frames {
            assert_eq!(Resolution::of_image(path).unwrap(), Resolution::new(17, 9));
        }
    }

    #[test]
    fn test_frames_keep_their_index() {
        let dir = TempDir::new().unwrap();
        let frames = stage_frames(&dir.path().join("frames"), 8, 4, 4);
        let manifest = FrameFilterApplier::new(config(4))
            .apply(&job(frames.clone(), FilterId::Grayscale), dir.path().join("out"))
            .unwrap();

        for (source, filtered) in frames.iter().zip(&manifest.frames) {
            let expected = FilterId::Grayscale.apply(&image::open(source).unwrap().to_rgb8());
            assert_eq!(image::open(filtered).unwrap().to_rgb8(), expected);
        }
    }

    #[test]
    fn test_resizing_transform_is_rejected() {
        fn half(image: &RgbImage) -> RgbImage {
            image::imageops::resize(image, image.width() / 2, image.height() / 2, image::imageops::FilterType::Nearest)
        }

        let dir = TempDir::new().unwrap();
        let frames = stage_frames(&dir.path().join("frames"), 3, 8, 8);
        let err = FrameFilterApplier::new(config(1))
            .apply_transform(&job(frames, FilterId::Grayscale), &dir.path().join("out"), half)
            .unwrap_err();

        match err {
            SketchError::DimensionMismatch { index, expected, actual } => {
                assert_eq!(index, 0);
                assert_eq!(expected, Resolution::new(8, 8));
                assert_eq!(actual, Resolution::new(4, 4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_count_mismatch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let frames = stage_frames(&dir.path().join("frames"), 3, 4, 4);
        let mut bad = job(frames, FilterId::Sketch);
        bad.frame_count = 5;

        let out = dir.path().join("out");
        let err = FrameFilterApplier::new(config(2)).apply(&bad, &out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FrameCountMismatch);
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_frame_aborts_stage() {
        let dir = TempDir::new().unwrap();
        let mut frames = stage_frames(&dir.path().join("frames"), 4, 4, 4);
        frames[2] = dir.path().join("frames/gone.png");

        let err = FrameFilterApplier::new(config(2))
            .apply(&job(frames, FilterId::Grayscale), dir.path().join("out"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        let frames = stage_frames(&dir.path().join("frames"), 6, 4, 4);
        let cancel = CancelToken::new();
        cancel.cancel();

        let out = dir.path().join("out");
        let err = FrameFilterApplier::new(config(2))
            .with_cancel(cancel)
            .apply(&job(frames, FilterId::Grayscale), &out)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(FrameNaming::new(&out, "png").count_on_disk().unwrap(), 0);
    }

    #[test]
    fn test_progress_reaches_total() {
        let dir = TempDir::new().unwrap();
        let frames = stage_frames(&dir.path().join("frames"), 5, 4, 4);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        FrameFilterApplier::new(config(2))
            .with_progress(Arc::new(move |done: usize, total: usize| sink.lock().unwrap().push((done, total))))
            .apply(&job(frames, FilterId::Grayscale), dir.path().join("out"))
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.contains(&(5, 5)));
    }
}
