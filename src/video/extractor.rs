use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ExtractionConfig;
use crate::error::{Result, SketchError};
use crate::media::{DecodeRequest, MediaBackend};
use crate::video::types::{FrameManifest, FrameNaming, Resolution, SamplingPlan, VideoAsset};

/// Decodes a source video into an ordered, zero-indexed frame sequence
pub struct FrameExtractor {
    backend: Arc<dyn MediaBackend>,
    config: ExtractionConfig,
}

impl FrameExtractor {
    pub fn new(backend: Arc<dyn MediaBackend>, config: ExtractionConfig) -> Self {
        Self { backend, config }
    }

    /// Probe a source video
    pub fn probe<P: AsRef<Path>>(&self, video_path: P) -> Result<VideoAsset> {
        let path = video_path.as_ref();
        if !path.is_file() {
            return Err(SketchError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "video does not exist"),
            ));
        }

        let info = self.backend.probe(path)?;
        let video = info
            .video
            .as_ref()
            .ok_or_else(|| SketchError::codec(format!("{} has no video stream", path.display())))?;

        if video.resolution.is_empty() {
            return Err(SketchError::codec(format!(
                "{} reports an empty frame size",
                path.display()
            )));
        }

        Ok(VideoAsset {
            path: path.to_path_buf(),
            duration_seconds: info.video_duration().unwrap_or(info.duration_seconds),
            source_frame_rate: video.frame_rate,
            resolution: video.resolution,
            has_audio: info.audio.is_some(),
        })
    }

    /// Sample `video_path` at `target_fps` into `output_directory`
    pub fn extract<P, Q>(&self, video_path: P, output_directory: Q, target_fps: f64) -> Result<FrameManifest>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        check_rate(target_fps)?;
        let asset = self.probe(video_path)?;
        self.extract_asset(&asset, output_directory.as_ref(), target_fps)
    }

    /// Like [`extract`](Self::extract) for an already probed source
    pub fn extract_asset(&self, asset: &VideoAsset, output_directory: &Path, target_fps: f64) -> Result<FrameManifest> {
        check_rate(target_fps)?;
        std::fs::create_dir_all(output_directory).map_err(|e| SketchError::io(output_directory, e))?;

        let actual_fps = target_fps.min(self.config.max_fps);
        if actual_fps < target_fps {
            warn!("Target rate {} fps clamped to {} fps", target_fps, actual_fps);
        }

        // streams without a usable rate are sampled as if they matched the target
        let source_fps = if asset.source_frame_rate > 0.0 {
            asset.source_frame_rate
        } else {
            actual_fps
        };
        let plan = SamplingPlan::new(asset.duration_seconds, source_fps, actual_fps);
        if plan.frame_count == 0 {
            return Err(SketchError::codec(format!(
                "{} is too short ({:.3}s) to sample at {} fps",
                asset.path.display(),
                asset.duration_seconds,
                actual_fps
            )));
        }

        let naming = FrameNaming::new(output_directory, self.config.frame_format.extension());
        let scale_to = self
            .config
            .max_dimension
            .map(|max| asset.resolution.fit_within(max))
            .filter(|scaled| *scaled != asset.resolution);

        let stale = naming.clear()?;
        if stale > 0 {
            warn!(
                "Removed {} frames left over in {}",
                stale,
                output_directory.display()
            );
        }

        let written = self.backend.decode_frames(&DecodeRequest {
            source: &asset.path,
            plan: &plan,
            naming: &naming,
            scale_to,
            format: self.config.frame_format,
            jpeg_quality: self.config.jpeg_quality,
        })?;

        self.reconcile_count(&naming, written, plan.frame_count)?;

        let resolution = Resolution::of_image(naming.path(0))?;
        let frames = naming.paths(plan.frame_count);

        info!(
            "Extracted {} frames ({}) at {} fps from {} ({} repeated)",
            plan.frame_count,
            resolution,
            actual_fps,
            asset.path.display(),
            plan.duplicated_frames()
        );

        Ok(FrameManifest {
            staging_directory: output_directory.to_path_buf(),
            frame_count: plan.frame_count,
            target_frame_rate: actual_fps,
            duration_seconds: asset.duration_seconds,
            resolution,
            frames,
        })
    }

    /// Make the staged sequence exactly `planned` frames long
    fn reconcile_count(&self, naming: &FrameNaming, written: usize, planned: usize) -> Result<()> {
        if written == 0 {
            return Err(SketchError::codec("decoder produced no frames"));
        }

        if written < planned {
            let missing = planned - written;
            if missing > self.config.max_tail_padding {
                return Err(SketchError::FrameCountMismatch {
                    expected: planned,
                    actual: written,
                });
            }
            warn!("Decoder stopped {} frames early, repeating the last frame", missing);
            let last = naming.path(written - 1);
            for index in written..planned {
                let target = naming.path(index);
                std::fs::copy(&last, &target).map_err(|e| SketchError::io(&target, e))?;
            }
        } else if written > planned {
            for index in planned..written {
                let surplus = naming.path(index);
                std::fs::remove_file(&surplus).map_err(|e| SketchError::io(&surplus, e))?;
            }
        }

        let on_disk = naming.count_on_disk()?;
        if on_disk != planned {
            return Err(SketchError::FrameCountMismatch {
                expected: planned,
                actual: on_disk,
            });
        }
        Ok(())
    }
}

fn check_rate(target_fps: f64) -> Result<()> {
    if target_fps.is_finite() && target_fps > 0.0 {
        Ok(())
    } else {
        Err(SketchError::invalid_argument(format!(
            "target fps must be a positive number, got {}",
            target_fps
        )))
    }
}
