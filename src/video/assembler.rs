use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::EncodingConfig;
use crate::error::{Result, SketchError};
use crate::media::{EncodeRequest, MediaBackend};
use crate::video::types::{duration_tolerance, AssembledVideo, PresentationSchedule, Resolution};

/// Encodes an ordered frame sequence into a silent video of a requested length
pub struct VideoAssembler {
    backend: Arc<dyn MediaBackend>,
    encoding: EncodingConfig,
    scratch_dir: Option<PathBuf>,
}

impl VideoAssembler {
    pub fn new(backend: Arc<dyn MediaBackend>, encoding: EncodingConfig) -> Self {
        Self {
            backend,
            encoding,
            scratch_dir: None,
        }
    }

    /// Keep encoder temporaries in `dir` instead of next to the output
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn assemble<P: AsRef<Path>>(
        &self,
        frames: &[PathBuf],
        frame_count: usize,
        duration_seconds: f64,
        target_fps: f64,
        output_path: P,
    ) -> Result<AssembledVideo> {
        let output_path = output_path.as_ref();

        if frames.is_empty() || frame_count == 0 {
            return Err(SketchError::codec("cannot assemble a video from zero frames"));
        }
        if frames.len() != frame_count {
            return Err(SketchError::FrameCountMismatch {
                expected: frame_count,
                actual: frames.len(),
            });
        }
        if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
            return Err(SketchError::invalid_argument(format!(
                "duration must be positive, got {}",
                duration_seconds
            )));
        }
        if !(target_fps.is_finite() && target_fps > 0.0) {
            return Err(SketchError::invalid_argument(format!(
                "target fps must be positive, got {}",
                target_fps
            )));
        }

        let resolution = Resolution::of_image(&frames[0])
            .map_err(|e| SketchError::codec(format!("first frame is unreadable: {}", e)))?;
        if resolution.is_empty() {
            return Err(SketchError::codec(format!("first frame has no pixels ({})", resolution)));
        }

        let schedule = PresentationSchedule::reconcile(frame_count, target_fps, duration_seconds);
        if schedule.stretched {
            info!(
                "{} frames at {} fps would last {:.3}s; presenting each for {:.4}s to fill {:.3}s",
                frame_count,
                target_fps,
                frame_count as f64 / target_fps,
                schedule.frame_interval,
                duration_seconds
            );
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SketchError::io(parent, e))?;
        }

        let odd = resolution.width % 2 == 1 || resolution.height % 2 == 1;
        let pad_to_even = odd && self.encoding.requires_even_dimensions();
        if pad_to_even {
            warn!("Padding {} frames to even dimensions for {}", resolution, self.encoding.codec);
        }

        let scratch_dir = match &self.scratch_dir {
            Some(dir) => dir.as_path(),
            None => output_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new(".")),
        };

        self.backend.encode_frames(&EncodeRequest {
            frames,
            schedule: &schedule,
            output: output_path,
            encoding: &self.encoding,
            pad_to_even,
            scratch_dir,
        })?;

        if !output_path.is_file() {
            return Err(SketchError::io(
                output_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "encoder wrote no output"),
            ));
        }

        let info = self.backend.probe(output_path)?;
        let achieved = info.video_duration().unwrap_or(info.duration_seconds);
        let drift = (achieved - duration_seconds).abs();
        if drift > duration_tolerance(target_fps) {
            return Err(SketchError::codec(format!(
                "duration drift: encoded {:.3}s, requested {:.3}s",
                achieved, duration_seconds
            )));
        }

        info!(
            "Assembled {} frames into {} ({:.3}s at {:.3} fps)",
            frame_count,
            output_path.display(),
            achieved,
            schedule.effective_frame_rate()
        );

        Ok(AssembledVideo {
            path: output_path.to_path_buf(),
            duration_seconds: achieved,
            frame_rate: schedule.effective_frame_rate(),
            frame_count,
            stretched: schedule.stretched,
        })
    }
}
