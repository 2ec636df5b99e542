use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SketchError};
use crate::filters::FilterId;

/// Allowed gap between a requested and an achieved video duration: one frame
/// interval at the target rate.
pub fn duration_tolerance(target_fps: f64) -> f64 {
    1.0 / target_fps
}

/// Pixel dimensions of a frame or stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Round both sides down to an even number (minimum 2)
    pub fn even(&self) -> Self {
        Self {
            width: (self.width / 2 * 2).max(2),
            height: (self.height / 2 * 2).max(2),
        }
    }

    /// Downscale to fit inside `max_dimension`, keeping aspect ratio and even sides.
    ///
    /// Resolutions already inside the bound are returned unchanged.
    pub fn fit_within(&self, max_dimension: u32) -> Self {
        let longest = self.width.max(self.height);
        if longest <= max_dimension {
            return *self;
        }

        let scale = max_dimension as f64 / longest as f64;
        Self {
            width: (self.width as f64 * scale) as u32,
            height: (self.height as f64 * scale) as u32,
        }
        .even()
    }

    /// Read the dimensions of an image file without decoding pixels
    pub fn of_image<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (width, height) = image::image_dimensions(path).map_err(|e| match e {
            image::ImageError::IoError(source) => SketchError::io(path, source),
            other => SketchError::codec(format!("{}: {}", path.display(), other)),
        })?;
        Ok(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// A source video as probed by the media backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAsset {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub source_frame_rate: f64,
    pub resolution: Resolution,
    pub has_audio: bool,
}

/// Sequential, zero-padded frame file names inside one directory
///
/// Natural sort order of the generated names equals temporal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNaming {
    pub directory: PathBuf,
    pub prefix: String,
    pub extension: String,
}

impl FrameNaming {
    pub fn new<P: Into<PathBuf>>(directory: P, extension: &str) -> Self {
        Self {
            directory: directory.into(),
            prefix: "frame".to_string(),
            extension: extension.to_string(),
        }
    }

    pub fn file_name(&self, index: usize) -> String {
        format!("{}_{:06}.{}", self.prefix, index, self.extension)
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.directory.join(self.file_name(index))
    }

    pub fn paths(&self, count: usize) -> Vec<PathBuf> {
        (0..count).map(|i| self.path(i)).collect()
    }

    /// ffmpeg image2 pattern matching `path(i)`
    pub fn pattern(&self) -> PathBuf {
        self.directory
            .join(format!("{}_%06d.{}", self.prefix, self.extension))
    }

    /// Files in the directory that follow this naming scheme
    fn files_on_disk(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.directory)
            .map_err(|e| SketchError::io(&self.directory, e))?;

        let prefix = format!("{}_", self.prefix);
        let suffix = format!(".{}", self.extension);
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SketchError::io(&self.directory, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(&suffix) {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    /// Count the files in the directory that follow this naming scheme
    pub fn count_on_disk(&self) -> Result<usize> {
        Ok(self.files_on_disk()?.len())
    }

    /// Leading run of frames `0..limit` present on disk
    pub fn count_contiguous(&self, limit: usize) -> usize {
        (0..limit).take_while(|&i| self.path(i).is_file()).count()
    }

    /// Delete every file following this naming scheme, returning how many went
    pub fn clear(&self) -> Result<usize> {
        let files = self.files_on_disk()?;
        for file in &files {
            std::fs::remove_file(file).map_err(|e| SketchError::io(file, e))?;
        }
        Ok(files.len())
    }
}

/// Uniform sampling of a source video at a target rate
///
/// Frame `i` is taken at `i / target_frame_rate` seconds from the nearest
/// source frame, so a lower target rate skips source frames and a higher one
/// repeats them.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingPlan {
    pub source_duration: f64,
    pub source_frame_rate: f64,
    pub target_frame_rate: f64,
    pub frame_count: usize,
}

impl SamplingPlan {
    pub fn new(source_duration: f64, source_frame_rate: f64, target_frame_rate: f64) -> Self {
        let frame_count = (source_duration * target_frame_rate).round().max(0.0) as usize;
        Self {
            source_duration,
            source_frame_rate,
            target_frame_rate,
            frame_count,
        }
    }

    pub fn timestamp(&self, index: usize) -> f64 {
        index as f64 / self.target_frame_rate
    }

    /// Number of frames the source itself holds
    pub fn source_frame_count(&self) -> usize {
        ((self.source_duration * self.source_frame_rate).ceil() as usize).max(1)
    }

    /// Index of the source frame nearest to sample `index`
    pub fn source_index(&self, index: usize) -> usize {
        let nearest = (self.timestamp(index) * self.source_frame_rate).round() as usize;
        nearest.min(self.source_frame_count() - 1)
    }

    pub fn source_indices(&self) -> Vec<usize> {
        (0..self.frame_count).map(|i| self.source_index(i)).collect()
    }

    /// How many samples reuse the previous sample's source frame
    pub fn duplicated_frames(&self) -> usize {
        self.source_indices()
            .windows(2)
            .filter(|pair| pair[0] == pair[1])
            .count()
    }
}

/// Ordered, dense record of staged frame files
#[derive(Debug, Clone, PartialEq)]
pub struct FrameManifest {
    pub staging_directory: PathBuf,
    pub frame_count: usize,
    pub target_frame_rate: f64,
    pub duration_seconds: f64,
    pub resolution: Resolution,
    pub frames: Vec<PathBuf>,
}

impl FrameManifest {
    /// Nominal length of the sequence at its own rate
    pub fn sequence_duration(&self) -> f64 {
        self.frame_count as f64 / self.target_frame_rate
    }
}

/// Work order for the frame filter applier
#[derive(Debug, Clone)]
pub struct FilterJob {
    pub frames: Vec<PathBuf>,
    pub filter: FilterId,
    pub frame_count: usize,
    pub target_duration_seconds: f64,
    pub target_frame_rate: f64,
}

impl FilterJob {
    pub fn from_manifest(manifest: &FrameManifest, filter: FilterId) -> Self {
        Self {
            frames: manifest.frames.clone(),
            filter,
            frame_count: manifest.frame_count,
            target_duration_seconds: manifest.duration_seconds,
            target_frame_rate: manifest.target_frame_rate,
        }
    }
}

/// A frame manifest produced by running one filter over another manifest
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredFrameManifest {
    pub filter: FilterId,
    pub manifest: FrameManifest,
}

impl std::ops::Deref for FilteredFrameManifest {
    type Target = FrameManifest;

    fn deref(&self) -> &FrameManifest {
        &self.manifest
    }
}

/// Frame timing handed to the encoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationSchedule {
    pub frame_count: usize,
    pub nominal_frame_rate: f64,
    /// Seconds each frame is shown
    pub frame_interval: f64,
    /// Whether timestamps were rescaled to hit the requested duration
    pub stretched: bool,
}

impl PresentationSchedule {
    /// Fit `frame_count` frames at `target_fps` into `duration` seconds.
    ///
    /// Inside tolerance the nominal interval is kept; outside it every
    /// presentation timestamp is scaled by the same factor. Frames are never
    /// dropped or repeated.
    pub fn reconcile(frame_count: usize, target_fps: f64, duration: f64) -> Self {
        let nominal_interval = 1.0 / target_fps;
        let raw_duration = frame_count as f64 * nominal_interval;

        if (raw_duration - duration).abs() <= duration_tolerance(target_fps) {
            Self {
                frame_count,
                nominal_frame_rate: target_fps,
                frame_interval: nominal_interval,
                stretched: false,
            }
        } else {
            Self {
                frame_count,
                nominal_frame_rate: target_fps,
                frame_interval: duration / frame_count as f64,
                stretched: true,
            }
        }
    }

    pub fn effective_frame_rate(&self) -> f64 {
        1.0 / self.frame_interval
    }

    pub fn total_duration(&self) -> f64 {
        self.frame_count as f64 * self.frame_interval
    }

    pub fn presentation_time(&self, index: usize) -> f64 {
        index as f64 * self.frame_interval
    }
}

/// A silent video produced by the assembler
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledVideo {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub frame_rate: f64,
    pub frame_count: usize,
    pub stretched: bool,
}
