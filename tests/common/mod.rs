//! A scripted media backend for hermetic pipeline tests.
//!
//! "Videos" are small JSON descriptors. Decoding writes real PNG frames
//! coloured by their source frame index, so filters run on real pixels while
//! encode and mux only write descriptors.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use sketch_video::audio::AudioFit;
use sketch_video::config::Config;
use sketch_video::media::{
    AudioStreamInfo, DecodeRequest, EncodeRequest, MediaBackend, MediaInfo, MuxRequest, VideoStreamInfo,
};
use sketch_video::video::Resolution;
use sketch_video::{Orchestrator, Result, SketchError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeMedia {
    pub duration: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub audio_duration: Option<f64>,
    /// Frames encoded into this file
    pub frames: Option<usize>,
    /// FNV-1a hash over the encoded frame files, in order
    pub checksum: Option<u64>,
    pub audio_fit: Option<AudioFit>,
}

impl FakeMedia {
    pub fn source(duration: f64, fps: f64, width: u32, height: u32, audio_duration: Option<f64>) -> Self {
        Self {
            duration,
            fps,
            width,
            height,
            audio_duration,
            frames: None,
            checksum: None,
            audio_fit: None,
        }
    }

    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, serde_json::to_vec_pretty(self).unwrap()).unwrap();
    }

    pub fn read(path: &Path) -> Self {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }
}

fn load(path: &Path) -> Result<FakeMedia> {
    let bytes = std::fs::read(path).map_err(|e| SketchError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| SketchError::codec(format!("{}: {}", path.display(), e)))
}

fn store(path: &Path, media: &FakeMedia) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(media).map_err(|e| SketchError::codec(e.to_string()))?;
    std::fs::write(path, bytes).map_err(|e| SketchError::io(path, e))
}

fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(hash, |h, b| (h ^ *b as u64).wrapping_mul(0x0000_0100_0000_01b3))
}

/// Colour of source frame `index`; neighbouring frames differ
pub fn source_colour(index: usize) -> Rgb<u8> {
    Rgb([(index * 7 % 256) as u8, (index * 13 % 256) as u8, (255 - index % 256) as u8])
}

#[derive(Default)]
pub struct ScriptedBackend {
    /// Frames the decoder "loses" at the end of every sequence
    pub drop_tail_frames: usize,
    /// Seconds added to every encoded duration
    pub encode_drift: f64,
    pub decode_calls: AtomicUsize,
    pub encode_calls: AtomicUsize,
    pub mux_fits: Mutex<Vec<AudioFit>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decodes(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    pub fn encodes(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }
}

impl MediaBackend for ScriptedBackend {
    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let media = load(path)?;
        Ok(MediaInfo {
            path: path.to_path_buf(),
            duration_seconds: media.duration.max(media.audio_duration.unwrap_or(0.0)),
            video: Some(VideoStreamInfo {
                codec: "fake".to_string(),
                frame_rate: media.fps,
                resolution: Resolution::new(media.width, media.height),
                duration_seconds: Some(media.duration),
            }),
            audio: media.audio_duration.map(|duration| AudioStreamInfo {
                codec: "fake-audio".to_string(),
                duration_seconds: Some(duration),
                sample_rate: Some(48_000),
                channels: Some(2),
            }),
        })
    }

    fn decode_frames(&self, request: &DecodeRequest<'_>) -> Result<usize> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        let media = load(request.source)?;
        let size = request
            .scale_to
            .unwrap_or_else(|| Resolution::new(media.width, media.height));

        let count = request.plan.frame_count.saturating_sub(self.drop_tail_frames);
        for index in 0..count {
            let colour = source_colour(request.plan.source_index(index));
            let frame = RgbImage::from_pixel(size.width, size.height, colour);
            let path = request.naming.path(index);
            frame
                .save(&path)
                .map_err(|e| SketchError::codec(format!("{}: {}", path.display(), e)))?;
        }
        Ok(count)
    }

    fn encode_frames(&self, request: &EncodeRequest<'_>) -> Result<()> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        let first = Resolution::of_image(&request.frames[0])?;

        let mut checksum = 0xcbf2_9ce4_8422_2325;
        for frame in request.frames {
            let bytes = std::fs::read(frame).map_err(|e| SketchError::io(frame, e))?;
            checksum = fnv1a(checksum, &bytes);
        }

        let media = FakeMedia {
            duration: request.schedule.total_duration() + self.encode_drift,
            fps: request.schedule.effective_frame_rate(),
            width: first.width,
            height: first.height,
            audio_duration: None,
            frames: Some(request.frames.len()),
            checksum: Some(checksum),
            audio_fit: None,
        };
        store(request.output, &media)
    }

    fn mux_audio(&self, request: &MuxRequest<'_>) -> Result<()> {
        self.mux_fits.lock().unwrap().push(request.fit);
        let mut media = load(request.video)?;
        media.audio_duration = Some(request.duration_seconds);
        media.audio_fit = Some(request.fit);
        store(request.output, &media)
    }
}

/// A small, fast configuration staging under `root`
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.staging.root = Some(root.join("staging"));
    config.filtering.workers = 2;
    config.filtering.progress_interval = 1;
    config
}

pub fn orchestrator(config: Config, backend: &Arc<ScriptedBackend>) -> Orchestrator {
    Orchestrator::with_backend(config, Arc::clone(backend) as Arc<dyn MediaBackend>)
}

/// Entries left in the staging root (missing root counts as empty)
pub fn staging_leftovers(config: &Config) -> Vec<PathBuf> {
    match std::fs::read_dir(config.staging.resolved_root()) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}

/// Every `frame_*` file below `root`, at any depth
pub fn frame_files_under(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if entry.file_name().to_string_lossy().starts_with("frame_") {
                found.push(path);
            }
        }
    }
    found
}
