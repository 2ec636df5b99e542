use std::path::Path;

use serde::Deserialize;

use super::{AudioStreamInfo, MediaInfo, VideoStreamInfo};
use crate::error::{Result, SketchError};
use crate::video::Resolution;

/// Subset of `ffprobe -print_format json -show_format -show_streams`
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse an ffprobe rate such as `30000/1001`; `0/0` and zero rates give `None`
fn parse_rational(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

fn parse_seconds(value: &Option<String>) -> Option<f64> {
    value
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Build a [`MediaInfo`] from ffprobe's JSON output
pub fn parse_probe_output(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| SketchError::codec(format!("{}: unreadable ffprobe output: {}", path.display(), e)))?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .map(|s| {
            let frame_rate = s
                .avg_frame_rate
                .as_deref()
                .and_then(parse_rational)
                .or_else(|| s.r_frame_rate.as_deref().and_then(parse_rational))
                .unwrap_or(0.0);
            VideoStreamInfo {
                codec: s.codec_name.clone().unwrap_or_default(),
                frame_rate,
                resolution: Resolution::new(s.width.unwrap_or(0), s.height.unwrap_or(0)),
                duration_seconds: parse_seconds(&s.duration),
            }
        });

    let audio = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioStreamInfo {
            codec: s.codec_name.clone().unwrap_or_default(),
            duration_seconds: parse_seconds(&s.duration),
            sample_rate: s.sample_rate.as_deref().and_then(|r| r.parse().ok()),
            channels: s.channels,
        });

    let stream_duration = output
        .streams
        .iter()
        .filter_map(|s| parse_seconds(&s.duration))
        .fold(None, |longest: Option<f64>, d| Some(longest.map_or(d, |l| l.max(d))));

    let duration_seconds = output
        .format
        .as_ref()
        .and_then(|f| parse_seconds(&f.duration))
        .or(stream_duration)
        .ok_or_else(|| SketchError::codec(format!("{}: duration unknown", path.display())))?;

    Ok(MediaInfo {
        path: path.to_path_buf(),
        duration_seconds,
        video,
        audio,
    })
}
