use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, info, warn};

use super::{parse_probe_output, DecodeRequest, EncodeRequest, MediaBackend, MediaInfo, MuxRequest};
use crate::audio::AudioFit;
use crate::config::{FrameFormat, ToolsConfig};
use crate::error::{Result, SketchError};

/// [`MediaBackend`] that shells out to the `ffmpeg` and `ffprobe` executables
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

impl FfmpegBackend {
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }

    /// Check that `ffmpeg -version` runs
    pub fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn run(&self, mut cmd: Command) -> Result<Output> {
        let tool = cmd.get_program().to_string_lossy().into_owned();
        debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(|e| SketchError::Tool {
            tool: tool.clone(),
            status: "not started".to_string(),
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(SketchError::Tool {
                tool,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    fn probe_command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path);
        cmd
    }

    fn decode_command(&self, request: &DecodeRequest<'_>) -> Command {
        let mut filters = format!("fps={}:round=near", request.plan.target_frame_rate);
        if let Some(size) = request.scale_to {
            filters.push_str(&format!(",scale={}:{}", size.width, size.height));
        }

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "error", "-i"])
            .arg(request.source)
            .args(["-an", "-vf", &filters])
            .args(["-start_number", "0"])
            .args(["-frames:v", &request.plan.frame_count.to_string()]);

        if request.format == FrameFormat::Jpeg {
            cmd.args(["-q:v", &jpeg_qscale(request.jpeg_quality).to_string()]);
        }

        cmd.arg("-y").arg(request.naming.pattern());
        cmd
    }

    fn encode_command(&self, request: &EncodeRequest<'_>, list_path: &Path) -> Command {
        let encoding = request.encoding;
        let schedule = request.schedule;

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "error", "-f", "concat", "-safe", "0", "-i"])
            .arg(list_path);

        if request.pad_to_even {
            cmd.args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"]);
        }

        cmd.args(["-c:v", &encoding.codec])
            .args(["-r", &format!("{:.6}", schedule.effective_frame_rate())])
            .args(["-pix_fmt", &encoding.pixel_format])
            .args(["-crf", &encoding.crf().to_string()])
            .args(["-t", &format!("{:.6}", schedule.total_duration())])
            .arg("-an")
            .arg("-y")
            .arg(request.output);
        cmd
    }

    fn mux_command(&self, request: &MuxRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "error", "-i"])
            .arg(request.video)
            .arg("-i")
            .arg(request.audio_source)
            .args(["-map", "0:v:0", "-map", "1:a:0"])
            .args(["-c:v", "copy"])
            .args(["-c:a", &request.audio.codec])
            .args(["-b:a", &format!("{}k", request.audio.bitrate_kbps)]);

        if let AudioFit::Pad { .. } = request.fit {
            cmd.args(["-af", &format!("apad=whole_dur={:.6}", request.duration_seconds)]);
        }

        cmd.args(["-t", &format!("{:.6}", request.duration_seconds)])
            .arg("-y")
            .arg(request.output);
        cmd
    }
}

/// Map a 1-100 quality onto ffmpeg's 2-31 JPEG qscale (lower is better)
fn jpeg_qscale(quality: u8) -> u8 {
    let quality = quality.clamp(1, 100) as u32;
    (2 + (100 - quality) * 29 / 99) as u8
}

/// Concat-demuxer list giving every frame its own display duration
fn write_concat_list(frames: &[PathBuf], interval: f64, list_path: &Path) -> Result<()> {
    let file = File::create(list_path).map_err(|e| SketchError::io(list_path, e))?;
    let mut writer = BufWriter::new(file);

    let absolute = |p: &PathBuf| p.canonicalize().unwrap_or_else(|_| p.clone());
    let write_err = |e| SketchError::io(list_path, e);

    for frame in frames {
        writeln!(writer, "file '{}'", escape_concat_path(&absolute(frame))).map_err(write_err)?;
        writeln!(writer, "duration {:.6}", interval).map_err(write_err)?;
    }
    // the demuxer ignores the last duration unless the final file is repeated
    if let Some(last) = frames.last() {
        writeln!(writer, "file '{}'", escape_concat_path(&absolute(last))).map_err(write_err)?;
    }
    writer.flush().map_err(write_err)?;
    Ok(())
}

/// Concat list location inside the request's scratch directory
fn concat_list_path(request: &EncodeRequest<'_>) -> PathBuf {
    let stem = request
        .output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    request.scratch_dir.join(format!("{}.concat.txt", stem))
}

fn escape_concat_path(path: &Path) -> String {
    path.display().to_string().replace('\'', r"'\''")
}

impl MediaBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        if !path.exists() {
            return Err(SketchError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }
        let output = self.run(self.probe_command(path))?;
        let json = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(path, &json)
    }

    fn decode_frames(&self, request: &DecodeRequest<'_>) -> Result<usize> {
        info!(
            "Decoding {} frames at {:.3} fps from {}",
            request.plan.frame_count,
            request.plan.target_frame_rate,
            request.source.display()
        );
        self.run(self.decode_command(request))?;
        Ok(request.naming.count_contiguous(request.plan.frame_count))
    }

    fn encode_frames(&self, request: &EncodeRequest<'_>) -> Result<()> {
        let list_path = concat_list_path(request);
        write_concat_list(request.frames, request.schedule.frame_interval, &list_path)?;

        let result = self.run(self.encode_command(request, &list_path));
        if let Err(e) = std::fs::remove_file(&list_path) {
            warn!("Could not remove concat list {}: {}", list_path.display(), e);
        }
        result.map(|_| ())
    }

    fn mux_audio(&self, request: &MuxRequest<'_>) -> Result<()> {
        self.run(self.mux_command(request)).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AudioConfig, EncodingConfig};
    use crate::video::{FrameNaming, PresentationSchedule, Resolution, SamplingPlan};
    use tempfile::TempDir;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn follows(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    }

    #[test]
    fn test_decode_command_samples_and_scales() {
        let backend = FfmpegBackend::default();
        let plan = SamplingPlan::new(10.0, 30.0, 24.0);
        let naming = FrameNaming::new("/tmp/job/frames", "jpg");
        let request = DecodeRequest {
            source: Path::new("in.mp4"),
            plan: &plan,
            naming: &naming,
            scale_to: Some(Resolution::new(240, 134)),
            format: FrameFormat::Jpeg,
            jpeg_quality: 85,
        };

        let args = args(&backend.decode_command(&request));
        assert_eq!(follows(&args, "-vf").unwrap(), "fps=24:round=near,scale=240:134");
        assert_eq!(follows(&args, "-frames:v").unwrap(), "240");
        assert_eq!(follows(&args, "-start_number").unwrap(), "0");
        assert_eq!(follows(&args, "-q:v").unwrap(), "6");
        assert_eq!(args.last().unwrap(), "/tmp/job/frames/frame_%06d.jpg");
    }

    #[test]
    fn test_encode_command_uses_effective_rate() {
        let backend = FfmpegBackend::default();
        let schedule = PresentationSchedule::reconcile(20, 3.0, 10.0);
        let encoding = EncodingConfig::default();
        let frames = vec![PathBuf::from("a.png")];
        let request = EncodeRequest {
            frames: &frames,
            schedule: &schedule,
            output: Path::new("out.mp4"),
            encoding: &encoding,
            pad_to_even: true,
            scratch_dir: Path::new("/tmp/job"),
        };

        let args = args(&backend.encode_command(&request, Path::new("list.txt")));
        assert_eq!(follows(&args, "-r").unwrap(), "2.000000");
        assert_eq!(follows(&args, "-t").unwrap(), "10.000000");
        assert!(follows(&args, "-vf").unwrap().starts_with("pad="));
        assert!(args.contains(&"-an".to_string()));
    }

    #[test]
    fn test_mux_command_never_reencodes_video() {
        let backend = FfmpegBackend::default();
        let audio = AudioConfig::default();
        let request = MuxRequest {
            video: Path::new("video.mp4"),
            audio_source: Path::new("source.mp4"),
            output: Path::new("out.mp4"),
            duration_seconds: 10.0,
            fit: AudioFit::Pad { missing_seconds: 2.0 },
            audio: &audio,
        };

        let args = args(&backend.mux_command(&request));
        assert_eq!(follows(&args, "-c:v").unwrap(), "copy");
        assert_eq!(follows(&args, "-b:a").unwrap(), "192k");
        assert_eq!(follows(&args, "-af").unwrap(), "apad=whole_dur=10.000000");
        assert_eq!(follows(&args, "-t").unwrap(), "10.000000");

        let trimmed = MuxRequest {
            fit: AudioFit::Trim { excess_seconds: 3.0 },
            ..request
        };
        assert!(follows(&args_of(&backend, &trimmed), "-af").is_none());
    }

    fn args_of(backend: &FfmpegBackend, request: &MuxRequest<'_>) -> Vec<String> {
        args(&backend.mux_command(request))
    }

    #[test]
    fn test_concat_list_repeats_last_frame() {
        let dir = TempDir::new().unwrap();
        let frames = vec![dir.path().join("frame_000000.png"), dir.path().join("frame_000001.png")];
        let list = dir.path().join("list.txt");
        write_concat_list(&frames, 0.5, &list).unwrap();

        let content = std::fs::read_to_string(&list).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "duration 0.500000");
        assert!(lines[4].ends_with("frame_000001.png'"));
    }

    /// A backend whose "ffmpeg" succeeds without writing anything
    #[cfg(unix)]
    fn silent_backend() -> FfmpegBackend {
        FfmpegBackend::from_config(&ToolsConfig {
            ffmpeg: PathBuf::from("true"),
            ffprobe: PathBuf::from("true"),
        })
    }

    #[cfg(unix)]
    #[test]
    fn test_decode_counts_only_frames_from_index_zero() {
        let dir = TempDir::new().unwrap();
        let naming = FrameNaming::new(dir.path(), "png");
        for i in 5..9 {
            std::fs::write(naming.path(i), b"left over").unwrap();
        }
        let plan = SamplingPlan::new(3.0, 30.0, 3.0);

        let written = silent_backend()
            .decode_frames(&DecodeRequest {
                source: Path::new("in.mp4"),
                plan: &plan,
                naming: &naming,
                scale_to: None,
                format: FrameFormat::Png,
                jpeg_quality: 85,
            })
            .unwrap();
        assert_eq!(written, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_concat_list_lives_in_scratch_dir() {
        let frames_dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let frames = vec![frames_dir.path().join("frame_000000.png")];
        std::fs::write(&frames[0], b"px").unwrap();

        let schedule = PresentationSchedule::reconcile(1, 1.0, 1.0);
        let encoding = EncodingConfig::default();
        let output = out_dir.path().join("movie.mp4");
        let request = EncodeRequest {
            frames: &frames,
            schedule: &schedule,
            output: &output,
            encoding: &encoding,
            pad_to_even: false,
            scratch_dir: scratch.path(),
        };

        assert_eq!(concat_list_path(&request), scratch.path().join("movie.concat.txt"));
        silent_backend().encode_frames(&request).unwrap();

        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_jpeg_qscale_range() {
        assert_eq!(jpeg_qscale(100), 2);
        assert_eq!(jpeg_qscale(1), 31);
    }

    #[test]
    fn test_missing_tool_is_codec_error() {
        let backend = FfmpegBackend::from_config(&ToolsConfig {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
            ffprobe: PathBuf::from("/nonexistent/ffprobe"),
        });
        assert!(!backend.is_available());
        let err = backend.run(Command::new("/nonexistent/ffmpeg")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Codec);
    }
}
