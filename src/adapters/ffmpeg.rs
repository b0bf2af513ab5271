//! ffmpeg subprocess implementation of [`EncodingEngine`].

use crate::config::TranscoderConfig;
use crate::domain::error::EncoderError;
use crate::ports::encoder::{EncodeRequest, EncodingEngine, OutputDescriptor};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

/// Lines of ffmpeg stderr kept in an error.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    program: PathBuf,
}

impl FfmpegEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &TranscoderConfig) -> Self {
        Self::new(&config.ffmpeg_path)
    }
}

#[async_trait]
impl EncodingEngine for FfmpegEngine {
    async fn encode(&self, request: &EncodeRequest) -> Result<(), EncoderError> {
        if request.outputs.is_empty() {
            return Err(EncoderError::InvalidRequest("no outputs".to_string()));
        }

        info!(
            program = %self.program.display(),
            input = %request.input.display(),
            outputs = request.outputs.len(),
            "Starting ffmpeg"
        );

        let output = Command::new(&self.program)
            .args(build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(EncoderError::Spawn)?;

        if !output.status.success() {
            let stderr = stderr_tail(&String::from_utf8_lossy(&output.stderr));
            error!(status = %output.status, "ffmpeg failed: {}", stderr);
            return Err(EncoderError::Exited {
                status: output.status,
                stderr,
            });
        }

        info!(input = %request.input.display(), "ffmpeg finished");
        Ok(())
    }
}

/// Command line for `request`. Output options precede the output they apply
/// to, so the shared options are repeated for every rendition.
///
/// Only errors reach stderr, which keeps the captured output small on long
/// encodes.
pub fn build_args(request: &EncodeRequest) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostats".into(),
        "-nostdin".into(),
        "-y".into(),
        "-i".into(),
        request.input.to_string_lossy().into_owned(),
    ];

    let overlay = request
        .global
        .subtitle_overlay
        .as_ref()
        .map(|path| format!("subtitles={}", escape_filter_value(&path.to_string_lossy())));

    for output in &request.outputs {
        args.push("-vf".into());
        args.push(video_filter(overlay.as_deref(), output));
        args.extend([
            "-b:v".into(),
            output.video_bitrate.clone(),
            "-c:v".into(),
            output.video_codec.clone(),
            "-c:a".into(),
            output.audio_codec.clone(),
            "-strict".into(),
            "-2".into(),
            "-preset".into(),
            request.global.preset.clone(),
            "-f".into(),
            "hls".into(),
            "-start_number".into(),
            request.global.start_number.to_string(),
            "-hls_list_size".into(),
            request.global.list_size.to_string(),
            "-hls_time".into(),
            request.global.segment_duration.to_string(),
            "-hls_segment_filename".into(),
            output.segment_pattern.to_string_lossy().into_owned(),
            output.playlist_path.to_string_lossy().into_owned(),
        ]);
    }

    args
}

fn video_filter(overlay: Option<&str>, output: &OutputDescriptor) -> String {
    let scale = format!("scale={}:{}", output.width, output.height);
    match overlay {
        Some(overlay) => format!("{},{}", overlay, scale),
        None => scale,
    }
}

/// Escapes a filter option value, then the filtergraph special characters.
fn escape_filter_value(value: &str) -> String {
    let escape = |input: &str, specials: &[char]| {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            if specials.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    };
    let option_level = escape(value, &['\\', '\'', ':']);
    escape(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::encoder::GlobalOptions;

    fn request(subtitle: Option<&str>) -> EncodeRequest {
        EncodeRequest {
            input: PathBuf::from("/raw/movie.mp4"),
            global: GlobalOptions {
                preset: "veryfast".into(),
                start_number: 0,
                list_size: 0,
                segment_duration: 10,
                subtitle_overlay: subtitle.map(PathBuf::from),
            },
            outputs: vec![
                OutputDescriptor {
                    rendition: "720p".into(),
                    width: 1280,
                    height: 720,
                    video_bitrate: "2500k".into(),
                    video_codec: "libx264".into(),
                    audio_codec: "aac".into(),
                    segment_pattern: PathBuf::from("/out/movie/720p/segment_%03d.ts"),
                    playlist_path: PathBuf::from("/out/movie/720p/index.m3u8"),
                },
                OutputDescriptor {
                    rendition: "360p".into(),
                    width: 640,
                    height: 360,
                    video_bitrate: "600k".into(),
                    video_codec: "libx264".into(),
                    audio_codec: "aac".into(),
                    segment_pattern: PathBuf::from("/out/movie/360p/segment_%03d.ts"),
                    playlist_path: PathBuf::from("/out/movie/360p/index.m3u8"),
                },
            ],
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
        args.windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].as_str())
            .collect()
    }

    #[test]
    fn test_build_args_one_output_per_rendition() {
        let args = build_args(&request(None));

        assert_eq!(
            &args[..8],
            &[
                "-hide_banner",
                "-loglevel",
                "error",
                "-nostats",
                "-nostdin",
                "-y",
                "-i",
                "/raw/movie.mp4"
            ]
        );
        assert_eq!(value_after(&args, "-vf"), vec!["scale=1280:720", "scale=640:360"]);
        assert_eq!(value_after(&args, "-b:v"), vec!["2500k", "600k"]);
        assert_eq!(value_after(&args, "-hls_time"), vec!["10", "10"]);
        assert_eq!(value_after(&args, "-start_number"), vec!["0", "0"]);
        assert_eq!(value_after(&args, "-hls_list_size"), vec!["0", "0"]);
        assert_eq!(
            value_after(&args, "-hls_segment_filename"),
            vec!["/out/movie/720p/segment_%03d.ts", "/out/movie/360p/segment_%03d.ts"]
        );
        assert_eq!(args.last().unwrap(), "/out/movie/360p/index.m3u8");
        assert!(args.contains(&"/out/movie/720p/index.m3u8".to_string()));
    }

    #[test]
    fn test_build_args_quiets_progress_output() {
        let args = build_args(&request(None));
        assert_eq!(value_after(&args, "-loglevel"), vec!["error"]);
        assert_eq!(args.iter().filter(|a| *a == "-nostats").count(), 1);
        assert!(!args.contains(&"-stats".to_string()));
    }

    #[test]
    fn test_build_args_with_subtitle_overlay() {
        let args = build_args(&request(Some("/subs/movie.vtt")));
        assert_eq!(
            value_after(&args, "-vf"),
            vec![
                "subtitles=/subs/movie.vtt,scale=1280:720",
                "subtitles=/subs/movie.vtt,scale=640:360",
            ]
        );
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("/subs/movie.vtt"), "/subs/movie.vtt");
        assert_eq!(escape_filter_value("C:/subs/a.vtt"), "C\\\\:/subs/a.vtt");
        assert_eq!(escape_filter_value("a,b.vtt"), "a\\,b.vtt");
    }

    #[test]
    fn test_stderr_tail() {
        let stderr: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&stderr);
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let engine = FfmpegEngine::new("nonexistent_ffmpeg_xyz_12345");
        let result = engine.encode(&request(None)).await;
        assert!(matches!(result, Err(EncoderError::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_program_is_exit_error() {
        let engine = FfmpegEngine::new("false");
        let result = engine.encode(&request(None)).await;
        assert!(matches!(result, Err(EncoderError::Exited { .. })));
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let engine = FfmpegEngine::new("ffmpeg");
        let mut empty = request(None);
        empty.outputs.clear();
        let result = engine.encode(&empty).await;
        assert!(matches!(result, Err(EncoderError::InvalidRequest(_))));
    }
}
