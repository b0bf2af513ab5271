//! Configuration for the transcoding service.

use std::env;
use std::path::{Path, PathBuf};

/// Directory roots and engine settings shared by every job.
#[derive(Clone, Debug)]
pub struct TranscoderConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Where uploads are stored before transcoding
    pub raw_dir: PathBuf,
    /// Root of the per-job HLS output trees
    pub transcoded_dir: PathBuf,
    /// Where `<base>.vtt` subtitle files are looked up
    pub subtitles_dir: PathBuf,
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,
}

impl TranscoderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            raw_dir: env_path("RAW_DIR", "videos/raw"),
            transcoded_dir: env_path("TRANSCODED_DIR", "videos/transcoded"),
            subtitles_dir: env_path("SUBTITLES_DIR", "videos/subtitles"),
            ffmpeg_path: env_path("FFMPEG_PATH", "ffmpeg"),
        }
    }

    /// Places `raw/`, `transcoded/` and `subtitles/` under a single root.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            addr: String::from("127.0.0.1"),
            port: String::from("3000"),
            raw_dir: root.join("raw"),
            transcoded_dir: root.join("transcoded"),
            subtitles_dir: root.join("subtitles"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var_os(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
