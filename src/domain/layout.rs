//! On-disk namespace of a job.
//!
//! ```text
//! <transcoded>/<base>/master.m3u8
//! <transcoded>/<base>/<rendition>/index.m3u8
//! <transcoded>/<base>/<rendition>/segment_000.ts, segment_001.ts, ...
//! <transcoded>/<base>/subtitles/<base>.vtt   (only with a subtitle track)
//! ```

use super::error::TranscodeError;
use super::jobs::Job;
use crate::config::TranscoderConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MASTER_PLAYLIST: &str = "master.m3u8";
pub const RENDITION_PLAYLIST: &str = "index.m3u8";
/// printf-style pattern expanded by the encoder, zero-indexed.
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";
pub const SUBTITLES_DIR: &str = "subtitles";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub raw_path: PathBuf,
    pub output_dir: PathBuf,
    pub master_playlist_path: PathBuf,
    /// Conventional lookup location of the job's WebVTT file.
    pub subtitle_path: PathBuf,
    /// Copy of the WebVTT file referenced by the master playlist.
    pub published_subtitle_path: PathBuf,
}

impl JobPaths {
    /// Pure path computation, touches nothing on disk.
    pub fn resolve(config: &TranscoderConfig, job: &Job) -> Self {
        let output_dir = config.transcoded_dir.join(&job.base_name);
        let subtitle_file = format!("{}.vtt", job.base_name);

        Self {
            raw_path: config.raw_dir.join(&job.file_name),
            master_playlist_path: output_dir.join(MASTER_PLAYLIST),
            subtitle_path: config.subtitles_dir.join(&subtitle_file),
            published_subtitle_path: output_dir.join(SUBTITLES_DIR).join(&subtitle_file),
            output_dir,
        }
    }

    pub fn rendition_dir(&self, rendition: &str) -> PathBuf {
        self.output_dir.join(rendition)
    }

    pub fn rendition_playlist(&self, rendition: &str) -> PathBuf {
        self.rendition_dir(rendition).join(RENDITION_PLAYLIST)
    }

    pub fn segment_pattern(&self, rendition: &str) -> PathBuf {
        self.rendition_dir(rendition).join(SEGMENT_PATTERN)
    }
}

/// Creates `output_dir` and one subdirectory per rendition.
///
/// Existing directories are left as they are, so calling this twice is fine.
/// Never removes anything.
pub async fn ensure_directories(
    output_dir: &Path,
    rendition_names: &[&str],
) -> Result<(), TranscodeError> {
    create_dir(output_dir).await?;
    for name in rendition_names {
        create_dir(&output_dir.join(name)).await?;
    }
    Ok(())
}

async fn create_dir(path: &Path) -> Result<(), TranscodeError> {
    debug!(path = %path.display(), "Ensuring directory");
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| TranscodeError::filesystem(path, e))
}
