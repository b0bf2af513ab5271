//! Error types for a transcoding job.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Failures reported by an encoding engine.
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    /// The engine process could not be started.
    #[error("failed to spawn encoder: {0}")]
    Spawn(#[source] io::Error),

    /// The engine ran but exited abnormally.
    #[error("encoder exited with {status}: {stderr}")]
    Exited { status: ExitStatus, stderr: String },

    /// The engine stopped without reporting an outcome.
    #[error("encoder stopped without reporting an outcome")]
    Aborted,

    /// The engine refused the request before running.
    #[error("invalid encode request: {0}")]
    InvalidRequest(String),
}

/// Terminal failure of a transcoding job.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Upload a file to begin transcoding")]
    MissingInput,

    #[error("invalid upload name: {0}")]
    InvalidInput(String),

    #[error("source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("FFmpeg error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("a job for '{0}' is already in flight")]
    DuplicateJob(String),
}

impl TranscodeError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
