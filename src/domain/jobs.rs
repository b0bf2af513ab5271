use super::error::TranscodeError;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// A stored upload, named by the client's original filename.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
}

impl Upload {
    pub fn new(original_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Encoding,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn can_advance_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Encoding)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Encoding, JobState::Succeeded)
                | (JobState::Encoding, JobState::Failed)
        )
    }
}

/// One transcoding job, keyed by the upload's base name.
#[derive(Debug)]
pub struct Job {
    /// Original filename, also the raw file's name on disk.
    pub file_name: String,
    /// Filename without extension. Names the output directory.
    pub base_name: String,
    state: JobState,
}

impl Job {
    pub fn from_upload(upload: &Upload) -> Result<Self, TranscodeError> {
        let name = upload.original_name.as_str();
        if !is_plain_file_name(Path::new(name)) {
            return Err(TranscodeError::InvalidInput(name.to_string()));
        }

        let base_name = Path::new(name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| TranscodeError::InvalidInput(name.to_string()))?
            .to_string();

        Ok(Self {
            file_name: name.to_string(),
            base_name,
            state: JobState::Pending,
        })
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn advance(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal job transition {:?} -> {:?}",
            self.state,
            next
        );
        info!(base_name = %self.base_name, from = ?self.state, to = ?next, "Job state changed");
        self.state = next;
    }
}

/// A single normal path component: no separators, no `..`, no root.
fn is_plain_file_name(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Response class the HTTP layer should use for a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusHint {
    ClientError,
    Conflict,
    ServerError,
}

impl StatusHint {
    pub fn code(self) -> u16 {
        match self {
            StatusHint::ClientError => 400,
            StatusHint::Conflict => 409,
            StatusHint::ServerError => 500,
        }
    }
}

/// The one value a job yields to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum JobResult {
    #[serde(rename = "OK")]
    Ok {
        #[serde(rename = "masterPlaylistPath")]
        master_playlist_path: PathBuf,
    },
    #[serde(rename = "ERROR")]
    Error {
        message: String,
        #[serde(rename = "httpStatusHint")]
        status_hint: StatusHint,
    },
}

impl JobResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, JobResult::Ok { .. })
    }
}

impl From<TranscodeError> for JobResult {
    fn from(err: TranscodeError) -> Self {
        let status_hint = match &err {
            TranscodeError::MissingInput
            | TranscodeError::InvalidInput(_)
            | TranscodeError::SourceNotFound(_) => StatusHint::ClientError,
            TranscodeError::DuplicateJob(_) => StatusHint::Conflict,
            TranscodeError::Filesystem { .. } | TranscodeError::Encoder(_) => {
                StatusHint::ServerError
            }
        };
        JobResult::Error {
            message: err.to_string(),
            status_hint,
        }
    }
}
