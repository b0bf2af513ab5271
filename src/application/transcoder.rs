use super::invoker::{build_request, EncodeInvoker};
use crate::config::TranscoderConfig;
use crate::domain::error::{EncoderError, TranscodeError};
use crate::domain::hls::MasterPlaylist;
use crate::domain::jobs::{Job, JobResult, JobState, Upload};
use crate::domain::ladder::rendition_ladder;
use crate::domain::layout::{ensure_directories, JobPaths};
use crate::ports::encoder::EncodingEngine;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Runs transcoding jobs from a stored upload to a finished HLS package.
///
/// A job is accepted with [`TranscodeService::begin`], which reserves its
/// base name, and driven with [`TranscodeService::start`] on a background
/// task. Once started, a job always reaches a terminal state, whether or not
/// anyone is still waiting on its [`JobReceipt`].
pub struct TranscodeService<E> {
    config: TranscoderConfig,
    invoker: EncodeInvoker<E>,
    in_flight: InFlight,
}

impl<E> TranscodeService<E>
where
    E: EncodingEngine + 'static,
{
    pub fn new(config: TranscoderConfig, engine: Arc<E>) -> Self {
        Self {
            config,
            invoker: EncodeInvoker::new(engine),
            in_flight: InFlight::default(),
        }
    }

    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }

    /// Validates the upload name and reserves its base name.
    ///
    /// Touches nothing on disk, so callers can reject a duplicate before
    /// storing the upload. The reservation lasts until the returned ticket is
    /// dropped or its job ends.
    pub fn begin(&self, upload: Option<Upload>) -> Result<JobTicket, TranscodeError> {
        let upload = upload.ok_or(TranscodeError::MissingInput)?;
        let job = Job::from_upload(&upload)?;
        let claim = self.in_flight.claim(&job.base_name)?;
        let paths = JobPaths::resolve(&self.config, &job);

        Ok(JobTicket { job, paths, claim })
    }

    /// Runs the job on its own task and returns a receipt for its result.
    ///
    /// On success the raw upload is deleted. On failure it is kept. Must be
    /// called inside a Tokio runtime.
    pub fn start(&self, ticket: JobTicket) -> JobReceipt {
        let (tx, rx) = oneshot::channel();
        let invoker = self.invoker.clone();

        tokio::spawn(async move {
            let JobTicket {
                mut job,
                paths,
                claim,
            } = ticket;
            info!(base_name = %job.base_name, source = %paths.raw_path.display(), "Starting job");

            let result = match execute(&invoker, &mut job, &paths).await {
                Ok(()) => {
                    job.advance(JobState::Succeeded);
                    remove_source(&paths.raw_path).await;
                    JobResult::Ok {
                        master_playlist_path: paths.master_playlist_path,
                    }
                }
                Err(e) => {
                    job.advance(JobState::Failed);
                    error!(base_name = %job.base_name, "Transcoding failed: {}", e);
                    e.into()
                }
            };

            drop(claim);
            // The receipt may be gone if the caller stopped waiting.
            let _ = tx.send(result);
        });

        JobReceipt { rx }
    }

    /// Runs one job to its terminal state and waits for its result.
    pub async fn run(&self, upload: Option<Upload>) -> JobResult {
        match self.begin(upload) {
            Ok(ticket) => self.start(ticket).result().await,
            Err(e) => {
                error!("Transcoding failed: {}", e);
                e.into()
            }
        }
    }
}

/// An accepted job that has not been started yet. Holds the reservation of
/// its base name.
pub struct JobTicket {
    job: Job,
    paths: JobPaths,
    claim: InFlightClaim,
}

impl JobTicket {
    pub fn base_name(&self) -> &str {
        &self.job.base_name
    }

    /// Where the upload must be stored before the job is started.
    pub fn raw_path(&self) -> &Path {
        &self.paths.raw_path
    }
}

/// The pending result of a started job.
pub struct JobReceipt {
    rx: oneshot::Receiver<JobResult>,
}

impl JobReceipt {
    pub async fn result(self) -> JobResult {
        match self.rx.await {
            Ok(result) => result,
            // Sender dropped without a send: the job task panicked.
            Err(_) => TranscodeError::Encoder(EncoderError::Aborted).into(),
        }
    }
}

async fn execute<E>(
    invoker: &EncodeInvoker<E>,
    job: &mut Job,
    paths: &JobPaths,
) -> Result<(), TranscodeError>
where
    E: EncodingEngine + 'static,
{
    match tokio::fs::try_exists(&paths.raw_path).await {
        Ok(true) => {}
        Ok(false) => return Err(TranscodeError::SourceNotFound(paths.raw_path.clone())),
        Err(e) => return Err(TranscodeError::filesystem(&paths.raw_path, e)),
    }

    let ladder = rendition_ladder();
    let names: Vec<&str> = ladder.iter().map(|r| r.name).collect();
    ensure_directories(&paths.output_dir, &names).await?;

    let subtitle = is_file(&paths.subtitle_path)
        .await
        .then_some(paths.subtitle_path.as_path());

    job.advance(JobState::Encoding);
    let handle = invoker.issue(build_request(paths, ladder, subtitle));
    handle.outcome().await?;

    if subtitle.is_some() {
        publish_subtitle(paths).await?;
    }

    let master = MasterPlaylist::from_ladder(
        ladder,
        subtitle.map(|_| job.base_name.as_str()),
    );
    master.write_to(&paths.master_playlist_path).await?;
    info!(path = %paths.master_playlist_path.display(), "Master playlist written");

    Ok(())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Copies the WebVTT file next to the master playlist so its URI resolves.
async fn publish_subtitle(paths: &JobPaths) -> Result<(), TranscodeError> {
    let target = &paths.published_subtitle_path;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TranscodeError::filesystem(parent, e))?;
    }
    tokio::fs::copy(&paths.subtitle_path, target)
        .await
        .map_err(|e| TranscodeError::filesystem(target, e))?;
    Ok(())
}

/// Best effort. A failure here never changes the job's outcome.
async fn remove_source(raw_path: &Path) {
    match tokio::fs::remove_file(raw_path).await {
        Ok(()) => info!(path = %raw_path.display(), "Raw file deleted"),
        Err(e) => warn!(path = %raw_path.display(), "Error deleting raw file: {}", e),
    }
}

/// Base names of jobs currently running.
#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<String>>>);

impl InFlight {
    fn claim(&self, base_name: &str) -> Result<InFlightClaim, TranscodeError> {
        let mut names = self.0.lock().unwrap_or_else(|p| p.into_inner());
        if !names.insert(base_name.to_string()) {
            return Err(TranscodeError::DuplicateJob(base_name.to_string()));
        }
        Ok(InFlightClaim {
            names: self.0.clone(),
            base_name: base_name.to_string(),
        })
    }
}

struct InFlightClaim {
    names: Arc<Mutex<HashSet<String>>>,
    base_name: String,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        let mut names = self.names.lock().unwrap_or_else(|p| p.into_inner());
        names.remove(&self.base_name);
    }
}
