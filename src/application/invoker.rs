use crate::domain::error::EncoderError;
use crate::domain::ladder::RenditionSpec;
use crate::domain::layout::JobPaths;
use crate::ports::encoder::{EncodeRequest, EncodingEngine, GlobalOptions, OutputDescriptor};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

const PRESET: &str = "veryfast";
const START_NUMBER: u32 = 0;
/// Keep every segment in the rendition playlists.
const LIST_SIZE: u32 = 0;
const SEGMENT_SECONDS: u32 = 10;
const VIDEO_CODEC: &str = "libx264";
const AUDIO_CODEC: &str = "aac";

/// Builds the encode request for a job: one output per rendition, in ladder order.
pub fn build_request(
    paths: &JobPaths,
    ladder: &[RenditionSpec],
    subtitle: Option<&Path>,
) -> EncodeRequest {
    EncodeRequest {
        input: paths.raw_path.clone(),
        global: GlobalOptions {
            preset: PRESET.to_string(),
            start_number: START_NUMBER,
            list_size: LIST_SIZE,
            segment_duration: SEGMENT_SECONDS,
            subtitle_overlay: subtitle.map(Path::to_path_buf),
        },
        outputs: ladder
            .iter()
            .map(|rendition| OutputDescriptor {
                rendition: rendition.name.to_string(),
                width: rendition.width,
                height: rendition.height,
                video_bitrate: rendition.bitrate.to_string(),
                video_codec: VIDEO_CODEC.to_string(),
                audio_codec: AUDIO_CODEC.to_string(),
                segment_pattern: paths.segment_pattern(rendition.name),
                playlist_path: paths.rendition_playlist(rendition.name),
            })
            .collect(),
    }
}

/// Issues encode requests against an engine on a background task.
pub struct EncodeInvoker<E> {
    engine: Arc<E>,
}

// Not derived: only the Arc is cloned, `E` itself need not be Clone.
impl<E> Clone for EncodeInvoker<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<E> EncodeInvoker<E>
where
    E: EncodingEngine + 'static,
{
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// Starts the encode and returns immediately. Must be called inside a
    /// Tokio runtime.
    pub fn issue(&self, request: EncodeRequest) -> EncodeHandle {
        let (tx, rx) = oneshot::channel();
        let engine = self.engine.clone();

        tokio::spawn(async move {
            debug!(input = %request.input.display(), "Encode issued");
            let outcome = engine.encode(&request).await;
            // The receiver may be gone if the caller stopped waiting.
            let _ = tx.send(outcome);
        });

        EncodeHandle { rx }
    }
}

/// The pending outcome of one issued encode.
///
/// Resolves exactly once. Consuming it in [`EncodeHandle::outcome`] rules out
/// waiting twice.
pub struct EncodeHandle {
    rx: oneshot::Receiver<Result<(), EncoderError>>,
}

impl EncodeHandle {
    pub async fn outcome(self) -> Result<(), EncoderError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            // Sender dropped without a send: the engine task panicked.
            Err(_) => Err(EncoderError::Aborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscoderConfig;
    use crate::domain::jobs::{Job, Upload};
    use crate::domain::ladder::rendition_ladder;
    use crate::ports::encoder::MockEncodingEngine;
    use std::path::PathBuf;

    fn paths() -> JobPaths {
        let config = TranscoderConfig::rooted_at("/videos");
        let job = Job::from_upload(&Upload::new("movie.mp4")).unwrap();
        JobPaths::resolve(&config, &job)
    }

    #[test]
    fn test_build_request_follows_ladder() {
        let request = build_request(&paths(), rendition_ladder(), None);

        assert_eq!(request.input, PathBuf::from("/videos/raw/movie.mp4"));
        assert_eq!(request.global.preset, "veryfast");
        assert_eq!(request.global.start_number, 0);
        assert_eq!(request.global.list_size, 0);
        assert_eq!(request.global.segment_duration, 10);
        assert_eq!(request.global.subtitle_overlay, None);

        let names: Vec<&str> = request.outputs.iter().map(|o| o.rendition.as_str()).collect();
        assert_eq!(names, vec!["1080p", "720p", "480p", "360p"]);

        let hd = &request.outputs[0];
        assert_eq!((hd.width, hd.height), (1920, 1080));
        assert_eq!(hd.video_bitrate, "5000k");
        assert_eq!(
            hd.playlist_path,
            PathBuf::from("/videos/transcoded/movie/1080p/index.m3u8")
        );
        assert_eq!(
            hd.segment_pattern,
            PathBuf::from("/videos/transcoded/movie/1080p/segment_%03d.ts")
        );
    }

    #[test]
    fn test_build_request_with_subtitle() {
        let subtitle = PathBuf::from("/videos/subtitles/movie.vtt");
        let request = build_request(&paths(), rendition_ladder(), Some(&subtitle));
        assert_eq!(request.global.subtitle_overlay, Some(subtitle));
    }

    #[tokio::test]
    async fn test_handle_reports_success_once() {
        let mut engine = MockEncodingEngine::new();
        engine.expect_encode().times(1).returning(|_| Ok(()));

        let invoker = EncodeInvoker::new(Arc::new(engine));
        let handle = invoker.issue(build_request(&paths(), rendition_ladder(), None));
        assert!(handle.outcome().await.is_ok());
    }

    #[tokio::test]
    async fn test_handle_reports_engine_error() {
        let mut engine = MockEncodingEngine::new();
        engine
            .expect_encode()
            .times(1)
            .returning(|_| Err(EncoderError::InvalidRequest("bad stream".into())));

        let invoker = EncodeInvoker::new(Arc::new(engine));
        let handle = invoker.issue(build_request(&paths(), rendition_ladder(), None));
        assert!(matches!(
            handle.outcome().await,
            Err(EncoderError::InvalidRequest(_))
        ));
    }

    struct CrashingEngine;

    #[async_trait::async_trait]
    impl EncodingEngine for CrashingEngine {
        async fn encode(&self, _request: &EncodeRequest) -> Result<(), EncoderError> {
            panic!("engine crashed")
        }
    }

    #[tokio::test]
    async fn test_panicking_engine_is_aborted() {
        let invoker = EncodeInvoker::new(Arc::new(CrashingEngine));
        let handle = invoker.issue(build_request(&paths(), rendition_ladder(), None));
        assert!(matches!(handle.outcome().await, Err(EncoderError::Aborted)));
    }
}
