use crate::domain::error::EncoderError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Options shared by every output of one encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalOptions {
    pub preset: String,
    /// Index of the first segment file.
    pub start_number: u32,
    /// Maximum playlist entries, 0 keeps every segment.
    pub list_size: u32,
    /// Target segment duration in seconds.
    pub segment_duration: u32,
    /// WebVTT file burned into every output.
    pub subtitle_overlay: Option<PathBuf>,
}

/// One rendition's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub rendition: String,
    pub width: u32,
    pub height: u32,
    pub video_bitrate: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub segment_pattern: PathBuf,
    pub playlist_path: PathBuf,
}

/// A single multi-output encode of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub input: PathBuf,
    pub global: GlobalOptions,
    pub outputs: Vec<OutputDescriptor>,
}

/// Something that can perform an [`EncodeRequest`].
///
/// `encode` resolves once: `Ok` after every output finished, `Err` as soon as
/// any output or the engine itself failed. There is no partial success.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EncodingEngine: Send + Sync {
    async fn encode(&self, request: &EncodeRequest) -> Result<(), EncoderError>;
}
