//! hls-ladder - Adaptive bitrate HLS packaging of uploaded videos
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (rendition ladder, artifact layout, master playlist, jobs)
//! - ports/: Trait definitions (encoding engine)
//! - adapters/: Concrete implementations (ffmpeg subprocess)
//! - application/: Encode invocation and job lifecycle
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use adapters::FfmpegEngine;
pub use application::{JobReceipt, JobTicket, TranscodeService};
pub use config::TranscoderConfig;
pub use domain::error::{EncoderError, TranscodeError};
pub use domain::jobs::{JobResult, StatusHint, Upload};
