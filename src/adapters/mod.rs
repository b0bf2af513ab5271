//! Adapters - Concrete implementations of ports.

pub mod ffmpeg;

pub use ffmpeg::FfmpegEngine;
