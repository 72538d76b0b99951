//! palpebra-media — the I/O boundary.
//!
//! Decodes video files into RGB [`Frame`]s via ffmpeg and handles the
//! still images the pipeline reads and writes. Pixel format conversion
//! happens here only; everything downstream works on tightly packed RGB24.

pub mod still;
pub mod video;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("no video stream in {0}")]
    NoVideoStream(String),
    #[error("ffmpeg: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub use video::{VideoFile, VideoInfo};
