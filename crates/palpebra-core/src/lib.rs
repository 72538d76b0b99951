//! palpebra-core — the video analytics pipeline.
//!
//! Scans a video for the last frame with closed eyes (eye-aspect-ratio
//! over 68-point facial landmarks), crops the first detected face, and
//! compares it against a reference embedding. Detection, landmark
//! regression and encoding run via ONNX Runtime.

pub mod blink;
pub mod detector;
pub mod encoder;
pub mod frame;
pub mod landmarks;
pub mod pipeline;
pub mod report;
pub mod types;

pub use blink::{eye_aspect_ratio, BlinkScanner, CONSEC_FRAMES, EAR_THRESHOLD};
pub use detector::FaceDetector;
pub use encoder::FaceEncoder;
pub use frame::Frame;
pub use landmarks::{LandmarkPredictor, Landmarks};
pub use pipeline::{Analysis, AnalysisPipeline, CancelFlag, PipelineError};
pub use types::{
    Embedding, EuclideanMatcher, FaceBox, FaceMatch, Matcher, DEFAULT_MATCH_THRESHOLD,
};
