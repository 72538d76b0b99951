//! The sequential analytics pipeline: closed-eye frame selection, face
//! crop, reference comparison, with explicit errors for every edge the
//! happy path can fall off.

use crate::blink::{eye_aspect_ratio, BlinkScanner};
use crate::detector::{DetectorError, FaceDetector};
use crate::encoder::{EncoderError, FaceEncoder};
use crate::frame::Frame;
use crate::landmarks::{LandmarkError, LandmarkPredictor};
use crate::types::{Embedding, EuclideanMatcher, FaceMatch, Matcher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("video produced no frames")]
    NoFrames,
    #[error("no frame fell below the eye-closure threshold")]
    NoClosedEyeFrame,
    #[error("no face detected in the selected frame")]
    NoFaceInSelectedFrame,
    #[error("no face detected in the reference image")]
    NoFaceInReference,
    #[error("analysis interrupted")]
    Interrupted,
    #[error("frame decode failed: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Landmarks(#[from] LandmarkError),
    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

/// Cooperative cancellation flag, observed between frames and between
/// pipeline stages.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one run produces.
#[derive(Debug)]
pub struct Analysis {
    pub result: FaceMatch,
    pub total_blinks: u32,
    pub frames_scanned: usize,
    pub faces_seen: usize,
    pub selected_index: usize,
    pub selected_frame: Frame,
    pub face_crop: Frame,
}

/// The model-owning pipeline. Runs strictly sequentially; one analysis at
/// a time per instance.
pub struct AnalysisPipeline {
    detector: FaceDetector,
    landmarks: LandmarkPredictor,
    encoder: FaceEncoder,
    match_threshold: f32,
}

impl AnalysisPipeline {
    pub fn new(
        detector: FaceDetector,
        landmarks: LandmarkPredictor,
        encoder: FaceEncoder,
        match_threshold: f32,
    ) -> Self {
        Self {
            detector,
            landmarks,
            encoder,
            match_threshold,
        }
    }

    /// Run the full sequence over a frame stream and a reference image:
    /// selector → cropper → comparator. Packaging is the caller's step.
    pub fn analyze<I, E>(
        &mut self,
        frames: I,
        reference: &Frame,
        cancel: &CancelFlag,
    ) -> Result<Analysis, PipelineError>
    where
        I: IntoIterator<Item = Result<Frame, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        // Stage 1: scan for the last closed-eye frame.
        let mut scanner = BlinkScanner::new();
        let mut selected: Option<Frame> = None;
        let mut frames_scanned = 0usize;
        let mut faces_seen = 0usize;

        for item in frames {
            if cancel.is_cancelled() {
                return Err(PipelineError::Interrupted);
            }
            let frame = item.map_err(|e| PipelineError::Decode(e.into()))?;
            frames_scanned += 1;

            let boxes = self.detector.detect(&frame)?;
            let Some(face) = boxes.first() else {
                tracing::debug!(frame = frame.index(), "no face in frame, skipping");
                continue;
            };
            faces_seen += 1;

            let landmarks = self.landmarks.predict(&frame, face)?;
            let ear = (eye_aspect_ratio(&landmarks.left_eye())
                + eye_aspect_ratio(&landmarks.right_eye()))
                / 2.0;
            tracing::trace!(frame = frame.index(), ear, "frame scanned");

            if scanner.observe(frame.index(), ear) {
                selected = Some(frame);
            }
        }

        if frames_scanned == 0 {
            return Err(PipelineError::NoFrames);
        }
        let selected_frame = selected.ok_or(PipelineError::NoClosedEyeFrame)?;
        tracing::info!(
            frame = selected_frame.index(),
            blinks = scanner.total_blinks(),
            frames_scanned,
            "closed-eye frame selected"
        );

        if cancel.is_cancelled() {
            return Err(PipelineError::Interrupted);
        }

        // Stage 2: crop. Only the first detected box is carried forward.
        let boxes = self.detector.detect(&selected_frame)?;
        let face = boxes.first().ok_or(PipelineError::NoFaceInSelectedFrame)?;
        let face_crop = selected_frame
            .crop(face)
            .ok_or(PipelineError::NoFaceInSelectedFrame)?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Interrupted);
        }

        // Stage 3: compare against the reference.
        let reference_embedding = self.encode_first_face(reference)?;
        let candidate_embedding = self.encoder.encode(&face_crop)?;
        let result = EuclideanMatcher.compare(
            &reference_embedding,
            &candidate_embedding,
            self.match_threshold,
        );
        tracing::info!(
            matched = result.matched,
            distance = result.distance,
            "comparison finished"
        );

        Ok(Analysis {
            result,
            total_blinks: scanner.total_blinks(),
            frames_scanned,
            faces_seen,
            selected_index: selected_frame.index(),
            selected_frame,
            face_crop,
        })
    }

    /// Detect, crop and encode the first face of an image.
    fn encode_first_face(&mut self, image: &Frame) -> Result<Embedding, PipelineError> {
        let boxes = self.detector.detect(image)?;
        let face = boxes.first().ok_or(PipelineError::NoFaceInReference)?;
        let crop = image.crop(face).ok_or(PipelineError::NoFaceInReference)?;
        Ok(self.encoder.encode(&crop)?)
    }
}
