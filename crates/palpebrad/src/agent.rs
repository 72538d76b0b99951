//! Analytics agents: the unit of work the pool schedules.
//!
//! The host framework's "subclass a base agent and override two lifecycle
//! methods" pattern maps to the small [`AnalyticsAgent`] capability trait:
//! `run` does the work, `end` handles a termination request. The worker
//! invokes both and records the outcome, so the lifecycle callback fires
//! on every path.

use crate::datalake::{Datalake, DatalakeError};
use palpebra_core::{report, AnalysisPipeline, CancelFlag, PipelineError};
use palpebra_media::{still, MediaError, VideoFile};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Datalake(#[from] DatalakeError),
}

impl AgentError {
    /// True when the run ended because of a termination request.
    pub fn is_interruption(&self) -> bool {
        matches!(self, AgentError::Pipeline(PipelineError::Interrupted))
    }
}

/// Shared resources an agent runs against, owned by the worker thread.
pub struct AgentContext<'a> {
    pub pipeline: &'a mut AnalysisPipeline,
    pub datalake: &'a Datalake,
}

/// One schedulable unit of analytics work.
pub trait AnalyticsAgent: Send {
    fn session_id(&self) -> &str;

    /// Execute the analytics; returns the datalake names of the outputs
    /// produced.
    fn run(&mut self, ctx: &mut AgentContext<'_>) -> Result<Vec<String>, AgentError>;

    /// Handle a termination request after `run` unwound.
    fn end(&mut self);
}

/// The blink/face-comparison agent: selects the last closed-eye frame of
/// the fixed video, crops the face, compares it against the fixed
/// reference image, and writes the packaged verdict.
pub struct FaceBlinkAgent {
    session_id: String,
    files: Vec<String>,
    video_path: PathBuf,
    reference_path: PathBuf,
    cancel: CancelFlag,
}

impl FaceBlinkAgent {
    pub fn new(
        session_id: String,
        files: Vec<String>,
        video_path: PathBuf,
        reference_path: PathBuf,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            session_id,
            files,
            video_path,
            reference_path,
            cancel,
        }
    }
}

impl AnalyticsAgent for FaceBlinkAgent {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn run(&mut self, ctx: &mut AgentContext<'_>) -> Result<Vec<String>, AgentError> {
        tracing::info!(session = %self.session_id, "run() started");

        // The request's input files are fetched for the record; the
        // analysis itself operates on the fixed, pre-provisioned media.
        for name in &self.files {
            match ctx.datalake.read_input(name) {
                Ok(content) => {
                    tracing::info!(session = %self.session_id, file = %name, size = content.len(), "input read")
                }
                Err(e) => {
                    tracing::warn!(session = %self.session_id, file = %name, error = %e, "input unavailable")
                }
            }
        }

        let reference = still::load_frame(&self.reference_path)?;
        let mut video = VideoFile::open(&self.video_path)?;
        let analysis = ctx
            .pipeline
            .analyze(video.frames()?, &reference, &self.cancel)?;

        let mut outputs = Vec::new();

        // Intermediate artifacts: the selected frame and the face crop.
        let frame_jpeg = still::encode_jpeg(&analysis.selected_frame)?;
        outputs.push(
            ctx.datalake
                .write_output(&self.session_id, "frame.jpg", &frame_jpeg)?,
        );
        let face_jpeg = still::encode_jpeg(&analysis.face_crop)?;
        outputs.push(
            ctx.datalake
                .write_output(&self.session_id, "face.jpg", &face_jpeg)?,
        );

        let packaged = report::package_result(analysis.result.matched);
        outputs.push(ctx.datalake.write_output(
            &self.session_id,
            report::RESULT_OUTPUT_NAME,
            &packaged,
        )?);

        tracing::info!(
            session = %self.session_id,
            matched = analysis.result.matched,
            distance = analysis.result.distance,
            blinks = analysis.total_blinks,
            frames = analysis.frames_scanned,
            "run() ended"
        );
        Ok(outputs)
    }

    fn end(&mut self) {
        tracing::info!(session = %self.session_id, "termination request for analytics");
        self.cancel.cancel();
    }
}
