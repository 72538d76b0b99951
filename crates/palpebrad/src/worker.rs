//! The analytics worker: a dedicated OS thread that owns the ONNX
//! sessions and executes queued agents one at a time.
//!
//! Models are loaded once at spawn (fail-fast). Every run — success,
//! analytic failure, or interruption — ends with a completion record in
//! the pool, so session bookkeeping is never left indeterminate.

use crate::agent::{AgentContext, AnalyticsAgent};
use crate::config::Config;
use crate::datalake::Datalake;
use crate::pool::{AgentPool, Completion};
use chrono::Utc;
use palpebra_core::{
    detector::DetectorError, encoder::EncoderError, landmarks::LandmarkError, AnalysisPipeline,
    FaceDetector, FaceEncoder, LandmarkPredictor,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

const SUCCESS_MESSAGE: &str = "Face recognition analytic finished with success";
const INTERRUPTED_MESSAGE: &str = "Face recognition analytic interrupted";

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("worker thread exited")]
    ChannelClosed,
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Landmarks(#[from] LandmarkError),
    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

/// One queued unit of work.
pub struct AnalyticsJob {
    pub agent: Box<dyn AnalyticsAgent>,
}

/// Anything that can accept a job for execution. The HTTP layer depends
/// on this seam rather than on the concrete worker.
pub trait JobSink: Send + Sync {
    fn submit(&self, job: AnalyticsJob) -> Result<(), WorkerError>;
}

/// Submission handle to the worker thread.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<AnalyticsJob>,
}

impl JobSink for WorkerHandle {
    fn submit(&self, job: AnalyticsJob) -> Result<(), WorkerError> {
        self.tx.send(job).map_err(|_| WorkerError::ChannelClosed)
    }
}

/// Load all models, build the pipeline and start the worker thread.
pub fn spawn_worker(config: &Config, pool: Arc<AgentPool>) -> Result<WorkerHandle, WorkerError> {
    let detector = FaceDetector::load(&config.detector_model_path())?;
    let landmarks = LandmarkPredictor::load(&config.landmark_model_path())?;
    let encoder = FaceEncoder::load(&config.encoder_model_path())?;
    let mut pipeline =
        AnalysisPipeline::new(detector, landmarks, encoder, config.match_threshold);
    let datalake = Datalake::new(&config.datalake_root);

    let (tx, mut rx) = mpsc::unbounded_channel::<AnalyticsJob>();

    std::thread::Builder::new()
        .name("palpebra-worker".into())
        .spawn(move || {
            tracing::info!("analytics worker started");
            while let Some(job) = rx.blocking_recv() {
                let mut agent = job.agent;
                let session_id = agent.session_id().to_string();
                pool.mark_running(&session_id);

                let mut ctx = AgentContext {
                    pipeline: &mut pipeline,
                    datalake: &datalake,
                };
                let completion = match agent.run(&mut ctx) {
                    Ok(outputs) => Completion {
                        success: true,
                        message: SUCCESS_MESSAGE.to_string(),
                        outputs,
                        finished_at: Utc::now(),
                    },
                    Err(e) if e.is_interruption() => {
                        agent.end();
                        Completion {
                            success: false,
                            message: INTERRUPTED_MESSAGE.to_string(),
                            outputs: Vec::new(),
                            finished_at: Utc::now(),
                        }
                    }
                    Err(e) => {
                        tracing::error!(session = %session_id, error = %e, "analytics failed");
                        Completion {
                            success: false,
                            message: e.to_string(),
                            outputs: Vec::new(),
                            finished_at: Utc::now(),
                        }
                    }
                };

                tracing::info!(
                    session = %session_id,
                    success = completion.success,
                    message = %completion.message,
                    "agent finished"
                );
                pool.finish(&session_id, completion);
            }
            tracing::info!("analytics worker exiting");
        })
        .expect("failed to spawn worker thread");

    Ok(WorkerHandle { tx })
}
