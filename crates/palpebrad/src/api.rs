//! HTTP facade: `POST /startAnalytics` and `PUT /stopAnalytics`.
//!
//! The response contract is fixed: `204` on success, `500` with
//! `{"error": "Error occured"}` for malformed payloads and internal
//! failures, and `500` with `{"error": "Analytics <id> not running"}`
//! when stopping an unknown session. Payload validation happens before
//! any agent is constructed.

use crate::agent::FaceBlinkAgent;
use crate::config::Config;
use crate::pool::{AgentPool, PoolError};
use crate::worker::{AnalyticsJob, JobSink};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;

/// Explicit application state handed to every handler.
pub struct AppState {
    pub pool: Arc<AgentPool>,
    pub jobs: Arc<dyn JobSink>,
    pub config: Arc<Config>,
}

/// Request body for `startAnalytics`.
#[derive(Debug, Deserialize)]
pub struct AnalyticsRequest {
    pub session_id: String,
    pub files: Vec<String>,
    /// Free-form analytics parameters; accepted, currently unused.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl AnalyticsRequest {
    fn validate(&self) -> Result<(), &'static str> {
        if self.session_id.trim().is_empty() {
            return Err("session_id must be non-empty");
        }
        if self.files.is_empty() {
            return Err("files must be non-empty");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct StopParams {
    pub session_id: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/startAnalytics").route(web::post().to(start_analytics)))
        .service(web::resource("/stopAnalytics").route(web::put().to(stop_analytics)));
}

fn generic_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({ "error": "Error occured" }))
}

async fn start_analytics(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    // Parse + validate before any agent exists.
    let request: AnalyticsRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(error = %e, "startAnalytics: malformed payload");
            return generic_error();
        }
    };
    if let Err(reason) = request.validate() {
        tracing::warn!(reason, "startAnalytics: invalid payload");
        return generic_error();
    }

    tracing::debug!(
        session = %request.session_id,
        files = request.files.len(),
        params = %request.params,
        "new request"
    );

    let cancel = match state.pool.add(&request.session_id) {
        Ok(cancel) => cancel,
        Err(e) => {
            tracing::warn!(session = %request.session_id, error = %e, "startAnalytics rejected");
            return generic_error();
        }
    };

    let agent = FaceBlinkAgent::new(
        request.session_id.clone(),
        request.files,
        state.config.video_path.clone(),
        state.config.reference_path.clone(),
        cancel,
    );

    if let Err(e) = state.jobs.submit(AnalyticsJob {
        agent: Box::new(agent),
    }) {
        tracing::error!(session = %request.session_id, error = %e, "failed to queue agent");
        let _ = state.pool.remove(&request.session_id);
        return generic_error();
    }

    // This agent registers its outputs with the datalake; nothing is
    // returned for the caller to fetch.
    HttpResponse::NoContent().finish()
}

async fn stop_analytics(state: web::Data<AppState>, query: web::Query<StopParams>) -> HttpResponse {
    match state.pool.terminate(&query.session_id) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e @ PoolError::UnknownSession(_)) => {
            tracing::warn!(session = %query.session_id, "stopAnalytics: unknown session");
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
        }
        Err(e) => {
            tracing::error!(session = %query.session_id, error = %e, "stopAnalytics failed");
            generic_error()
        }
    }
}
