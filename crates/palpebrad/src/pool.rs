//! The agent pool: an explicit, shared registry of queued and running
//! analytics agents keyed by session id.
//!
//! This is the in-process stand-in for the host framework's analytics
//! pool; handlers receive it through application state rather than a
//! module-level singleton.

use chrono::{DateTime, Utc};
use palpebra_core::CancelFlag;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Analytics {0} not running")]
    UnknownSession(String),
    #[error("Analytics {0} already registered")]
    Duplicate(String),
}

/// Lifecycle state of one agent.
#[derive(Debug, Clone)]
pub enum AgentState {
    Queued,
    Running,
    Finished(Completion),
}

/// The terminal record written by the worker's lifecycle callback.
#[derive(Debug, Clone)]
pub struct Completion {
    pub success: bool,
    pub message: String,
    pub outputs: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

struct Entry {
    cancel: CancelFlag,
    state: AgentState,
}

/// Session-id-keyed registry of agents.
#[derive(Default)]
pub struct AgentPool {
    entries: RwLock<HashMap<String, Entry>>,
}

impl AgentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and hand back its cancellation flag.
    /// A session id still present in the pool is rejected.
    pub fn add(&self, session_id: &str) -> Result<CancelFlag, PoolError> {
        let mut entries = self.entries.write();
        if entries.contains_key(session_id) {
            return Err(PoolError::Duplicate(session_id.to_string()));
        }
        let cancel = CancelFlag::new();
        entries.insert(
            session_id.to_string(),
            Entry {
                cancel: cancel.clone(),
                state: AgentState::Queued,
            },
        );
        Ok(cancel)
    }

    /// Current state of a session, if registered.
    pub fn state(&self, session_id: &str) -> Option<AgentState> {
        self.entries.read().get(session_id).map(|e| e.state.clone())
    }

    pub fn mark_running(&self, session_id: &str) {
        if let Some(entry) = self.entries.write().get_mut(session_id) {
            entry.state = AgentState::Running;
        }
    }

    /// Record the outcome of a finished run. The entry stays in the pool
    /// until `stopAnalytics` removes it.
    pub fn finish(&self, session_id: &str, completion: Completion) {
        if let Some(entry) = self.entries.write().get_mut(session_id) {
            entry.state = AgentState::Finished(completion);
        }
    }

    /// Signal termination and remove the session from the pool.
    pub fn terminate(&self, session_id: &str) -> Result<(), PoolError> {
        let mut entries = self.entries.write();
        let entry = entries
            .remove(session_id)
            .ok_or_else(|| PoolError::UnknownSession(session_id.to_string()))?;
        entry.cancel.cancel();
        Ok(())
    }

    /// Remove a session without signalling it (used to undo registration
    /// when queueing fails).
    pub fn remove(&self, session_id: &str) -> Result<(), PoolError> {
        self.entries
            .write()
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| PoolError::UnknownSession(session_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
