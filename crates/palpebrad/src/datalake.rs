//! Local datalake: the file store agents read inputs from and write
//! outputs to. Outputs are session-scoped so concurrent sessions can
//! never collide on a path.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const INBOX_DIR: &str = "inbox";

#[derive(Error, Debug)]
pub enum DatalakeError {
    #[error("invalid datalake name: {0:?}")]
    InvalidName(String),
    #[error("input not found: {0}")]
    InputNotFound(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Root-directory datalake with `read_input` / `write_output` in the
/// shape of the host framework's collaborator functions.
#[derive(Clone)]
pub struct Datalake {
    root: PathBuf,
}

impl Datalake {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Read a named input from the shared inbox.
    pub fn read_input(&self, name: &str) -> Result<Vec<u8>, DatalakeError> {
        let name = sanitized(name)?;
        let path = self.root.join(INBOX_DIR).join(name);
        if !path.exists() {
            return Err(DatalakeError::InputNotFound(name.to_string()));
        }
        Ok(fs::read(path)?)
    }

    /// Write a named output under the session's directory, creating it on
    /// first use. Returns the name as registered with the datalake.
    pub fn write_output(
        &self,
        session_id: &str,
        name: &str,
        content: &[u8],
    ) -> Result<String, DatalakeError> {
        let session = sanitized(session_id)?;
        let name = sanitized(name)?;

        let dir = self.root.join(session);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(name), content)?;

        Ok(format!("{session}/{name}"))
    }
}

/// Names must be plain file names: no separators, no parent references.
fn sanitized(name: &str) -> Result<&str, DatalakeError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(DatalakeError::InvalidName(name.to_string()));
    }
    Ok(name)
}
