// Local filesystem adapter - File system operations via tokio::fs

use crate::domain::errors::*;
use crate::ports::*;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Local filesystem adapter
#[derive(Debug, Default, Clone)]
pub struct FsLocalAdapter;

impl FsLocalAdapter {
    /// Create new local filesystem adapter
    pub fn new() -> Self {
        Self
    }
}

/// Filesystem failures are reported as engine failures without an exit code
fn fs_failure(path: &Path, action: &str, err: io::Error) -> DomainError {
    DomainError::EngineFailed {
        exit_code: None,
        last_lines: vec![format!("Failed to {} {}: {}", action, path.display(), err)],
    }
}

#[async_trait]
impl FsPort for FsLocalAdapter {
    async fn claim_file(&self, path: &Path) -> Result<(), DomainError> {
        match fs::OpenOptions::new().write(true).create_new(true).open(path).await {
            Ok(_) => {
                debug!(path = %path.display(), "Claimed output path");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(DomainError::OutputExists {
                path: path.display().to_string(),
            }),
            Err(e) => Err(fs_failure(path, "create", e)),
        }
    }

    async fn create_directory(&self, path: &Path) -> Result<(), DomainError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| fs_failure(path, "create directory", e))
    }

    async fn remove_file(&self, path: &Path) -> Result<(), DomainError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(fs_failure(path, "remove", e)),
        }
    }
}
