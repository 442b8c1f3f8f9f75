//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while preparing or running FFmpeg jobs.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{binary} not found in PATH")]
    FfmpegNotFound { binary: String },

    #[error("Failed to launch {binary}: {source}")]
    LaunchFailed {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step {step} failed: {message}")]
    CommandFailed {
        step: usize,
        message: String,
        exit_code: Option<i32>,
        stderr_lines: Vec<String>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Failed to create workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a step failure error.
    pub fn command_failed(
        step: usize,
        message: impl Into<String>,
        exit_code: Option<i32>,
        stderr_lines: Vec<String>,
    ) -> Self {
        Self::CommandFailed {
            step,
            message: message.into(),
            exit_code,
            stderr_lines,
        }
    }

    /// Captured diagnostic output, if this is a step failure.
    pub fn stderr_lines(&self) -> &[String] {
        match self {
            MediaError::CommandFailed { stderr_lines, .. } => stderr_lines,
            _ => &[],
        }
    }
}
