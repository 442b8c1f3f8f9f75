//! Worker error types.

use ffapi_media::MediaError;
use ffapi_storage::StorageError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Why a single input could not be materialized.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input source missing")]
    MissingSource,

    #[error("input name must be a plain file name")]
    InvalidName,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("HTTP fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to write input file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("input {name}: {source}")]
    Input {
        name: String,
        #[source]
        source: InputError,
    },

    #[error(transparent)]
    Execution(MediaError),

    #[error("Upload failed for {name}: {source}")]
    Upload {
        name: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to read output {name}: {source}")]
    OutputRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace error: {0}")]
    Workspace(MediaError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn input(name: impl Into<String>, source: InputError) -> Self {
        Self::Input {
            name: name.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Pipeline stage the error belongs to, for metrics labels.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::Input { .. } => "input",
            WorkerError::Execution(_) => "execution",
            WorkerError::Upload { .. } | WorkerError::OutputRead { .. } | WorkerError::Io(_) => {
                "collect"
            }
            WorkerError::Workspace(_) => "workspace",
            WorkerError::ConfigError(_) | WorkerError::Internal(_) => "internal",
        }
    }

    /// Captured FFmpeg diagnostics of the failing step, if any.
    pub fn console_lines(&self) -> &[String] {
        match self {
            WorkerError::Execution(e) => e.stderr_lines(),
            _ => &[],
        }
    }

    /// Whether the caller supplied something unusable (as opposed to a
    /// server-side failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, WorkerError::Input { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_names_input() {
        let err = WorkerError::input("in.mp4", InputError::MissingSource);
        assert_eq!(err.to_string(), "input in.mp4: input source missing");
        assert!(err.is_client_error());
        assert_eq!(err.stage(), "input");
    }

    #[test]
    fn test_execution_error_carries_console() {
        let err = WorkerError::Execution(MediaError::command_failed(
            2,
            "exit status 1",
            Some(1),
            vec!["out.mp4: Permission denied".to_string()],
        ));
        assert_eq!(err.to_string(), "Step 2 failed: exit status 1");
        assert_eq!(err.console_lines(), ["out.mp4: Permission denied"]);
        assert!(!err.is_client_error());
    }
}
