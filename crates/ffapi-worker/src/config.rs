//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Job pipeline configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Shared root under which per-job workspaces are created
    pub work_dir: PathBuf,
    /// FFmpeg executable name or path
    pub ffmpeg_binary: String,
    /// Kill a step that runs longer than this (default: no limit)
    pub step_timeout: Option<Duration>,
    /// Maximum concurrent input fetches per job (default: one per input)
    pub max_input_parallel: Option<usize>,
    /// Timeout for a single HTTP input fetch (default: no limit)
    pub http_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            ffmpeg_binary: "ffmpeg".to_string(),
            step_timeout: None,
            max_input_parallel: None,
            http_timeout: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            ffmpeg_binary: std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            step_timeout: std::env::var("FFMPEG_STEP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_input_parallel: std::env::var("INPUT_FETCH_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0),
            http_timeout: std::env::var("HTTP_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }
}
