//! FFmpeg step runner and sequential pipeline.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ffapi_models::CommandStep;
use metrics::histogram;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Diagnostic flag that every invocation carries exactly once.
pub const HIDE_BANNER: &str = "-hide_banner";

/// Histogram of per-step wall time.
pub const STEP_DURATION_SECONDS: &str = "ffapi_ffmpeg_step_duration_seconds";

/// Outcome of one process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Full captured standard error
    pub stderr: String,
}

/// Runs one external-tool invocation in a working directory.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run with `args` (already sanitized) and return the exit outcome.
    ///
    /// An `Err` means the process could not be launched or waited on.
    async fn run(&self, args: &[String], working_dir: &Path) -> MediaResult<CommandOutput>;
}

/// Runner that spawns the FFmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: String,
    timeout: Option<Duration>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a runner for `ffmpeg` on `PATH` with no timeout.
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            timeout: None,
        }
    }

    /// Use a different executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Kill a step that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[async_trait]
impl CommandRunner for FfmpegRunner {
    async fn run(&self, args: &[String], working_dir: &Path) -> MediaResult<CommandOutput> {
        debug!("Running {} {}", self.binary, args.join(" "));

        let child = Command::new(&self.binary)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MediaError::LaunchFailed {
                binary: self.binary.clone(),
                source,
            })?;

        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    // Dropping the wait future drops the child, which kills it.
                    warn!(
                        "{} timed out after {} seconds, killing process",
                        self.binary,
                        timeout.as_secs()
                    );
                    return Err(MediaError::Timeout(timeout.as_secs()));
                }
            },
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Prepend [`HIDE_BANNER`] and drop any caller-supplied copies of it.
pub fn sanitize_args(args: &[String]) -> Vec<String> {
    std::iter::once(HIDE_BANNER.to_string())
        .chain(args.iter().filter(|a| a.as_str() != HIDE_BANNER).cloned())
        .collect()
}

/// Split captured stderr into lines, ignoring trailing blank lines.
pub fn split_stderr_lines(stderr: &str) -> Vec<String> {
    stderr
        .trim_end_matches(|c| c == '\n' || c == '\r')
        .lines()
        .map(str::to_string)
        .collect()
}

/// Run `steps` in order inside `working_dir`, stopping at the first failure.
///
/// The returned error carries the failing step's stderr; output from
/// earlier steps is not kept.
pub async fn run_pipeline(
    runner: &dyn CommandRunner,
    working_dir: &Path,
    steps: &[CommandStep],
) -> MediaResult<()> {
    for (index, step) in steps.iter().enumerate() {
        let number = index + 1;
        let args = sanitize_args(step.args());
        info!("ffmpeg step {}: {}", number, args.join(" "));

        let start = Instant::now();
        let output = runner
            .run(&args, working_dir)
            .await
            .map_err(|e| MediaError::command_failed(number, e.to_string(), None, Vec::new()))?;
        let elapsed = start.elapsed();
        histogram!(STEP_DURATION_SECONDS).record(elapsed.as_secs_f64());

        if !output.success {
            let message = match output.exit_code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(MediaError::command_failed(
                number,
                message,
                output.exit_code,
                split_stderr_lines(&output.stderr),
            ));
        }

        info!("ffmpeg step {} finished in {:?}", number, elapsed);
    }

    Ok(())
}

/// Check that `binary` resolves on `PATH`.
pub fn check_ffmpeg(binary: &str) -> MediaResult<PathBuf> {
    which::which(binary).map_err(|_| MediaError::FfmpegNotFound {
        binary: binary.to_string(),
    })
}
