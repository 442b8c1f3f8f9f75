//! FFmpeg CLI execution inside per-job workspaces.
//!
//! This crate provides:
//! - Uniquely named job workspaces with guaranteed removal
//! - Argument sanitization for caller-supplied FFmpeg steps
//! - A swappable process runner and a sequential step pipeline

pub mod command;
pub mod error;
pub mod workspace;

pub use command::{
    check_ffmpeg, run_pipeline, sanitize_args, split_stderr_lines, CommandOutput, CommandRunner,
    FfmpegRunner, HIDE_BANNER,
};
pub use error::{MediaError, MediaResult};
pub use workspace::JobWorkspace;
