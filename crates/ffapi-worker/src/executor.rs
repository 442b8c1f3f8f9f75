//! Job executor.

use std::collections::HashMap;
use std::sync::Arc;

use ffapi_media::{run_pipeline, CommandRunner, FfmpegRunner, JobWorkspace};
use ffapi_models::{JobId, JobResult, ProcessRequest};
use ffapi_storage::ObjectStore;
use tracing::warn;

use crate::collector::{collect_results, first_output, OutputFile};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::materializer::materialize_inputs;

/// What a successful job hands back to the caller.
#[derive(Debug)]
pub enum JobOutput {
    /// Batch mode: produced file name to delivery record
    Results(HashMap<String, JobResult>),
    /// Streaming mode: the file to serve, if any was produced
    Stream {
        file: Option<OutputFile>,
        content_type: String,
    },
}

/// Runs process requests: materialize inputs, execute steps, collect results.
pub struct JobExecutor {
    config: WorkerConfig,
    runner: Arc<dyn CommandRunner>,
    http: reqwest::Client,
}

impl JobExecutor {
    /// Create an executor with a custom step runner.
    pub fn new(config: WorkerConfig, runner: Arc<dyn CommandRunner>) -> WorkerResult<Self> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout {
            http = http.timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| WorkerError::config_error(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            runner,
            http,
        })
    }

    /// Create an executor that spawns the configured FFmpeg binary.
    pub fn from_config(config: WorkerConfig) -> WorkerResult<Self> {
        let mut runner = FfmpegRunner::new().with_binary(config.ffmpeg_binary.clone());
        if let Some(timeout) = config.step_timeout {
            runner = runner.with_timeout(timeout);
        }
        Self::new(config, Arc::new(runner))
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Allocate the workspace for `job_id` under the configured work dir.
    pub async fn acquire_workspace(&self, job_id: &JobId) -> WorkerResult<JobWorkspace> {
        JobWorkspace::acquire(&self.config.work_dir, job_id)
            .await
            .map_err(WorkerError::Workspace)
    }

    /// Run `request` inside `workspace`.
    ///
    /// The caller owns the workspace and releases it afterwards; in
    /// streaming mode the returned file lives inside it.
    pub async fn execute(
        &self,
        job_id: &JobId,
        request: &ProcessRequest,
        store: Arc<dyn ObjectStore>,
        workspace: &JobWorkspace,
    ) -> WorkerResult<JobOutput> {
        let logger = JobLogger::new(job_id, "process");
        logger.log_start(&format!(
            "{} inputs, {} steps",
            request.inputs.len(),
            request.commands.len()
        ));

        if let Err(e) = materialize_inputs(
            Arc::clone(&store),
            &self.http,
            &request.inputs,
            workspace.path(),
            self.config.max_input_parallel,
        )
        .await
        {
            logger.log_error(&format!("input fetch failed: {}", e));
            return Err(e);
        }
        logger.log_progress("inputs ready");

        if let Err(e) = run_pipeline(self.runner.as_ref(), workspace.path(), &request.commands).await
        {
            logger.log_error(&format!("ffmpeg execution failed: {}", e));
            for line in e.stderr_lines() {
                warn!(job_id = %job_id, "ffmpeg: {}", line);
            }
            return Err(WorkerError::Execution(e));
        }
        logger.log_progress("steps finished");

        let output = match request.output.streaming_content_type() {
            Some(content_type) => {
                let file = first_output(workspace.path(), &request.inputs).await?;
                match &file {
                    Some(f) => logger.log_completion(&format!("streaming {}", f.name)),
                    None => logger.log_error("streaming requested but no output file was produced"),
                }
                JobOutput::Stream {
                    file,
                    content_type: content_type.to_string(),
                }
            }
            None => {
                let results = collect_results(
                    store.as_ref(),
                    workspace.path(),
                    &request.inputs,
                    &request.output,
                )
                .await
                .map_err(|e| {
                    logger.log_error(&format!("result collection failed: {}", e));
                    e
                })?;
                logger.log_completion(&format!("{} outputs", results.len()));
                JobOutput::Results(results)
            }
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use ffapi_media::{CommandOutput, MediaResult};
    use ffapi_models::{CommandStep, Input, OutputSpec};
    use ffapi_storage::MemoryObjectStore;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Treats `-i <src> <dst>` as "copy src to dst"; fails when src is missing.
    #[derive(Default)]
    struct CopyRunner {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl CommandRunner for CopyRunner {
        async fn run(&self, args: &[String], working_dir: &Path) -> MediaResult<CommandOutput> {
            *self.calls.lock().unwrap() += 1;
            let src = &args[2];
            let dst = &args[3];
            match std::fs::copy(working_dir.join(src), working_dir.join(dst)) {
                Ok(_) => Ok(CommandOutput {
                    success: true,
                    exit_code: Some(0),
                    stderr: String::new(),
                }),
                Err(_) => Ok(CommandOutput {
                    success: false,
                    exit_code: Some(1),
                    stderr: format!("{}: No such file or directory\n", src),
                }),
            }
        }
    }

    fn request(inputs: Vec<(&str, Input)>, steps: Vec<CommandStep>, output: OutputSpec) -> ProcessRequest {
        ProcessRequest {
            inputs: inputs.into_iter().map(|(n, i)| (n.to_string(), i)).collect(),
            commands: steps,
            output,
            ..ProcessRequest::default()
        }
    }

    #[tokio::test]
    async fn test_later_step_sees_earlier_output() {
        let root = TempDir::new().unwrap();
        let runner = Arc::new(CopyRunner::default());
        let executor = JobExecutor::new(
            WorkerConfig::default().with_work_dir(root.path()),
            runner.clone(),
        )
        .unwrap();

        let job_id = JobId::new();
        let workspace = executor.acquire_workspace(&job_id).await.unwrap();
        let request = request(
            vec![
                ("in.mp4", Input::inline(STANDARD.encode(b"video"))),
                ("mid.mp4", Input::placeholder()),
            ],
            vec![
                CommandStep::new(["-i", "in.mp4", "mid.mp4"]),
                CommandStep::new(["-i", "mid.mp4", "out.mp4"]),
            ],
            OutputSpec {
                base64: true,
                ..OutputSpec::default()
            },
        );

        let output = executor
            .execute(&job_id, &request, Arc::new(MemoryObjectStore::new()), &workspace)
            .await
            .unwrap();

        match output {
            JobOutput::Results(results) => {
                assert_eq!(results.len(), 1);
                assert_eq!(results["out.mp4"].base64.as_deref(), Some(STANDARD.encode(b"video").as_str()));
            }
            other => panic!("unexpected output: {other:?}"),
        }
        assert_eq!(*runner.calls.lock().unwrap(), 2);
        workspace.release().await;
    }

    #[tokio::test]
    async fn test_failed_step_stops_chain() {
        let root = TempDir::new().unwrap();
        let runner = Arc::new(CopyRunner::default());
        let executor = JobExecutor::new(
            WorkerConfig::default().with_work_dir(root.path()),
            runner.clone(),
        )
        .unwrap();

        let job_id = JobId::new();
        let workspace = executor.acquire_workspace(&job_id).await.unwrap();
        let request = request(
            vec![],
            vec![
                CommandStep::new(["-i", "absent.mp4", "mid.mp4"]),
                CommandStep::new(["-i", "mid.mp4", "out.mp4"]),
            ],
            OutputSpec::default(),
        );

        let err = executor
            .execute(&job_id, &request, Arc::new(MemoryObjectStore::new()), &workspace)
            .await
            .unwrap_err();

        assert_eq!(err.console_lines(), ["absent.mp4: No such file or directory"]);
        assert_eq!(*runner.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_runs_no_steps() {
        let root = TempDir::new().unwrap();
        let runner = Arc::new(CopyRunner::default());
        let executor = JobExecutor::new(
            WorkerConfig::default().with_work_dir(root.path()),
            runner.clone(),
        )
        .unwrap();

        let job_id = JobId::new();
        let workspace = executor.acquire_workspace(&job_id).await.unwrap();
        let request = request(
            vec![("in.mp4", Input::default())],
            vec![CommandStep::new(["-i", "in.mp4", "out.mp4"])],
            OutputSpec::default(),
        );

        let err = executor
            .execute(&job_id, &request, Arc::new(MemoryObjectStore::new()), &workspace)
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(*runner.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_request_streaming_has_no_file() {
        let root = TempDir::new().unwrap();
        let executor = JobExecutor::new(
            WorkerConfig::default().with_work_dir(root.path()),
            Arc::new(CopyRunner::default()),
        )
        .unwrap();

        let job_id = JobId::new();
        let workspace = executor.acquire_workspace(&job_id).await.unwrap();
        let request = request(
            vec![],
            vec![],
            OutputSpec {
                inline_content_type: "video/mp4".into(),
                ..OutputSpec::default()
            },
        );

        let output = executor
            .execute(&job_id, &request, Arc::new(MemoryObjectStore::new()), &workspace)
            .await
            .unwrap();

        assert!(matches!(output, JobOutput::Stream { file: None, ref content_type } if content_type == "video/mp4"));
    }
}
