//! Process endpoint.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ffapi_media::JobWorkspace;
use ffapi_models::{JobId, ProcessRequest, ProcessResponse};
use ffapi_worker::{JobLogger, JobOutput, OutputFile};
use futures_util::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{info, warn, Instrument};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Run a process request.
///
/// Batch mode answers with a JSON results map; streaming mode answers with
/// the bytes of the first produced file.
pub async fn process(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: ProcessRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejecting malformed process request: {}", e);
        ApiError::bad_request(e.to_string())
    })?;

    let job_id = JobId::new();
    let span = JobLogger::new(&job_id, "process").create_span();
    run_job(state, job_id, request).instrument(span).await
}

/// Any method other than POST on the process route.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn run_job(state: AppState, job_id: JobId, request: ProcessRequest) -> ApiResult<Response> {
    let start = Instant::now();
    let workspace = state.executor.acquire_workspace(&job_id).await.map_err(|e| {
        metrics::record_job_failed(e.stage());
        ApiError::from(e)
    })?;

    let store = state.stores.connect(&request.s3_config);
    let outcome = state
        .executor
        .execute(&job_id, &request, store, &workspace)
        .await;

    match outcome {
        Err(e) => {
            workspace.release().await;
            metrics::record_job_failed(e.stage());
            Err(e.into())
        }
        Ok(JobOutput::Results(results)) => {
            workspace.release().await;
            metrics::record_job_completed("batch");
            info!(
                outputs = results.len(),
                duration_ms = %start.elapsed().as_millis(),
                "Job finished"
            );
            Ok(Json(ProcessResponse { results }).into_response())
        }
        Ok(JobOutput::Stream {
            file: Some(file),
            content_type,
        }) => {
            let response = stream_output(workspace, file, &content_type).await?;
            metrics::record_job_completed("stream");
            Ok(response)
        }
        Ok(JobOutput::Stream { file: None, .. }) => {
            workspace.release().await;
            metrics::record_job_completed("stream");
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// Build a response streaming `file`; the workspace goes away with the body.
async fn stream_output(
    workspace: JobWorkspace,
    file: OutputFile,
    content_type: &str,
) -> ApiResult<Response> {
    let content_type = match HeaderValue::from_str(content_type) {
        Ok(value) => value,
        Err(_) => {
            workspace.release().await;
            return Err(ApiError::bad_request(format!(
                "invalid inlineContentType: {:?}",
                content_type
            )));
        }
    };

    let handle = match File::open(&file.path).await {
        Ok(handle) => handle,
        Err(e) => {
            workspace.release().await;
            return Err(ApiError::internal(format!(
                "failed to open output {}: {}",
                file.name, e
            )));
        }
    };

    info!("Streaming {} ({} bytes)", file.name, file.len);
    let stream = WorkspaceStream {
        inner: ReaderStream::new(handle),
        _workspace: workspace,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, file.len)
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("failed to build response: {}", e)))
}

/// File body that owns the job workspace.
///
/// The workspace is removed when the body is dropped, whether it was sent
/// in full or the client went away.
struct WorkspaceStream {
    inner: ReaderStream<File>,
    _workspace: JobWorkspace,
}

impl Stream for WorkspaceStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}
