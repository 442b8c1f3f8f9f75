//! Result collection.
//!
//! Outputs are the workspace entries whose names are not input names, in
//! file-name order. Streaming only considers regular files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ffapi_models::{Input, JobResult, OutputSpec};
use ffapi_storage::ObjectStore;
use metrics::histogram;
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};

/// Histogram of per-file upload time.
pub const UPLOAD_DURATION_SECONDS: &str = "ffapi_upload_duration_seconds";

/// A file produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub path: PathBuf,
    pub len: u64,
}

/// Every non-input workspace entry in file-name order, flagged with
/// whether it is a regular file.
async fn scan_outputs(
    workspace_dir: &Path,
    inputs: &HashMap<String, Input>,
) -> WorkerResult<Vec<(OutputFile, bool)>> {
    let mut outputs = Vec::new();
    let mut entries = tokio::fs::read_dir(workspace_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if inputs.contains_key(&name) {
            continue;
        }

        let metadata = entry.metadata().await?;
        let file = OutputFile {
            name,
            path: entry.path(),
            len: metadata.len(),
        };
        outputs.push((file, metadata.is_file()));
    }

    outputs.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));
    Ok(outputs)
}

/// List produced files, skipping directories and input-named entries.
pub async fn list_outputs(
    workspace_dir: &Path,
    inputs: &HashMap<String, Input>,
) -> WorkerResult<Vec<OutputFile>> {
    Ok(scan_outputs(workspace_dir, inputs)
        .await?
        .into_iter()
        .filter_map(|(file, is_file)| is_file.then_some(file))
        .collect())
}

/// The file to stream in streaming mode, if the pipeline produced any.
pub async fn first_output(
    workspace_dir: &Path,
    inputs: &HashMap<String, Input>,
) -> WorkerResult<Option<OutputFile>> {
    Ok(list_outputs(workspace_dir, inputs).await?.into_iter().next())
}

/// Upload and/or inline every produced entry.
///
/// Every non-input entry gets a result. Entries that are not regular files
/// (directories the steps created) get an empty one: nothing is uploaded or
/// inlined for them. The first upload failure aborts collection; objects
/// uploaded before it are left in place.
pub async fn collect_results(
    store: &dyn ObjectStore,
    workspace_dir: &Path,
    inputs: &HashMap<String, Input>,
    output: &OutputSpec,
) -> WorkerResult<HashMap<String, JobResult>> {
    let mut results = HashMap::new();

    for (file, is_file) in scan_outputs(workspace_dir, inputs).await? {
        if !is_file {
            debug!("Output {} is not a regular file, recording it without content", file.name);
            results.insert(file.name, JobResult::default());
            continue;
        }

        let mut result = JobResult::default();
        info!("Collecting output {} ({} bytes)", file.name, file.len);

        if let Some(target) = output.upload_target() {
            let start = Instant::now();
            let url = store
                .put(target, &file.path, &file.name)
                .await
                .map_err(|source| WorkerError::Upload {
                    name: file.name.clone(),
                    source,
                })?;
            histogram!(UPLOAD_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
            result.url = Some(url);
        }

        if output.base64 {
            let data = tokio::fs::read(&file.path)
                .await
                .map_err(|source| WorkerError::OutputRead {
                    name: file.name.clone(),
                    source,
                })?;
            result.base64 = Some(STANDARD.encode(data));
        }

        results.insert(file.name, result);
    }

    Ok(results)
}
