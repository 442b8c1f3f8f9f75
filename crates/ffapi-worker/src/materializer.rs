//! Input materialization.
//!
//! Every named input is resolved into `workspace/<name>` by its own task.
//! All tasks run to completion; the first failure observed is returned and
//! later ones are only logged.

use std::collections::HashMap;
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ffapi_models::{Input, InputSource};
use ffapi_storage::ObjectStore;
use metrics::histogram;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::{InputError, WorkerError, WorkerResult};

/// Histogram of per-input fetch time, labelled by source kind.
pub const INPUT_FETCH_DURATION_SECONDS: &str = "ffapi_input_fetch_duration_seconds";

/// Write every non-placeholder input into `workspace_dir`.
///
/// `max_parallel` caps concurrent fetches; `None` runs one task per input.
pub async fn materialize_inputs(
    store: Arc<dyn ObjectStore>,
    http: &reqwest::Client,
    inputs: &HashMap<String, Input>,
    workspace_dir: &Path,
    max_parallel: Option<usize>,
) -> WorkerResult<()> {
    let limiter = max_parallel
        .filter(|n| *n > 0)
        .map(|n| Arc::new(Semaphore::new(n)));
    let mut tasks = JoinSet::new();

    for (name, input) in inputs {
        let name = name.clone();
        let input = input.clone();
        let store = Arc::clone(&store);
        let http = http.clone();
        let workspace_dir = workspace_dir.to_path_buf();
        let limiter = limiter.clone();

        tasks.spawn(async move {
            let _permit = match limiter {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            let result = fetch_input(store.as_ref(), &http, &name, &input, &workspace_dir).await;
            (name, result)
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let error = match joined {
            Ok((_, Ok(()))) => continue,
            Ok((name, Err(source))) => WorkerError::input(name, source),
            Err(e) => WorkerError::Internal(format!("input task failed: {}", e)),
        };

        if first_error.is_none() {
            first_error = Some(error);
        } else {
            debug!("Dropping additional input failure: {}", error);
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Resolve one input into `workspace_dir/<name>`.
async fn fetch_input(
    store: &dyn ObjectStore,
    http: &reqwest::Client,
    name: &str,
    input: &Input,
    workspace_dir: &Path,
) -> Result<(), InputError> {
    validate_input_name(name)?;
    let source = input.source().ok_or(InputError::MissingSource)?;
    let dst = workspace_dir.join(name);

    info!("Fetching input {} ({})", name, source.kind());
    let start = Instant::now();

    match source {
        InputSource::Object(address) => {
            let data = store.get(address).await?;
            tokio::fs::write(&dst, data).await?;
        }
        InputSource::Http(url) => download_http(http, url, &dst).await?,
        InputSource::Inline(payload) => {
            let data = STANDARD.decode(payload)?;
            tokio::fs::write(&dst, data).await?;
        }
        InputSource::Placeholder => {
            debug!("Input {} is a placeholder, nothing to fetch", name);
            return Ok(());
        }
    }

    histogram!(INPUT_FETCH_DURATION_SECONDS, "source" => source.kind())
        .record(start.elapsed().as_secs_f64());
    Ok(())
}

/// Plain GET, streaming the body to `dst`. Non-2xx responses are errors.
async fn download_http(http: &reqwest::Client, url: &str, dst: &Path) -> Result<(), InputError> {
    let mut response = http.get(url).send().await?.error_for_status()?;
    let mut file = tokio::fs::File::create(dst).await?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Input names must be a single plain path component so the file stays
/// inside the workspace.
fn validate_input_name(name: &str) -> Result<(), InputError> {
    if name.contains('\\') {
        return Err(InputError::InvalidName);
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part.to_str() == Some(name) => Ok(()),
        _ => Err(InputError::InvalidName),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffapi_storage::MemoryObjectStore;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inputs(entries: Vec<(&str, Input)>) -> HashMap<String, Input> {
        entries
            .into_iter()
            .map(|(name, input)| (name.to_string(), input))
            .collect()
    }

    #[tokio::test]
    async fn test_materializes_every_source_kind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"http-bytes".to_vec()))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryObjectStore::new());
        store.insert("s3://media/in.mp4", b"s3-bytes".to_vec()).await.unwrap();

        let dir = TempDir::new().unwrap();
        let inputs = inputs(vec![
            ("in.mp4", Input::object("s3://media/in.mp4")),
            ("clip.mp4", Input::http(format!("{}/clip.mp4", server.uri()))),
            ("logo.txt", Input::inline(STANDARD.encode(b"inline-bytes"))),
            ("mid.mp4", Input::placeholder()),
        ]);

        materialize_inputs(store, &reqwest::Client::new(), &inputs, dir.path(), None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("in.mp4")).unwrap(), b"s3-bytes");
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap(), b"http-bytes");
        assert_eq!(std::fs::read(dir.path().join("logo.txt")).unwrap(), b"inline-bytes");
        assert!(!dir.path().join("mid.mp4").exists());
    }

    #[tokio::test]
    async fn test_object_address_wins_over_other_selectors() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("s3://media/in.mp4", b"from-s3".to_vec()).await.unwrap();

        let dir = TempDir::new().unwrap();
        let input = Input {
            s3: "s3://media/in.mp4".into(),
            http: "http://127.0.0.1:1/unreachable".into(),
            base64: STANDARD.encode(b"from-inline"),
            temporary: true,
        };

        materialize_inputs(
            store,
            &reqwest::Client::new(),
            &inputs(vec![("in.mp4", input)]),
            dir.path(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(dir.path().join("in.mp4")).unwrap(), b"from-s3");
    }

    #[tokio::test]
    async fn test_inline_wins_over_placeholder() {
        let dir = TempDir::new().unwrap();
        let input = Input {
            base64: STANDARD.encode(b"from-inline"),
            temporary: true,
            ..Input::default()
        };

        materialize_inputs(
            Arc::new(MemoryObjectStore::new()),
            &reqwest::Client::new(),
            &inputs(vec![("a.bin", input)]),
            dir.path(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), b"from-inline");
    }

    #[tokio::test]
    async fn test_missing_source_names_input() {
        let dir = TempDir::new().unwrap();
        let err = materialize_inputs(
            Arc::new(MemoryObjectStore::new()),
            &reqwest::Client::new(),
            &inputs(vec![("broken.mp4", Input::default())]),
            dir.path(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            &err,
            WorkerError::Input { name, source: InputError::MissingSource } if name == "broken.mp4"
        ));
        assert_eq!(err.to_string(), "input broken.mp4: input source missing");
    }

    #[tokio::test]
    async fn test_siblings_complete_despite_failure() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("s3://media/ok.mp4", b"ok".to_vec()).await.unwrap();

        let dir = TempDir::new().unwrap();
        let err = materialize_inputs(
            store,
            &reqwest::Client::new(),
            &inputs(vec![
                ("ok.mp4", Input::object("s3://media/ok.mp4")),
                ("missing.mp4", Input::object("s3://media/missing.mp4")),
                ("also-ok.txt", Input::inline(STANDARD.encode(b"x"))),
            ]),
            dir.path(),
            Some(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(&err, WorkerError::Input { name, .. } if name == "missing.mp4"));
        assert!(dir.path().join("ok.mp4").exists());
        assert!(dir.path().join("also-ok.txt").exists());
    }

    #[tokio::test]
    async fn test_http_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = materialize_inputs(
            Arc::new(MemoryObjectStore::new()),
            &reqwest::Client::new(),
            &inputs(vec![("a.mp4", Input::http(format!("{}/gone.mp4", server.uri())))]),
            dir.path(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Input { source: InputError::Http(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_base64_fails() {
        let dir = TempDir::new().unwrap();
        let err = materialize_inputs(
            Arc::new(MemoryObjectStore::new()),
            &reqwest::Client::new(),
            &inputs(vec![("a.bin", Input::inline("not base64!"))]),
            dir.path(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Input { source: InputError::Decode(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_rejects_names_outside_workspace() {
        for name in ["../escape.mp4", "nested/in.mp4", "..", ".", "", "a\\b"] {
            let dir = TempDir::new().unwrap();
            let err = materialize_inputs(
                Arc::new(MemoryObjectStore::new()),
                &reqwest::Client::new(),
                &inputs(vec![(name, Input::inline(STANDARD.encode(b"x")))]),
                dir.path(),
                None,
            )
            .await
            .unwrap_err();

            assert!(
                matches!(err, WorkerError::Input { source: InputError::InvalidName, .. }),
                "name {name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_no_inputs() {
        let dir = TempDir::new().unwrap();
        materialize_inputs(
            Arc::new(MemoryObjectStore::new()),
            &reqwest::Client::new(),
            &HashMap::new(),
            dir.path(),
            None,
        )
        .await
        .unwrap();
    }
}
