use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::{
    api::DynSink,
    entities::{Method, RouteData, RouteMetadata, RouteRequest, RouteResult, RunContext, RunSummary},
    error::{invalid_state_error, persistence_error, Error},
};

pub const INDEX_KEY: &str = "metadata.json";
pub const SUMMARY_KEY: &str = "summary.json";

pub fn route_key(id: u64) -> String {
    format!("route_{:06}.json", id)
}

#[derive(Debug, Default)]
struct State {
    metadata: BTreeMap<u64, RouteMetadata>,
    successful: usize,
    failed: usize,
    errors: Vec<Error>,
    index_written: bool,
    summary_written: bool,
}

/// Persists results as they arrive and writes the index and summary at the end.
///
/// `record_result` may be called from many tasks at once. `finalize_index`
/// must only run after every result of the batch has been recorded.
pub struct Storage {
    sink: DynSink,
    state: Mutex<State>,
}

impl Storage {
    pub fn new(sink: DynSink) -> Self {
        Self {
            sink,
            state: Mutex::new(State::default()),
        }
    }

    /// Records `result` and writes its artifact.
    ///
    /// The metadata entry and counters are updated even when the artifact
    /// write fails; the failure is kept for `persistence_errors` and returned.
    #[tracing::instrument(skip_all, fields(id = result.id))]
    pub async fn record_result(
        &self,
        result: &RouteResult,
        request: &RouteRequest,
    ) -> Result<(), Error> {
        if result.id != request.id {
            return Err(invalid_state_error(format!(
                "result {} recorded against request {}",
                result.id, request.id
            )));
        }

        let metadata = RouteMetadata::new(request, result);

        {
            let mut state = self.state.lock().await;

            if state.metadata.contains_key(&request.id) {
                return Err(invalid_state_error(format!(
                    "route {} already recorded",
                    request.id
                )));
            }

            if metadata.success {
                state.successful += 1;
            } else {
                state.failed += 1;
            }
            state.metadata.insert(request.id, metadata.clone());
        }

        let data = RouteData {
            metadata,
            route: result.route.clone(),
        };

        let written = match serde_json::to_vec_pretty(&data) {
            Ok(bytes) => self.sink.write(&route_key(request.id), bytes).await,
            Err(err) => Err(persistence_error(err)),
        };

        if let Err(err) = written {
            self.state.lock().await.errors.push(err.clone());
            return Err(err);
        }

        Ok(())
    }

    /// `(successful, failed)` so far.
    pub async fn counts(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.successful, state.failed)
    }

    pub async fn persistence_errors(&self) -> Vec<Error> {
        self.state.lock().await.errors.clone()
    }

    /// Writes the metadata of every request, ordered by id. Fails if any
    /// request has no recorded result or if the index was already written.
    #[tracing::instrument(skip_all)]
    pub async fn finalize_index(
        &self,
        requests: &[RouteRequest],
    ) -> Result<Vec<RouteMetadata>, Error> {
        let index: Vec<RouteMetadata> = {
            let mut state = self.state.lock().await;

            if state.index_written {
                return Err(invalid_state_error("index already written"));
            }

            let missing = requests
                .iter()
                .filter(|request| !state.metadata.contains_key(&request.id))
                .count();
            if missing > 0 || state.metadata.len() != requests.len() {
                return Err(invalid_state_error(format!(
                    "index incomplete: {} of {} requests recorded",
                    state.metadata.len(),
                    requests.len()
                )));
            }

            state.index_written = true;
            state.metadata.values().cloned().collect()
        };

        let bytes = serde_json::to_vec_pretty(&index).map_err(persistence_error)?;
        self.sink.write(INDEX_KEY, bytes).await?;

        tracing::info!("wrote index with {} entries", index.len());

        Ok(index)
    }

    #[tracing::instrument(skip(self, context))]
    pub async fn finalize_summary(
        &self,
        total: usize,
        successful: usize,
        failed: usize,
        elapsed: Duration,
        method: Method,
        context: RunContext,
    ) -> Result<RunSummary, Error> {
        {
            let mut state = self.state.lock().await;
            if state.summary_written {
                return Err(invalid_state_error("summary already written"));
            }
            state.summary_written = true;
        }

        let summary = RunSummary::new(total, successful, failed, elapsed, method, context);

        let bytes = serde_json::to_vec_pretty(&summary).map_err(persistence_error)?;
        self.sink.write(SUMMARY_KEY, bytes).await?;

        Ok(summary)
    }
}
