use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_channel::{Receiver, Sender};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{DynRouteFinder, DynSink},
    config::Config,
    entities::{success_rate, RouteRequest, RouteResult, RunSummary},
    error::Error,
    generator,
    processor::{Processor, RetryPolicy},
    storage::Storage,
};

#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    /// Artifact and index write failures. None of them stopped the run.
    pub persistence_errors: Vec<Error>,
    pub cancelled: bool,
}

/// Wires generation, dispatch and persistence for one batch.
pub struct Engine {
    config: Config,
    processor: Processor,
    storage: Arc<Storage>,
}

impl Engine {
    pub fn new(config: Config, finder: DynRouteFinder, sink: DynSink) -> Self {
        let processor = Processor::new(finder, config.workers(), config.attempt_timeout())
            .with_deadline(config.deadline());

        Self {
            config,
            processor,
            storage: Arc::new(Storage::new(sink)),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.processor = self.processor.with_retry_policy(policy);
        self
    }

    /// Generates the configured requests and runs them. Configuration errors
    /// surface here, before anything is dispatched.
    #[tracing::instrument(name = "Engine::run", skip_all)]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport, Error> {
        self.config.validate()?;
        let requests = generator::generate(&self.config)?;

        self.run_requests(requests, cancel).await
    }

    #[tracing::instrument(
        name = "Engine::run_requests",
        skip_all,
        fields(requests = requests.len())
    )]
    pub async fn run_requests(
        &self,
        requests: Vec<RouteRequest>,
        cancel: &CancellationToken,
    ) -> Result<RunReport, Error> {
        let started = Instant::now();

        let requests = Arc::new(requests);
        let slots: Arc<HashMap<u64, usize>> = Arc::new(
            requests
                .iter()
                .enumerate()
                .map(|(slot, request)| (request.id, slot))
                .collect(),
        );

        let (tx, rx): (Sender<RouteResult>, Receiver<RouteResult>) = async_channel::unbounded();

        // results are persisted while dispatch is still running
        let mut handles = vec![];
        for _ in 0..self.config.workers() {
            let rx = rx.clone();
            let storage = self.storage.clone();
            let requests = requests.clone();
            let slots = slots.clone();

            let handle = tokio::spawn(async move {
                while let Ok(result) = rx.recv().await {
                    let request = match slots.get(&result.id) {
                        Some(slot) => &requests[*slot],
                        None => {
                            tracing::warn!("result for unknown route {}", result.id);
                            continue;
                        }
                    };

                    if let Err(err) = storage.record_result(&result, request).await {
                        tracing::warn!("failed to save route {}: {}", result.id, err);
                    }
                }
            });

            handles.push(handle);
        }
        drop(rx);

        let dispatch = self.processor.submit(&requests, cancel, Some(tx)).await;

        for joined in futures::future::join_all(handles).await {
            if let Err(err) = joined {
                tracing::error!("persist worker stopped unexpectedly: {}", err);
            }
        }

        let mut persistence_errors = self.storage.persistence_errors().await;
        if !persistence_errors.is_empty() {
            tracing::warn!(
                "encountered {} errors while saving routes",
                persistence_errors.len()
            );
        }

        if let Err(err) = self.storage.finalize_index(&requests).await {
            tracing::error!("failed to save index: {}", err);
            persistence_errors.push(err);
        }

        let (successful, failed) = self.storage.counts().await;
        let summary = self
            .storage
            .finalize_summary(
                dispatch.results.len(),
                successful,
                failed,
                started.elapsed(),
                self.config.route_generator.method,
                self.config.run_context(),
            )
            .await?;

        tracing::info!(
            "saved {} routes ({} successful, {} failed)",
            summary.total_routes,
            successful,
            failed
        );
        tracing::info!(
            "success rate: {:.2}%",
            success_rate(successful, summary.total_routes)
        );

        Ok(RunReport {
            summary,
            persistence_errors,
            cancelled: dispatch.cancelled,
        })
    }
}
