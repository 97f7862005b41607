use std::time::Duration;

use async_channel::{Receiver, Sender};
use tokio_util::sync::CancellationToken;

use crate::{
    api::DynRouteFinder,
    entities::{Route, RouteQuery, RouteRequest, RouteResponse, RouteResult, CODE_NO_ROUTE, CODE_OK},
    error::{cancelled_error, route_not_found_error, unexpected_error, upstream_error, Error},
};

pub const MAX_ATTEMPTS: u32 = 3;
pub const BASE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_backoff: BASE_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Delay after a failed `attempt` (1-based): `base * 2^(attempt - 1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff.saturating_mul(factor)
    }
}

/// How a single call to the route service ended.
#[derive(Debug)]
enum Attempt {
    Success(Route),
    NoRoute,
    Retryable(Error),
}

fn classify(outcome: Result<RouteResponse, Error>) -> Attempt {
    let response = match outcome {
        Ok(response) => response,
        Err(err) if err.is_route_not_found() => return Attempt::NoRoute,
        Err(err) => return Attempt::Retryable(err),
    };

    match response.code.as_str() {
        CODE_OK => match response.routes.into_iter().next() {
            Some(route) => Attempt::Success(route),
            None => Attempt::Retryable(upstream_error("route service returned no routes")),
        },
        CODE_NO_ROUTE => Attempt::NoRoute,
        code => Attempt::Retryable(upstream_error(format!(
            "route service returned {}: {}",
            code,
            response.message.unwrap_or_default()
        ))),
    }
}

fn cancelled_result(id: u64, attempts: u32, last_error: Option<Error>) -> RouteResult {
    let error = match last_error {
        Some(err) => cancelled_error(format!(
            "cancelled after {} attempts: {}",
            attempts, err.message
        )),
        None => cancelled_error("cancelled before dispatch"),
    };

    RouteResult::failure(id, error, attempts)
}

/// Results of one `submit`, indexed like the input.
#[derive(Debug)]
pub struct Dispatch {
    pub results: Vec<RouteResult>,
    pub cancelled: bool,
}

/// Dispatches route requests to the route service through a fixed pool of workers.
///
/// The pool size is the system-wide cap on simultaneous calls: each worker
/// has at most one call in flight, including during its retries.
#[derive(Clone)]
pub struct Processor {
    finder: DynRouteFinder,
    workers: usize,
    attempt_timeout: Duration,
    deadline: Option<Duration>,
    policy: RetryPolicy,
}

impl Processor {
    pub fn new(finder: DynRouteFinder, workers: usize, attempt_timeout: Duration) -> Self {
        Self {
            finder,
            workers: workers.max(1),
            attempt_timeout,
            deadline: None,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs the retry loop for one request. Never fails: every outcome,
    /// including exhausted retries and cancellation, becomes a `RouteResult`.
    #[tracing::instrument(skip(self, request, cancel), fields(id = request.id))]
    pub async fn process_route(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> RouteResult {
        let query = RouteQuery::from(request);
        let mut last_error: Option<Error> = None;

        for attempt in 1..=self.policy.max_attempts {
            if cancel.is_cancelled() {
                return cancelled_result(request.id, attempt - 1, last_error);
            }

            let outcome =
                match tokio::time::timeout(self.attempt_timeout, self.finder.find_route(&query))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(elapsed) => Err(elapsed.into()),
                };

            let err = match classify(outcome) {
                Attempt::Success(route) => {
                    tracing::info!(
                        "route {} succeeded on attempt {}: {:.6},{:.6} -> {:.6},{:.6}",
                        request.id,
                        attempt,
                        request.start.latitude,
                        request.start.longitude,
                        request.end.latitude,
                        request.end.longitude
                    );
                    return RouteResult::success(request.id, route, attempt);
                }
                Attempt::NoRoute => {
                    tracing::info!("route {}: no route found", request.id);
                    return RouteResult::failure(request.id, route_not_found_error(), attempt);
                }
                Attempt::Retryable(err) => err,
            };

            if attempt == self.policy.max_attempts {
                tracing::warn!(
                    "route {} failed after {} attempts: {}",
                    request.id,
                    attempt,
                    err
                );
                return RouteResult::failure(request.id, err, attempt);
            }

            let backoff = self.policy.backoff(attempt);
            tracing::warn!(
                "route {} attempt {} failed, retrying in {:?}: {}",
                request.id,
                attempt,
                backoff,
                err
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return cancelled_result(request.id, attempt, Some(err));
                }
                _ = tokio::time::sleep(backoff) => {}
            }

            last_error = Some(err);
        }

        RouteResult::failure(
            request.id,
            last_error.unwrap_or_else(|| unexpected_error("retry loop ended without an attempt")),
            self.policy.max_attempts,
        )
    }

    /// Processes every request and returns exactly one result per request,
    /// in input order.
    ///
    /// Each result is also sent on `stream` as soon as it is known, so a
    /// consumer can persist incrementally. Once `cancel` fires (or the
    /// deadline passes) no new request is dispatched; requests still queued
    /// get a cancelled result.
    #[tracing::instrument(skip_all, fields(requests = requests.len(), workers = self.workers))]
    pub async fn submit(
        &self,
        requests: &[RouteRequest],
        cancel: &CancellationToken,
        stream: Option<Sender<RouteResult>>,
    ) -> Dispatch {
        let cancel = cancel.child_token();

        let deadline = self.deadline.map(|deadline| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::warn!("deadline of {:?} reached, stopping dispatch", deadline);
                cancel.cancel();
            })
        });

        let (tx, rx): (Sender<(usize, RouteRequest)>, Receiver<(usize, RouteRequest)>) =
            async_channel::unbounded();

        for (slot, request) in requests.iter().enumerate() {
            // the receiver is alive, the queue is unbounded
            let _ = tx.try_send((slot, request.clone()));
        }
        tx.close();

        let mut handles = vec![];
        for worker in 0..self.workers.min(requests.len()) {
            let rx = rx.clone();
            let processor = self.clone();
            let cancel = cancel.clone();
            let stream = stream.clone();

            let handle = tokio::spawn(async move {
                let mut done = vec![];

                loop {
                    let (slot, request) = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        next = rx.recv() => match next {
                            Ok(next) => next,
                            Err(_) => break,
                        },
                    };

                    let result = processor.process_route(&request, &cancel).await;

                    if let Some(stream) = &stream {
                        if stream.send(result.clone()).await.is_err() {
                            tracing::warn!("worker {}: result stream closed", worker);
                        }
                    }

                    done.push((slot, result));
                }

                done
            });

            handles.push(handle);
        }

        let mut slots: Vec<Option<RouteResult>> = vec![None; requests.len()];
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(done) => {
                    for (slot, result) in done {
                        slots[slot] = Some(result);
                    }
                }
                Err(err) => tracing::error!("worker stopped unexpectedly: {}", err),
            }
        }

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        let cancelled = cancel.is_cancelled();
        let mut results = Vec::with_capacity(requests.len());

        for (slot, request) in requests.iter().enumerate() {
            let result = match slots[slot].take() {
                Some(result) => result,
                None => {
                    let result = if cancelled {
                        cancelled_result(request.id, 0, None)
                    } else {
                        RouteResult::failure(
                            request.id,
                            unexpected_error("worker stopped before processing request"),
                            0,
                        )
                    };

                    if let Some(stream) = &stream {
                        if stream.send(result.clone()).await.is_err() {
                            tracing::warn!("result stream closed before route {}", request.id);
                        }
                    }

                    result
                }
            };

            results.push(result);
        }

        tracing::info!(
            "dispatch finished: {} results, cancelled: {}",
            results.len(),
            cancelled
        );

        Dispatch { results, cancelled }
    }
}
