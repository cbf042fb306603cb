//! Remote job execution.
//!
//! [`RemoteJobClient`] turns Redash's asynchronous job model into a single
//! awaitable call: upsert the persistent query text, submit it, poll the job with
//! a stepped backoff and fetch the result. Cancellation is cooperative and
//! observed while waiting between polls.

use crate::cache::QueryResultCache;
use crate::remote::{ControlPlane, Job, JobStatus, QueryHandle, ResultPayload, Submission};
use redash_error::{ErrorCode, RedashError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

/// Result of an operation that the caller may cancel. Cancellation is an
/// ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Delay before each status poll: 1s for the first five polls, then 2s, 3s,
/// and 4s from the sixteenth poll on.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollSchedule;

impl PollSchedule {
    pub fn delay(&self, poll: usize) -> Duration {
        let secs = match poll {
            0..=4 => 1,
            5..=9 => 2,
            10..=14 => 3,
            _ => 4,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Default)]
struct CancelState {
    requested: AtomicBool,
    notify: Notify,
}

/// Cloneable handle that requests cancellation of the in-flight execution.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.state.requested.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.state.requested.store(false, Ordering::SeqCst);
    }

    /// Consume a pending request.
    pub(crate) fn take(&self) -> bool {
        self.state.requested.swap(false, Ordering::SeqCst)
    }

    /// Sleep for `delay` unless cancellation arrives first. Returns true when a
    /// cancel request was consumed.
    async fn sleep_or_cancel(&self, delay: Duration) -> bool {
        let notified = self.state.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.take() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut notified => {}
        }
        self.take()
    }
}

pub struct RemoteJobClient {
    control_plane: Arc<dyn ControlPlane>,
    data_source_id: i64,
    /// Held for the whole upsert/submit/poll/fetch sequence: the server-side
    /// query object is shared, so executions must not interleave.
    query: Mutex<QueryHandle>,
    cache: Option<Arc<QueryResultCache>>,
    cancel: CancelHandle,
    schedule: PollSchedule,
}

impl RemoteJobClient {
    pub fn new(control_plane: Arc<dyn ControlPlane>, data_source_id: i64, query: QueryHandle) -> Self {
        Self {
            control_plane,
            data_source_id,
            query: Mutex::new(query),
            cache: None,
            cancel: CancelHandle::default(),
            schedule: PollSchedule,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn data_source_id(&self) -> i64 {
        self.data_source_id
    }

    pub fn cache(&self) -> Option<&Arc<QueryResultCache>> {
        self.cache.as_ref()
    }

    pub async fn query_handle(&self) -> QueryHandle {
        *self.query.lock().await
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request cancellation of the execution currently waiting on a job.
    pub fn cancel(&self) {
        info!(target: "jobs", "Cancellation requested");
        self.cancel.cancel();
    }

    /// Run `sql` on the server and wait for its result.
    pub async fn submit_and_wait(&self, sql: &str) -> Result<Outcome<ResultPayload>> {
        let mut query = self.query.lock().await;
        // A request left over from an earlier call must not cancel this one.
        self.cancel.reset();

        *query = self
            .control_plane
            .upsert_query(&query, self.data_source_id, sql)
            .await?;
        debug!(target: "jobs", query_id = query.id, version = query.version, "Query text updated");

        let job = match self.control_plane.submit(query.id).await? {
            Submission::Ready(payload) => {
                debug!(target: "jobs", query_id = query.id, "Server returned a stored result");
                return Ok(Outcome::Completed(payload));
            }
            Submission::Job(job) => job,
        };
        info!(target: "jobs", query_id = query.id, job_id = %job.id, "Job submitted");

        if self.wait_for_job(job).await?.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let payload = self.control_plane.query_result(query.id).await?;
        debug!(target: "jobs", query_id = query.id, rows = payload.row_count(), "Result fetched");
        Ok(Outcome::Completed(payload))
    }

    async fn wait_for_job(&self, mut job: Job) -> Result<Outcome<()>> {
        let mut polls = 0usize;
        loop {
            match job.status {
                JobStatus::Succeeded => {
                    info!(target: "jobs", job_id = %job.id, polls, "Job succeeded");
                    return Ok(Outcome::Completed(()));
                }
                JobStatus::Failed => {
                    let error = job.failure();
                    warn!(target: "jobs", job_id = %job.id, error = %error.message, "Job failed");
                    return Err(error);
                }
                JobStatus::Cancelled => {
                    warn!(target: "jobs", job_id = %job.id, "Job was cancelled on the server");
                    return Err(RedashError::new(
                        ErrorCode::RemoteJobCancelled,
                        format!("Job {} was cancelled on the server", job.id),
                    )
                    .with_context(redash_error::ErrorContext::Execution {
                        job_id: Some(job.id.clone()),
                        remote_code: None,
                    }));
                }
                JobStatus::Pending | JobStatus::Running => {}
            }

            if self.cancel.sleep_or_cancel(self.schedule.delay(polls)).await {
                info!(target: "jobs", job_id = %job.id, polls, "Stopped waiting for job");
                return Ok(Outcome::Cancelled);
            }

            job = self.control_plane.job(&job.id).await?;
            polls += 1;
            debug!(target: "jobs", job_id = %job.id, status = ?job.status, polls, "Polled job");
        }
    }

    /// Like [`submit_and_wait`](Self::submit_and_wait), but serves a fresh cached
    /// result when one exists and records new results in the cache.
    pub async fn execute_query(&self, sql: &str) -> Result<Outcome<ResultPayload>> {
        if let Some(cache) = &self.cache {
            if let Some(result_id) = cache.check_and_get(sql).await {
                match self.control_plane.result_by_id(result_id).await {
                    Ok(payload) => return Ok(Outcome::Completed(payload)),
                    Err(e) => {
                        warn!(
                            target: "cache",
                            result_id,
                            error = %e,
                            "Cached result could not be fetched, resubmitting"
                        );
                        cache.invalidate(sql).await;
                    }
                }
            }
        }

        let outcome = self.submit_and_wait(sql).await?;

        if let (Some(cache), Outcome::Completed(payload)) = (&self.cache, &outcome) {
            match payload.id {
                Some(result_id) => cache.put(sql, result_id).await,
                None => debug!(target: "cache", "Result has no id, not caching"),
            }
        }
        Ok(outcome)
    }
}
