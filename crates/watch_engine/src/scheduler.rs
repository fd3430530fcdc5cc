use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::{timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use watch_core::{evaluate, JobId, JobStore, JobSubmission, ValidationError, WatchJob};
use watch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::{ContentFetcher, DispatchError, FailureKind, FetchError, WebhookDispatcher};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub dispatch_timeout: Duration,
    /// Source of check timestamps.
    pub now: Clock,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            dispatch_timeout: Duration::from_secs(10),
            now: Arc::new(Utc::now),
        }
    }
}

/// Jobs handled by one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub checked: Vec<JobId>,
    /// Pollable jobs left alone because their previous check is still running.
    pub skipped: Vec<JobId>,
}

/// Owns the job store and polls every Monitoring or Error job once per tick.
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    store: Mutex<JobStore>,
    in_flight: Mutex<HashSet<JobId>>,
    fetcher: Arc<dyn ContentFetcher>,
    dispatcher: Arc<dyn WebhookDispatcher>,
    config: SchedulerConfig,
    wake: Notify,
    ticks: AtomicU64,
}

impl Scheduler {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        dispatcher: Arc<dyn WebhookDispatcher>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(JobStore::new()),
                in_flight: Mutex::new(HashSet::new()),
                fetcher,
                dispatcher,
                config,
                wake: Notify::new(),
                ticks: AtomicU64::new(0),
            }),
        }
    }

    /// Adds a job and requests an immediate tick.
    pub fn submit(&self, submission: JobSubmission) -> Result<JobId, ValidationError> {
        let id = self.inner.store().add(submission)?;
        if let Some(job) = self.job(id) {
            watch_info!(
                "Job {} added url={} selector={}",
                id,
                job.url,
                job.selector_description()
            );
        }
        self.inner.wake.notify_one();
        Ok(id)
    }

    /// Removes a job; a check still running for it is discarded when it
    /// completes. Returns false if the id was unknown.
    pub fn remove(&self, id: JobId) -> bool {
        let removed = self.inner.store().remove(id).is_some();
        if removed {
            watch_info!("Job {} removed", id);
            self.inner.wake.notify_one();
        }
        removed
    }

    pub fn job(&self, id: JobId) -> Option<WatchJob> {
        self.inner.store().get(id).cloned()
    }

    pub fn jobs(&self) -> Vec<WatchJob> {
        self.inner.store().iter().cloned().collect()
    }

    /// Asks a running [`Scheduler::run`] loop for an immediate tick.
    pub fn request_tick(&self) {
        self.inner.wake.notify_one();
    }

    /// Runs one polling pass and waits for its checks to finish.
    pub async fn tick(&self) -> TickSummary {
        let tick = self.inner.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let candidates: Vec<JobId> = self
            .inner
            .store()
            .pollable()
            .into_iter()
            .map(|job| job.id)
            .collect();

        let mut summary = TickSummary::default();
        let mut checks = JoinSet::new();
        for id in candidates {
            let Some(guard) = InFlightGuard::claim(&self.inner, id) else {
                watch_debug!("Tick {}: job {} still in flight, skipping", tick, id);
                summary.skipped.push(id);
                continue;
            };
            // Re-read under the claim so the check starts from the latest record.
            let job = self
                .inner
                .store()
                .get(id)
                .filter(|job| job.status.is_pollable())
                .cloned();
            let Some(job) = job else {
                continue;
            };
            summary.checked.push(id);
            let inner = self.inner.clone();
            checks.spawn(async move {
                let _guard = guard;
                inner.check_job(job).await;
            });
        }

        while let Some(joined) = checks.join_next().await {
            if let Err(err) = joined {
                watch_error!("Tick {}: check task failed: {}", tick, err);
            }
        }

        watch_info!(
            "Tick {}: checked {} job(s), skipped {}",
            tick,
            summary.checked.len(),
            summary.skipped.len()
        );
        summary
    }

    /// Ticks on startup, every poll interval, and whenever the job set
    /// changes, until `shutdown` is cancelled. A change tick restarts the
    /// interval. Ticks run as separate tasks so a slow check never delays the
    /// next tick.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.inner.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = JoinSet::new();

        watch_info!(
            "Scheduler started, polling every {:?}",
            self.inner.config.poll_interval
        );
        // The first interval tick completes at once and is the startup tick;
        // it already covers jobs submitted before the loop started.
        interval.tick().await;
        self.inner.wake.notified().now_or_never();
        loop {
            while ticks.try_join_next().is_some() {}
            let scheduler = self.clone();
            ticks.spawn(async move {
                scheduler.tick().await;
            });

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
                _ = self.inner.wake.notified() => interval.reset(),
            }
        }

        ticks.shutdown().await;
        watch_info!("Scheduler stopped");
    }
}

impl Inner {
    fn store(&self) -> MutexGuard<'_, JobStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<JobId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> DateTime<Utc> {
        (self.config.now)()
    }

    fn contains(&self, id: JobId) -> bool {
        self.store().get(id).is_some()
    }

    /// Fetch, evaluate, maybe dispatch, then store the next record in one
    /// replace.
    async fn check_job(&self, job: WatchJob) {
        let id = job.id;
        let next = match self.fetch(&job).await {
            Err(err) => {
                watch_warn!("Job {} fetch failed: {}", id, err);
                job.after_fetch_failure(&err.to_string(), self.now())
            }
            Ok(fragments) => {
                let evaluation = evaluate(&job, &fragments);
                let mut dispatch_failure = None;
                if evaluation.should_fire {
                    if !self.contains(id) {
                        watch_debug!("Job {} removed before dispatch, discarding", id);
                        return;
                    }
                    match self
                        .dispatch(&job, job.last_content.as_deref(), evaluation.content.as_deref())
                        .await
                    {
                        Ok(()) => watch_info!("Job {} triggered, webhook delivered", id),
                        Err(err) => {
                            watch_warn!("Job {} webhook dispatch failed: {}", id, err);
                            dispatch_failure = Some(err.to_string());
                        }
                    }
                }
                job.after_evaluation(evaluation, dispatch_failure.as_deref(), self.now())
            }
        };

        if !self.store().replace(next) {
            watch_debug!("Job {} removed while in flight, discarding result", id);
        }
    }

    async fn fetch(&self, job: &WatchJob) -> Result<Vec<String>, FetchError> {
        let limit = self.config.fetch_timeout;
        let selector = job.selector();
        match timeout(limit, self.fetcher.fetch(&job.url, &selector)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                FailureKind::Timeout,
                format!("no response within {limit:?}"),
            )),
        }
    }

    async fn dispatch(
        &self,
        job: &WatchJob,
        previous: Option<&str>,
        current: Option<&str>,
    ) -> Result<(), DispatchError> {
        let call = self.dispatcher.dispatch(job, previous, current);
        match timeout(self.config.dispatch_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout),
        }
    }
}

/// Marks a job as having a check in flight until dropped.
struct InFlightGuard {
    inner: Arc<Inner>,
    id: JobId,
}

impl InFlightGuard {
    fn claim(inner: &Arc<Inner>, id: JobId) -> Option<Self> {
        inner.in_flight().insert(id).then(|| Self {
            inner: inner.clone(),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight().remove(&self.id);
    }
}
