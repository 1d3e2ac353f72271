//! In-process notification dispatch queue.
//!
//! Callers enqueue interview-result notifications and get a task id back
//! immediately. A single worker wakes up every `tick_interval`, takes up to
//! `batch_size` pending tasks in enqueue order and delivers them one at a time,
//! pausing `send_delay` between sends. Failed sends go back to `Pending` until
//! the task has used `max_attempts`, after which it stays `Failed` until an
//! administrator calls [`NotificationQueue::retry_failed`].
//!
//! Only one tick runs at a time: a tick that fires while the previous one is
//! still sending is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use hireflow_common::config::AppConfig;
use hireflow_common::types::NotificationPayload;

use crate::task::{DeliveryError, NotificationTask, TaskId, TaskState};
use crate::template::TemplateEngine;
use crate::transport::{MailTransport, OutgoingEmail, TransportError};

/// Default interval between ticks (2 seconds).
const DEFAULT_TICK_INTERVAL_MS: u64 = 2000;

/// Default number of tasks attempted per tick.
const DEFAULT_BATCH_SIZE: usize = 10;

/// Default delivery attempts before a task is marked failed.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between two sends of the same tick.
const DEFAULT_SEND_DELAY_MS: u64 = 500;

/// Default upper bound on a single send.
const DEFAULT_SEND_TIMEOUT_MS: u64 = 10_000;

/// Construction parameters for [`NotificationQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub tick_interval: Duration,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub send_delay: Duration,
    pub send_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            send_delay: Duration::from_millis(DEFAULT_SEND_DELAY_MS),
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
        }
    }
}

impl QueueConfig {
    /// Build the queue configuration from the `QUEUE_*` settings.
    pub fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        let queue_config = Self {
            tick_interval: Duration::from_millis(config.queue_tick_interval_ms),
            batch_size: config.queue_batch_size,
            max_attempts: config.queue_max_attempts,
            send_delay: Duration::from_millis(config.queue_send_delay_ms),
            send_timeout: Duration::from_millis(config.queue_send_timeout_ms),
        };
        queue_config.validate()?;
        Ok(queue_config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_interval.is_zero() {
            anyhow::bail!("QUEUE_TICK_INTERVAL_MS must be greater than zero");
        }
        if self.batch_size == 0 {
            anyhow::bail!("QUEUE_BATCH_SIZE must be greater than zero");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("QUEUE_MAX_ATTEMPTS must be greater than zero");
        }
        if self.send_timeout.is_zero() {
            anyhow::bail!("QUEUE_SEND_TIMEOUT_MS must be greater than zero");
        }
        Ok(())
    }
}

/// Point-in-time counts over the live task set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub total: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub completed: usize,
    pub failed: usize,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Sends started during the tick
    pub attempted: usize,
    pub delivered: usize,
    /// Failed sends that went back to `Pending`
    pub retried: usize,
    /// Failed sends that exhausted the attempt budget
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still processing
    Skipped,
    Processed(TickReport),
}

/// Marks a tick as running; cleared on drop so a cancelled tick never wedges the queue.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to the spawned tick loop.
struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Timer-driven notification queue with bounded retries.
pub struct NotificationQueue<T> {
    config: QueueConfig,
    transport: T,
    templates: TemplateEngine,
    tasks: Mutex<Vec<NotificationTask>>,
    processing: AtomicBool,
    worker: Mutex<Option<Worker>>,
}

impl<T: MailTransport> NotificationQueue<T> {
    pub fn new(config: QueueConfig, transport: T) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            transport,
            templates: TemplateEngine::new()?,
            tasks: Mutex::new(Vec::new()),
            processing: AtomicBool::new(false),
            worker: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Accept a notification for delivery and return its task id.
    pub fn enqueue(&self, payload: NotificationPayload) -> TaskId {
        let task = NotificationTask::new(payload);
        let id = task.id;
        self.lock_tasks().push(task);

        tracing::debug!(task_id = %id, "Notification enqueued");
        id
    }

    /// Enqueue every payload in order. Ids are returned in the same order.
    pub fn enqueue_batch(&self, payloads: Vec<NotificationPayload>) -> Vec<TaskId> {
        let new_tasks: Vec<NotificationTask> =
            payloads.into_iter().map(NotificationTask::new).collect();
        let ids: Vec<TaskId> = new_tasks.iter().map(|task| task.id).collect();
        self.lock_tasks().extend(new_tasks);

        tracing::info!(count = ids.len(), "Notification batch enqueued");
        ids
    }

    /// Count tasks per state.
    pub fn status(&self) -> QueueStatus {
        let tasks = self.lock_tasks();
        let mut status = QueueStatus {
            total: tasks.len(),
            ..QueueStatus::default()
        };
        for task in tasks.iter() {
            match task.state {
                TaskState::Pending => status.pending += 1,
                TaskState::InFlight => status.in_flight += 1,
                TaskState::Completed => status.completed += 1,
                TaskState::Failed => status.failed += 1,
            }
        }
        status
    }

    /// Snapshot of live tasks in insertion order, optionally truncated.
    pub fn list_tasks(&self, limit: Option<usize>) -> Vec<NotificationTask> {
        let tasks = self.lock_tasks();
        let limit = limit.unwrap_or(tasks.len());
        tasks.iter().take(limit).cloned().collect()
    }

    /// Give every failed task a fresh attempt budget. Returns how many were reset.
    pub fn retry_failed(&self) -> usize {
        let mut tasks = self.lock_tasks();
        let mut reset = 0;
        for task in tasks.iter_mut().filter(|t| t.state == TaskState::Failed) {
            task.reset_for_retry();
            reset += 1;
        }
        drop(tasks);

        if reset > 0 {
            tracing::info!(reset, "Failed notifications queued for retry");
        }
        reset
    }

    /// Drop every task. A send already in progress is not interrupted; its
    /// result is discarded.
    pub fn clear(&self) -> usize {
        let cleared = std::mem::take(&mut *self.lock_tasks()).len();
        tracing::warn!(cleared, "Notification queue cleared");
        cleared
    }

    /// Run one tick now.
    pub async fn process_tick(&self) -> TickOutcome {
        self.run_tick(None).await
    }

    async fn run_tick(&self, stop: Option<&watch::Receiver<bool>>) -> TickOutcome {
        let Some(_guard) = ProcessingGuard::acquire(&self.processing) else {
            tracing::debug!("Previous tick still processing, skipping");
            return TickOutcome::Skipped;
        };

        let batch = self.select_batch();
        let mut report = TickReport::default();

        for (index, &task_id) in batch.iter().enumerate() {
            if index > 0 && !self.config.send_delay.is_zero() {
                tokio::time::sleep(self.config.send_delay).await;
            }
            if stop.is_some_and(|rx| *rx.borrow()) {
                tracing::debug!(
                    remaining = batch.len() - index,
                    "Queue stopping, leaving rest of batch pending"
                );
                break;
            }

            let Some(payload) = self.claim(task_id) else {
                continue;
            };
            report.attempted += 1;

            let result = match self.templates.render(&payload) {
                Ok(email) => self.deliver(&email).await,
                Err(e) => Err(TransportError::Config(format!("{:#}", e))),
            };

            match self.settle(task_id, result) {
                Some(TaskState::Completed) => report.delivered += 1,
                Some(TaskState::Pending) => report.retried += 1,
                Some(TaskState::Failed) => report.failed += 1,
                Some(TaskState::InFlight) | None => {}
            }
        }

        if report.attempted > 0 {
            tracing::debug!(
                attempted = report.attempted,
                delivered = report.delivered,
                retried = report.retried,
                failed = report.failed,
                "Notification tick finished"
            );
        }

        TickOutcome::Processed(report)
    }

    /// Hand one email to the transport, bounded by the send timeout.
    async fn deliver(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        match tokio::time::timeout(self.config.send_timeout, self.transport.send(email)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.config.send_timeout)),
        }
    }

    /// Ids of the oldest pending tasks, up to the batch size.
    fn select_batch(&self) -> Vec<TaskId> {
        self.lock_tasks()
            .iter()
            .filter(|task| task.state == TaskState::Pending)
            .take(self.config.batch_size)
            .map(|task| task.id)
            .collect()
    }

    /// Move a pending task to `InFlight` and hand back its payload.
    ///
    /// Returns `None` when the task was cleared or retried away since selection.
    fn claim(&self, task_id: TaskId) -> Option<NotificationPayload> {
        let mut tasks = self.lock_tasks();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == task_id && task.state == TaskState::Pending)?;
        task.begin_attempt();
        Some(task.payload.clone())
    }

    /// Apply a send result to the task. Returns the state it ended up in.
    fn settle(&self, task_id: TaskId, result: Result<(), TransportError>) -> Option<TaskState> {
        let mut tasks = self.lock_tasks();
        let Some(position) = tasks.iter().position(|task| task.id == task_id) else {
            tracing::warn!(
                task_id = %task_id,
                delivered = result.is_ok(),
                "Task removed while in flight, discarding send result"
            );
            return None;
        };

        match result {
            Ok(()) => {
                let mut task = tasks.remove(position);
                task.mark_delivered();
                tracing::info!(
                    task_id = %task_id,
                    interview_id = %task.payload.interview_id,
                    attempts = task.attempts,
                    transport = self.transport.name(),
                    "Notification delivered"
                );
                Some(task.state)
            }
            Err(err) => {
                let task = &mut tasks[position];
                let state = task.mark_attempt_failed(DeliveryError::from(&err), self.config.max_attempts);
                if state == TaskState::Failed {
                    tracing::error!(
                        task_id = %task_id,
                        interview_id = %task.payload.interview_id,
                        attempts = task.attempts,
                        error = %err,
                        "Notification failed permanently"
                    );
                } else {
                    tracing::warn!(
                        task_id = %task_id,
                        attempts = task.attempts,
                        max_attempts = self.config.max_attempts,
                        error = %err,
                        "Notification send failed, will retry"
                    );
                }
                Some(state)
            }
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<NotificationTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the periodic worker is currently running.
    pub fn is_running(&self) -> bool {
        self.lock_worker()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Stop the periodic worker. A send already in progress still completes.
    /// Returns `false` if the worker was not running.
    pub fn stop(&self) -> bool {
        let Some(worker) = self.lock_worker().take() else {
            return false;
        };
        worker.stop_tx.send_replace(true);
        tracing::info!("Notification queue stop requested");
        true
    }

    /// Stop the periodic worker and wait for it to exit.
    pub async fn shutdown(&self) {
        let Some(worker) = self.lock_worker().take() else {
            return;
        };
        worker.stop_tx.send_replace(true);
        if let Err(e) = worker.handle.await {
            tracing::error!(error = %e, "Notification queue worker panicked");
        }
    }
}

impl<T: MailTransport + 'static> NotificationQueue<T> {
    /// Spawn the periodic worker. Returns `false` if it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut worker = self.lock_worker();
        if worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
        {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let queue = Arc::clone(self);
        let handle = tokio::spawn(async move { queue.run_worker(stop_rx).await });
        *worker = Some(Worker { stop_tx, handle });

        tracing::info!(
            tick_interval = ?self.config.tick_interval,
            batch_size = self.config.batch_size,
            max_attempts = self.config.max_attempts,
            transport = self.transport.name(),
            "Notification queue started"
        );
        true
    }

    async fn run_worker(&self, mut stop_rx: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(self.config.tick_interval.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.run_tick(Some(&stop_rx)).await;
                }
            }
        }

        tracing::info!("Notification queue stopped");
    }
}
