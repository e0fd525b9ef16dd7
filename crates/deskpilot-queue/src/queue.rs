//! The task queue.
//!
//! Pending tasks are kept in a `VecDeque` ordered by priority (descending)
//! and arrival (ascending within a priority). All mutations of the pending
//! set, running set and history happen under one mutex; payloads run on
//! their own Tokio tasks outside it.
//!
//! There is no starvation guarantee: a steady stream of higher-priority
//! submissions can hold back a low-priority task indefinitely. Payloads are
//! not timed out; a hung payload occupies its slot until it returns.

use deskpilot_core::config::QueueConfig;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::QueueError;
use crate::types::{QueueStats, TaskRecord, TaskStatus};

type TaskFuture = Pin<Box<dyn Future<Output = Result<Value, String>> + Send>>;
type TaskPayload = Box<dyn FnOnce() -> TaskFuture + Send>;

struct PendingTask {
    record: TaskRecord,
    payload: TaskPayload,
}

struct QueueState {
    pending: VecDeque<PendingTask>,
    running: HashMap<Uuid, TaskRecord>,
    history: VecDeque<TaskRecord>,
    paused: bool,
    max_concurrent: usize,
    history_limit: usize,
    pass_scheduled: bool,
    completed: u64,
    failed: u64,
    cancelled: u64,
    completed_duration_total_ms: u64,
}

impl QueueState {
    fn record_terminal(&mut self, record: TaskRecord) {
        match record.status {
            TaskStatus::Completed => {
                self.completed += 1;
                self.completed_duration_total_ms += record.duration_ms.unwrap_or(0);
            }
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
            TaskStatus::Queued | TaskStatus::Running => {}
        }
        self.history.push_back(record);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    fn is_idle(&self) -> bool {
        self.running.is_empty() && (self.pending.is_empty() || self.paused)
    }
}

struct Shared {
    state: Mutex<QueueState>,
    /// Bumped after every state change; waiters subscribe to it.
    changed: watch::Sender<u64>,
}

enum Lookup {
    Terminal(TaskRecord),
    InFlight,
    Missing,
}

/// Priority queue of deferred work with bounded concurrency.
///
/// Cloning is cheap and yields a handle to the same queue. Methods that
/// trigger scheduling must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<Shared>,
}

impl TaskQueue {
    /// Create a queue from configuration.
    pub fn new(config: &QueueConfig) -> Self {
        let (changed, _) = watch::channel(0);
        let state = QueueState {
            pending: VecDeque::new(),
            running: HashMap::new(),
            history: VecDeque::new(),
            paused: false,
            max_concurrent: config.max_concurrent.max(1),
            history_limit: config.history_limit.max(1),
            pass_scheduled: false,
            completed: 0,
            failed: 0,
            cancelled: 0,
            completed_duration_total_ms: 0,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                changed,
            }),
        }
    }

    /// Create a queue with default history retention and the given ceiling.
    pub fn with_max_concurrent(max_concurrent: usize) -> Self {
        Self::new(&QueueConfig {
            max_concurrent,
            ..QueueConfig::default()
        })
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        self.shared.changed.send_modify(|gen| *gen = gen.wrapping_add(1));
    }

    /// Submit a payload. Higher `priority` runs first.
    ///
    /// The scheduling pass runs on the runtime after this returns, so tasks
    /// submitted back-to-back from one synchronous stretch of code are
    /// ordered by priority before any of them starts.
    pub fn add<F, Fut, E>(&self, payload: F, priority: i32) -> Uuid
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.enqueue(None, box_payload(payload), priority)
    }

    /// Submit a payload with a display name kept on its record.
    pub fn add_named<F, Fut, E>(&self, name: impl Into<String>, payload: F, priority: i32) -> Uuid
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.enqueue(Some(name.into()), box_payload(payload), priority)
    }

    fn enqueue(&self, name: Option<String>, payload: TaskPayload, priority: i32) -> Uuid {
        let record = TaskRecord::queued(name, priority);
        let id = record.id;
        {
            let mut state = self.lock();
            // Before the first strictly lower priority: stable for ties.
            let position = state
                .pending
                .iter()
                .position(|t| t.record.priority < priority)
                .unwrap_or(state.pending.len());
            state.pending.insert(position, PendingTask { record, payload });
            tracing::debug!(task_id = %id, priority, position, "Task queued");
        }
        self.notify();
        self.schedule();
        id
    }

    /// Request a scheduling pass unless one is already pending.
    fn schedule(&self) {
        {
            let mut state = self.lock();
            if state.pass_scheduled {
                return;
            }
            state.pass_scheduled = true;
        }
        let queue = self.clone();
        tokio::spawn(async move { queue.process() });
    }

    /// Start as many pending tasks as the ceiling allows.
    fn process(&self) {
        let mut started = Vec::new();
        {
            let mut state = self.lock();
            state.pass_scheduled = false;
            while !state.paused && state.running.len() < state.max_concurrent {
                let Some(mut task) = state.pending.pop_front() else {
                    break;
                };
                if let Err(e) = task.record.start() {
                    tracing::error!(task_id = %task.record.id, error = %e, "Task could not start");
                    continue;
                }
                state.running.insert(task.record.id, task.record.clone());
                started.push(task);
            }
            tracing::debug!(
                started = started.len(),
                pending = state.pending.len(),
                running = state.running.len(),
                "Scheduling pass"
            );
        }

        if started.is_empty() {
            return;
        }
        self.notify();
        for task in started {
            tracing::info!(
                task_id = %task.record.id,
                priority = task.record.priority,
                "Task started"
            );
            self.run(task.record.id, task.payload);
        }
    }

    fn run(&self, id: Uuid, payload: TaskPayload) {
        let queue = self.clone();
        tokio::spawn(async move {
            // Inner task so a panicking payload still reaches `finish`.
            let outcome = match tokio::spawn(async move { payload().await }).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => Err("task panicked".to_string()),
                Err(_) => Err("task was cancelled".to_string()),
            };
            queue.finish(id, outcome);
        });
    }

    fn finish(&self, id: Uuid, outcome: Result<Value, String>) {
        {
            let mut state = self.lock();
            match state.running.remove(&id) {
                Some(mut record) => match record.finish(outcome) {
                    Ok(()) => {
                        match &record.error {
                            None => tracing::info!(
                                task_id = %id,
                                duration_ms = record.duration_ms.unwrap_or(0),
                                "Task completed"
                            ),
                            Some(error) => tracing::warn!(
                                task_id = %id,
                                error = %error,
                                "Task failed"
                            ),
                        }
                        state.record_terminal(record);
                    }
                    Err(e) => tracing::error!(task_id = %id, error = %e, "Task could not finish"),
                },
                None => tracing::error!(task_id = %id, "Finished task was not running"),
            }
        }
        self.notify();
        self.process();
    }

    /// Cancel a pending task.
    ///
    /// Returns `false` for running, finished or unknown tasks; there is no
    /// preemption.
    pub fn cancel(&self, id: Uuid) -> bool {
        {
            let mut state = self.lock();
            let Some(position) = state.pending.iter().position(|t| t.record.id == id) else {
                return false;
            };
            let Some(task) = state.pending.remove(position) else {
                return false;
            };
            let mut record = task.record;
            if let Err(e) = record.cancel() {
                tracing::error!(task_id = %id, error = %e, "Task could not be cancelled");
                return false;
            }
            state.record_terminal(record);
        }
        tracing::info!(task_id = %id, "Task cancelled");
        self.notify();
        true
    }

    /// Stop dequeuing. Running tasks finish normally.
    pub fn pause(&self) {
        self.lock().paused = true;
        tracing::info!("Queue paused");
        self.notify();
    }

    /// Resume dequeuing.
    pub fn resume(&self) {
        self.lock().paused = false;
        tracing::info!("Queue resumed");
        self.notify();
        self.schedule();
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Cancel every pending task. Running tasks are unaffected.
    ///
    /// Returns the number of tasks cancelled.
    pub fn clear(&self) -> usize {
        let count = {
            let mut state = self.lock();
            let drained: Vec<PendingTask> = state.pending.drain(..).collect();
            let count = drained.len();
            for task in drained {
                let mut record = task.record;
                if record.cancel().is_ok() {
                    state.record_terminal(record);
                }
            }
            count
        };
        tracing::info!(cancelled = count, "Queue cleared");
        self.notify();
        count
    }

    /// Set the concurrency ceiling, clamped to at least 1.
    ///
    /// Applies from the next scheduling pass; running tasks are never
    /// preempted. Returns the effective value.
    pub fn set_max_concurrent(&self, max_concurrent: usize) -> usize {
        let effective = max_concurrent.max(1);
        self.lock().max_concurrent = effective;
        tracing::info!(max_concurrent = effective, "Concurrency ceiling updated");
        self.schedule();
        effective
    }

    pub fn max_concurrent(&self) -> usize {
        self.lock().max_concurrent
    }

    /// Current record for `id`, wherever it lives.
    pub fn task_status(&self, id: Uuid) -> Option<TaskRecord> {
        let state = self.lock();
        if let Some(record) = state.running.get(&id) {
            return Some(record.clone());
        }
        if let Some(task) = state.pending.iter().find(|t| t.record.id == id) {
            return Some(task.record.clone());
        }
        state.history.iter().rev().find(|r| r.id == id).cloned()
    }

    /// Pending tasks in dequeue order.
    pub fn pending_tasks(&self) -> Vec<TaskRecord> {
        self.lock()
            .pending
            .iter()
            .map(|t| t.record.clone())
            .collect()
    }

    /// Running tasks, earliest started first.
    pub fn running_tasks(&self) -> Vec<TaskRecord> {
        let mut running: Vec<TaskRecord> = self.lock().running.values().cloned().collect();
        running.sort_by_key(|r| r.started_at);
        running
    }

    /// The most recent `limit` terminal tasks (all retained if `None`), oldest first.
    pub fn history(&self, limit: Option<usize>) -> Vec<TaskRecord> {
        let state = self.lock();
        let skip = limit
            .map(|limit| state.history.len().saturating_sub(limit))
            .unwrap_or(0);
        state.history.iter().skip(skip).cloned().collect()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        let average_duration_ms = if state.completed > 0 {
            Some(state.completed_duration_total_ms as f64 / state.completed as f64)
        } else {
            None
        };
        QueueStats {
            pending: state.pending.len(),
            running: state.running.len(),
            paused: state.paused,
            max_concurrent: state.max_concurrent,
            completed: state.completed,
            failed: state.failed,
            cancelled: state.cancelled,
            history_len: state.history.len(),
            average_duration_ms,
        }
    }

    fn lookup(&self, id: Uuid) -> Lookup {
        let state = self.lock();
        if state.running.contains_key(&id) || state.pending.iter().any(|t| t.record.id == id) {
            return Lookup::InFlight;
        }
        match state.history.iter().rev().find(|r| r.id == id) {
            Some(record) => Lookup::Terminal(record.clone()),
            None => Lookup::Missing,
        }
    }

    /// Wait until `id` reaches a terminal state and return its record.
    ///
    /// Fails with [`QueueError::TaskNotFound`] for unknown ids and for tasks
    /// already evicted from history.
    pub async fn wait_for(&self, id: Uuid) -> Result<TaskRecord, QueueError> {
        let mut changes = self.shared.changed.subscribe();
        loop {
            match self.lookup(id) {
                Lookup::Terminal(record) => return Ok(record),
                Lookup::Missing => return Err(QueueError::TaskNotFound(id)),
                Lookup::InFlight => {}
            }
            if changes.changed().await.is_err() {
                return Err(QueueError::TaskNotFound(id));
            }
        }
    }

    /// Wait until nothing is running and nothing can be dequeued.
    pub async fn wait_idle(&self) {
        let mut changes = self.shared.changed.subscribe();
        loop {
            if self.lock().is_idle() {
                return;
            }
            if changes.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(&QueueConfig::default())
    }
}

fn box_payload<F, Fut, E>(payload: F) -> TaskPayload
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    Box::new(move || -> TaskFuture {
        Box::pin(async move { payload().await.map_err(|e| e.to_string()) })
    })
}
