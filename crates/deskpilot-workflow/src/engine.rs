//! Sequential workflow orchestration.
//!
//! Steps run strictly in order: each step's params are resolved against the
//! context built from the initial variables and every earlier step's output,
//! then handed to the [`ActionExecutor`]. A step failure is an ordinary
//! outcome recorded in the execution; only a fault in the engine itself
//! (the executor task dying) yields [`ExecutionStatus::Error`].

use chrono::Utc;
use deskpilot_action::{ActionExecutor, ActionResult};
use deskpilot_core::config::WorkflowConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::substitution::resolve;
use crate::template::TemplateCatalog;
use crate::types::{
    Context, ExecutionStatus, Step, StepResult, ValidationReport, Workflow, WorkflowExecution,
};
use crate::validation::validate_workflow;

/// Stop request shared between the engine and one running execution.
#[derive(Default)]
struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a delay that starts later still wakes.
        self.notify.notify_one();
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

struct ActiveExecution {
    snapshot: WorkflowExecution,
    stop: Arc<StopSignal>,
}

struct EngineState {
    executor: Arc<ActionExecutor>,
    templates: RwLock<TemplateCatalog>,
    active: Mutex<HashMap<Uuid, ActiveExecution>>,
    history: Mutex<VecDeque<WorkflowExecution>>,
    history_limit: usize,
}

/// Runs workflows against an [`ActionExecutor`].
///
/// Cloning is cheap and every clone shares the same active set, history and
/// template catalog.
#[derive(Clone)]
pub struct WorkflowEngine {
    inner: Arc<EngineState>,
}

impl WorkflowEngine {
    /// Create an engine with the built-in templates registered.
    pub fn new(executor: Arc<ActionExecutor>, config: &WorkflowConfig) -> Self {
        Self {
            inner: Arc::new(EngineState {
                executor,
                templates: RwLock::new(TemplateCatalog::with_builtins()),
                active: Mutex::new(HashMap::new()),
                history: Mutex::new(VecDeque::new()),
                history_limit: config.history_limit.max(1),
            }),
        }
    }

    pub fn executor(&self) -> &Arc<ActionExecutor> {
        &self.inner.executor
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run `workflow` to a terminal status and return its record.
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
        initial_context: Context,
    ) -> WorkflowExecution {
        let (execution, stop) = self.begin(workflow, initial_context);
        self.run(workflow, execution, stop).await
    }

    /// Start `workflow` on a background task.
    ///
    /// The execution is active before this returns, so the id can be passed
    /// to [`WorkflowEngine::stop_workflow`] straight away.
    pub fn spawn_workflow(
        &self,
        workflow: Workflow,
        initial_context: Context,
    ) -> (Uuid, JoinHandle<WorkflowExecution>) {
        let (execution, stop) = self.begin(&workflow, initial_context);
        let id = execution.id;
        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.run(&workflow, execution, stop).await });
        (id, handle)
    }

    /// Stop an active execution. In-flight step calls are not interrupted,
    /// but no further step starts and a pending step delay is cut short.
    ///
    /// The execution leaves the active set at once and is recorded in history
    /// as [`ExecutionStatus::Stopped`]. When its last step call returns, the
    /// final record replaces that entry.
    ///
    /// Returns `false` if `id` is not active.
    pub fn stop_workflow(&self, id: Uuid) -> bool {
        let mut active = self.lock_active();
        let Some(entry) = active.remove(&id) else {
            return false;
        };
        entry.stop.request();

        let mut snapshot = entry.snapshot;
        snapshot.status = ExecutionStatus::Stopped;
        snapshot.ended_at = Some(Utc::now());
        tracing::info!(execution_id = %id, workflow = %snapshot.workflow_name, "Workflow stop requested");
        // Recorded under the active lock so a concurrent retire cannot be overwritten.
        self.record(snapshot);
        drop(active);
        true
    }

    fn begin(
        &self,
        workflow: &Workflow,
        initial_context: Context,
    ) -> (WorkflowExecution, Arc<StopSignal>) {
        let execution = WorkflowExecution::start(&workflow.name, initial_context);
        let stop = Arc::new(StopSignal::default());
        self.lock_active().insert(
            execution.id,
            ActiveExecution {
                snapshot: execution.clone(),
                stop: Arc::clone(&stop),
            },
        );
        (execution, stop)
    }

    async fn run(
        &self,
        workflow: &Workflow,
        mut execution: WorkflowExecution,
        stop: Arc<StopSignal>,
    ) -> WorkflowExecution {
        tracing::info!(
            execution_id = %execution.id,
            workflow = %workflow.name,
            steps = workflow.steps.len(),
            "Workflow started"
        );

        let outcome = self.run_steps(workflow, &mut execution, &stop).await;
        execution.status = match outcome {
            Err(e) => {
                execution.error = Some(e.to_string());
                ExecutionStatus::Error
            }
            Ok(status) => status,
        };
        execution.ended_at = Some(Utc::now());

        match execution.status {
            ExecutionStatus::Completed | ExecutionStatus::Stopped => tracing::info!(
                execution_id = %execution.id,
                workflow = %workflow.name,
                status = %execution.status,
                steps_run = execution.step_results.len(),
                duration_ms = execution.duration_ms().unwrap_or(0),
                "Workflow finished"
            ),
            _ => tracing::warn!(
                execution_id = %execution.id,
                workflow = %workflow.name,
                status = %execution.status,
                error = execution.error.as_deref().unwrap_or(""),
                "Workflow finished"
            ),
        }

        self.retire(&execution);
        execution
    }

    async fn run_steps(
        &self,
        workflow: &Workflow,
        execution: &mut WorkflowExecution,
        stop: &StopSignal,
    ) -> Result<ExecutionStatus, WorkflowError> {
        for (index, step) in workflow.steps.iter().enumerate() {
            if stop.is_requested() {
                return Ok(ExecutionStatus::Stopped);
            }

            let params = resolve(&step.params, &execution.context);
            tracing::debug!(
                execution_id = %execution.id,
                step = index + 1,
                action_type = %step.action_type,
                "Running step"
            );
            let started_at = Utc::now();
            let result = self.dispatch(index, step, params.clone()).await?;
            let step_result = StepResult::from_action(index, step, params, started_at, result);
            let success = step_result.success;
            let output = step_result.output.clone();
            let error = step_result.error.clone();
            execution.step_results.push(step_result);

            if !success && step.stop_on_error {
                execution.error = error;
                self.publish(execution);
                return Ok(ExecutionStatus::Failed);
            }
            if let Some(output) = output {
                execution.context.insert(step.context_key(index), output);
            }
            self.publish(execution);

            if let Some(delay_ms) = step.delay_ms {
                if !stop.is_requested() {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                        _ = stop.notify.notified() => {}
                    }
                }
            }
        }

        Ok(ExecutionStatus::Completed)
    }

    /// Hand one step to the executor on its own task so that a panic inside
    /// the executor (e.g. in a confirmation gate) cannot take the engine down.
    async fn dispatch(
        &self,
        index: usize,
        step: &Step,
        params: serde_json::Value,
    ) -> Result<ActionResult, WorkflowError> {
        let executor = Arc::clone(&self.inner.executor);
        let action_type = step.action_type.clone();
        let require_confirmation = step.require_confirmation;
        tokio::spawn(async move {
            executor
                .execute(action_type.as_str(), params, require_confirmation)
                .await
        })
        .await
        .map_err(|e| {
            WorkflowError::Orchestration(format!(
                "step {} ({}) aborted: {}",
                index + 1,
                step.action_type,
                e
            ))
        })
    }

    fn publish(&self, execution: &WorkflowExecution) {
        if let Some(entry) = self.lock_active().get_mut(&execution.id) {
            entry.snapshot = execution.clone();
        }
    }

    fn retire(&self, execution: &WorkflowExecution) {
        let mut active = self.lock_active();
        active.remove(&execution.id);
        self.record(execution.clone());
        drop(active);
    }

    /// Append to history, or replace the entry a stop already recorded.
    fn record(&self, execution: WorkflowExecution) {
        let mut history = self.lock_history();
        if let Some(existing) = history.iter_mut().find(|e| e.id == execution.id) {
            *existing = execution;
            return;
        }
        history.push_back(execution);
        while history.len() > self.inner.history_limit {
            history.pop_front();
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Snapshots of running executions, oldest first.
    pub fn active_workflows(&self) -> Vec<WorkflowExecution> {
        let mut active: Vec<WorkflowExecution> = self
            .lock_active()
            .values()
            .map(|entry| entry.snapshot.clone())
            .collect();
        active.sort_by_key(|execution| execution.started_at);
        active
    }

    /// Finished executions in chronological order; `limit` keeps the most
    /// recent ones.
    pub fn history(&self, limit: Option<usize>) -> Vec<WorkflowExecution> {
        let history = self.lock_history();
        let skip = limit.map_or(0, |limit| history.len().saturating_sub(limit));
        history.iter().skip(skip).cloned().collect()
    }

    /// Finished or stopped execution by id, if still retained.
    pub fn execution(&self, id: Uuid) -> Option<WorkflowExecution> {
        self.lock_history().iter().find(|e| e.id == id).cloned()
    }

    // =========================================================================
    // Definitions and templates
    // =========================================================================

    /// Static checks, with warnings for action types this engine's executor
    /// cannot run.
    pub fn validate_workflow(&self, workflow: &Workflow) -> ValidationReport {
        validate_workflow(workflow, Some(self.inner.executor.registry()))
    }

    pub fn create_from_template(
        &self,
        name: &str,
        variables: &Context,
    ) -> Result<Workflow, WorkflowError> {
        self.read_templates().instantiate(name, variables)
    }

    /// Register a caller template, returning any template it replaced.
    pub fn register_template(&self, template: Workflow) -> Option<Workflow> {
        tracing::debug!(template = %template.name, "Template registered");
        self.inner
            .templates
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .register(template)
    }

    pub fn template_names(&self) -> Vec<String> {
        self.read_templates().names()
    }

    fn read_templates(&self) -> std::sync::RwLockReadGuard<'_, TemplateCatalog> {
        self.inner.templates.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, ActiveExecution>> {
        self.inner.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, VecDeque<WorkflowExecution>> {
        self.inner.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}
