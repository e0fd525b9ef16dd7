//! End-to-end tests across the action, queue and workflow layers.
//!
//! Each test builds its own registry of recording providers so that the
//! params a provider actually received can be asserted on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use deskpilot_action::{
    ActionError, ActionErrorKind, ActionExecutor, ActionRegistry, ActionType, CapabilityProvider,
    DenyAll, PromptGate, SafetyLevel,
};
use deskpilot_core::config::{QueueConfig, WorkflowConfig};
use deskpilot_queue::{TaskQueue, TaskStatus};
use deskpilot_workflow::{
    Context, ExecutionStatus, Step, Workflow, WorkflowEngine, WorkflowError,
};

// =============================================================================
// Helpers
// =============================================================================

/// Provider that records every params value it receives and replies with a
/// fixed output, or fails if configured to.
struct RecordingProvider {
    action_type: &'static str,
    reply: Result<Value, String>,
    safety_level: SafetyLevel,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl RecordingProvider {
    fn ok(action_type: &'static str, reply: Value) -> Self {
        Self {
            action_type,
            reply: Ok(reply),
            safety_level: SafetyLevel::Passive,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(action_type: &'static str, message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::ok(action_type, Value::Null)
        }
    }

    fn active(mut self) -> Self {
        self.safety_level = SafetyLevel::Active;
        self
    }

    fn calls(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl CapabilityProvider for RecordingProvider {
    fn action_type(&self) -> ActionType {
        ActionType::from(self.action_type)
    }

    fn safety_level(&self) -> SafetyLevel {
        self.safety_level
    }

    async fn execute(&self, params: &Value) -> Result<Value, ActionError> {
        self.calls.lock().unwrap().push(params.clone());
        self.reply.clone().map_err(ActionError::ProviderFailure)
    }
}

fn engine(registry: ActionRegistry) -> WorkflowEngine {
    WorkflowEngine::new(
        Arc::new(ActionExecutor::with_auto_approve(registry)),
        &WorkflowConfig::default(),
    )
}

fn context(value: Value) -> Context {
    value.as_object().cloned().unwrap_or_default()
}

// =============================================================================
// Workflow semantics
// =============================================================================

#[tokio::test]
async fn test_capture_output_feeds_save_step() {
    let capture = RecordingProvider::ok("screen_capture", json!("/tmp/x.png"));
    let write = RecordingProvider::ok("file_write", json!({"bytes": 10}));
    let writes = write.calls();
    let mut registry = ActionRegistry::new();
    registry.register(capture);
    registry.register(write);

    let workflow = Workflow::new(
        "capture_then_save",
        vec![
            Step::new("screen_capture", json!({})).named("capture"),
            Step::new(
                "file_write",
                json!({"path": "{{savePath}}", "content": "{{capture}}"}),
            ),
        ],
    );
    let execution = engine(registry)
        .execute_workflow(&workflow, context(json!({"savePath": "/home/me/captures"})))
        .await;

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(
        writes.lock().unwrap().as_slice(),
        &[json!({"path": "/home/me/captures", "content": "/tmp/x.png"})]
    );
    assert_eq!(execution.context["savePath"], json!("/home/me/captures"));
    assert_eq!(execution.context["capture"], json!("/tmp/x.png"));
    assert_eq!(execution.context["step_2"], json!({"bytes": 10}));
}

#[tokio::test]
async fn test_second_step_failure_halts_workflow() {
    let first = RecordingProvider::ok("app_launch", json!(true));
    let second = RecordingProvider::failing("keyboard_type", "no focused window");
    let third = RecordingProvider::ok("notify", json!("done"));
    let third_calls = third.calls();
    let mut registry = ActionRegistry::new();
    registry.register(first);
    registry.register(second);
    registry.register(third);

    let workflow = Workflow::new(
        "type_note",
        vec![
            Step::new("app_launch", json!({"app": "notepad"})),
            Step::new("keyboard_type", json!({"text": "hi"})),
            Step::new("notify", json!({"message": "typed"})),
        ],
    );
    let execution = engine(registry)
        .execute_workflow(&workflow, Context::new())
        .await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.step_results.len(), 2);
    assert!(!execution.step_results[1].success);
    assert_eq!(execution.error.as_deref(), Some("no focused window"));
    assert!(third_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_on_error_false_continues() {
    let mut registry = ActionRegistry::new();
    registry.register(RecordingProvider::ok("app_launch", json!(true)));
    registry.register(RecordingProvider::failing("keyboard_type", "no focused window"));
    registry.register(RecordingProvider::ok("notify", json!("done")));

    let workflow = Workflow::new(
        "best_effort",
        vec![
            Step::new("app_launch", json!({})),
            Step::new("keyboard_type", json!({})).stop_on_error(false),
            Step::new("notify", json!({})),
        ],
    );
    let execution = engine(registry)
        .execute_workflow(&workflow, Context::new())
        .await;

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.step_results.len(), 3);
    assert!(!execution.step_results[1].success);
    assert!(execution.step_results[2].success);
    assert!(execution.error.is_none());
}

#[tokio::test]
async fn test_unresolved_placeholder_reaches_provider_verbatim() {
    let echo = RecordingProvider::ok("clipboard_write", json!(null));
    let calls = echo.calls();
    let mut registry = ActionRegistry::new();
    registry.register(echo);

    let workflow = Workflow::new(
        "paste",
        vec![Step::new("clipboard_write", json!({"text": "{{missing}} and {{user}}"}))],
    );
    engine(registry)
        .execute_workflow(&workflow, context(json!({"user": "sam"})))
        .await;

    assert_eq!(
        calls.lock().unwrap().as_slice(),
        &[json!({"text": "{{missing}} and sam"})]
    );
}

#[tokio::test]
async fn test_template_runs_end_to_end() {
    let capture = RecordingProvider::ok("screen_capture", json!({"path": "/tmp/s.png"}));
    let write = RecordingProvider::ok("file_write", json!(true)).active();
    let writes = write.calls();
    let mut registry = ActionRegistry::new();
    registry.register(capture);
    registry.register(write);
    let engine = engine(registry);

    let workflow = engine
        .create_from_template("capture_and_save", &context(json!({"path": "/home/me/shot.json"})))
        .unwrap();
    assert!(engine.validate_workflow(&workflow).warnings.is_empty());

    let execution = engine.execute_workflow(&workflow, Context::new()).await;
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(
        writes.lock().unwrap().as_slice(),
        &[json!({"path": "/home/me/shot.json", "content": "{\"path\":\"/tmp/s.png\"}"})]
    );
}

#[tokio::test]
async fn test_unknown_template() {
    let engine = engine(ActionRegistry::new());
    let err = engine
        .create_from_template("daily_standup", &Context::new())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::TemplateNotFound(_)));
}

#[tokio::test]
async fn test_from_value_definition_executes() {
    let mut registry = ActionRegistry::new();
    registry.register_defaults();
    let engine = engine(registry);

    let workflow = Workflow::from_value(json!({
        "name": "pause_and_tell",
        "steps": [
            {"name": "pause", "action_type": "wait", "params": {"ms": 1}},
            {"action_type": "notify", "params": {"message": "waited {{pause.waited_ms}} ms"}}
        ]
    }))
    .unwrap();
    let execution = engine.execute_workflow(&workflow, Context::new()).await;

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.context["step_2"], json!("waited 1 ms"));
}

// =============================================================================
// Confirmation
// =============================================================================

#[tokio::test]
async fn test_denied_confirmation_fails_step() {
    let write = RecordingProvider::ok("file_write", json!(true));
    let writes = write.calls();
    let mut registry = ActionRegistry::new();
    registry.register(write);
    let engine = WorkflowEngine::new(
        Arc::new(ActionExecutor::new(registry, Arc::new(DenyAll))),
        &WorkflowConfig::default(),
    );

    let workflow = Workflow::new(
        "guarded",
        vec![Step::new("file_write", json!({"path": "/etc/hosts"})).require_confirmation(true)],
    );
    let execution = engine.execute_workflow(&workflow, Context::new()).await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(
        execution.step_results[0].error_kind,
        Some(ActionErrorKind::Cancelled)
    );
    assert!(writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_prompt_gate_approval_unblocks_step() {
    let delete = RecordingProvider::ok("file_delete", json!(true)).active();
    let deletes = delete.calls();
    let mut registry = ActionRegistry::new();
    registry.register(delete);
    let gate = Arc::new(PromptGate::new(Duration::from_secs(30)));
    let engine = WorkflowEngine::new(
        Arc::new(ActionExecutor::new(registry, gate.clone())),
        &WorkflowConfig::default(),
    );

    let workflow = Workflow::new(
        "cleanup",
        vec![Step::new("file_delete", json!({"path": "/tmp/old.log"}))],
    );
    let (_, handle) = engine.spawn_workflow(workflow, Context::new());

    let request = loop {
        if let Some(request) = gate.pending().into_iter().next() {
            break request;
        }
        tokio::task::yield_now().await;
    };
    assert_eq!(request.action_type, ActionType::from("file_delete"));
    assert!(gate.approve(request.id));

    let execution = handle.await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(deletes.lock().unwrap().len(), 1);
}

// =============================================================================
// Stop
// =============================================================================

#[tokio::test]
async fn test_stop_prevents_remaining_steps() {
    let mut registry = ActionRegistry::new();
    registry.register_defaults();
    let counted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&counted);
    registry.register_fn("count", move |_: Value| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<Value, ActionError>(Value::Null)
        }
    });
    let engine = engine(registry);

    let workflow = Workflow::new(
        "long",
        vec![
            Step::new("wait", json!({"ms": 200})),
            Step::new("count", json!({})),
            Step::new("count", json!({})),
        ],
    );
    let (id, handle) = engine.spawn_workflow(workflow, Context::new());
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(engine.stop_workflow(id));
    assert!(engine.active_workflows().is_empty());
    // Visible as stopped while the in-flight wait is still running.
    assert_eq!(engine.execution(id).unwrap().status, ExecutionStatus::Stopped);

    let execution = handle.await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Stopped);
    // The in-flight wait finishes; nothing after it starts.
    assert_eq!(execution.step_results.len(), 1);
    assert!(execution.step_results[0].success);
    assert_eq!(counted.load(Ordering::SeqCst), 0);
    assert_eq!(engine.history(None).len(), 1);
}

// =============================================================================
// Queue integration
// =============================================================================

#[tokio::test]
async fn test_workflows_as_queue_tasks() {
    let mut registry = ActionRegistry::new();
    registry.register_defaults();
    let engine = engine(registry);
    let queue = TaskQueue::new(&QueueConfig::default());

    let mut ids = Vec::new();
    for (name, priority) in [("low", 0), ("high", 5)] {
        let engine = engine.clone();
        let workflow = Workflow::new(
            name,
            vec![Step::new("notify", json!({"message": name}))],
        );
        let id = queue.add_named(
            name,
            move || async move {
                let execution = engine.execute_workflow(&workflow, Context::new()).await;
                match execution.status {
                    ExecutionStatus::Completed => {
                        serde_json::to_value(&execution).map_err(|e| e.to_string())
                    }
                    status => Err(format!("workflow {}", status)),
                }
            },
            priority,
        );
        ids.push(id);
    }
    queue.wait_idle().await;

    let order: Vec<String> = engine
        .history(None)
        .into_iter()
        .map(|e| e.workflow_name)
        .collect();
    assert_eq!(order, vec!["high", "low"]);

    for id in ids {
        let record = queue.wait_for(id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.result.unwrap()["status"], json!("completed"));
    }
    assert_eq!(queue.stats().completed, 2);
}
