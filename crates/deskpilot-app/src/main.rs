//! Deskpilot application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing (RUST_LOG > --log-level > config)
//! 3. Build the action registry, confirmation gate and executor
//! 4. Build the task queue and workflow engine over the shared executor
//! 5. Dispatch the requested command; results go to stdout as JSON
//! 6. Shut the runtime down without waiting on an unanswered prompt

mod cli;
mod prompt;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::{json, Value};

use deskpilot_action::{ActionExecutor, ActionRegistry, AutoApprove, ConfirmationGate, PromptGate};
use deskpilot_core::config::DeskpilotConfig;
use deskpilot_core::error::{DeskpilotError, Result};
use deskpilot_queue::TaskQueue;
use deskpilot_workflow::{
    validate_definition, Context, ExecutionStatus, Workflow, WorkflowEngine,
};

use cli::{CliArgs, Command};

fn init_tracing(directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(directive))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_definition(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load every workflow named on the command line, from files or templates.
fn load_workflows(
    engine: &WorkflowEngine,
    names: &[String],
    from_template: bool,
    context: &Context,
) -> Result<Vec<Workflow>> {
    names
        .iter()
        .map(|name| -> Result<Workflow> {
            if from_template {
                Ok(engine.create_from_template(name, context)?)
            } else {
                let definition = read_definition(Path::new(name))?;
                Workflow::from_value(definition).map_err(|e| {
                    DeskpilotError::Workflow(format!("{}: {}", name, e))
                })
            }
        })
        .collect()
}

/// Submit each workflow as a queue task, wait for the queue to drain and
/// report. Returns `true` if every execution completed.
async fn run_workflows(
    engine: &WorkflowEngine,
    queue: &TaskQueue,
    workflows: Vec<Workflow>,
    context: Context,
    priority: i32,
) -> Result<bool> {
    for workflow in workflows {
        let report = engine.validate_workflow(&workflow);
        for warning in &report.warnings {
            tracing::warn!(workflow = %workflow.name, "{}", warning);
        }

        let engine = engine.clone();
        let context = context.clone();
        let name = workflow.name.clone();
        let task_id = queue.add_named(
            name.clone(),
            move || async move {
                let execution = engine.execute_workflow(&workflow, context).await;
                match execution.status {
                    ExecutionStatus::Completed => {
                        serde_json::to_value(execution.id.to_string()).map_err(|e| e.to_string())
                    }
                    status => Err(format!(
                        "workflow {} {}: {}",
                        execution.workflow_name,
                        status,
                        execution.error.as_deref().unwrap_or("no error recorded")
                    )),
                }
            },
            priority,
        );
        tracing::info!(task_id = %task_id, workflow = %name, priority, "Workflow queued");
    }

    queue.wait_idle().await;

    let executions = engine.history(None);
    let all_completed = executions
        .iter()
        .all(|e| e.status == ExecutionStatus::Completed);
    print_json(&json!({
        "executions": executions,
        "tasks": queue.history(None),
        "stats": queue.stats(),
    }))?;
    Ok(all_completed)
}

fn main() -> std::result::Result<ExitCode, Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(run(args));
    // A stdin read left by the confirmation prompter cannot be cancelled.
    runtime.shutdown_background();
    outcome
}

async fn run(args: CliArgs) -> std::result::Result<ExitCode, Box<dyn std::error::Error>> {
    // Config.
    let config_file = args.resolve_config_path();
    let config = DeskpilotConfig::load_or_default(&config_file);

    // Tracing.
    init_tracing(&args.resolve_log_level(&config.general.log_level));
    tracing::info!(path = %config_file.display(), "Starting Deskpilot v{}", env!("CARGO_PKG_VERSION"));

    // Action layer.
    let mut registry = ActionRegistry::new();
    registry.register_defaults();

    let mut prompt_gate = None;
    let gate: Arc<dyn ConfirmationGate> = if args.yes || config.executor.auto_approve {
        tracing::info!("Confirmation requests are auto-approved");
        Arc::new(AutoApprove)
    } else {
        let gate = Arc::new(PromptGate::new(Duration::from_secs(
            config.executor.confirmation_timeout_seconds,
        )));
        prompt_gate = Some(Arc::clone(&gate));
        gate
    };
    let executor = Arc::new(ActionExecutor::new(registry, gate));

    // Queue and engine share the executor.
    let queue = TaskQueue::new(&config.queue);
    let engine = WorkflowEngine::new(Arc::clone(&executor), &config.workflow);

    match args.command {
        Command::Actions => {
            let actions: Vec<String> = executor
                .available_actions()
                .into_iter()
                .map(|a| a.to_string())
                .collect();
            print_json(&json!(actions))?;
        }
        Command::Templates => {
            print_json(&json!(engine.template_names()))?;
        }
        Command::Validate { files } => {
            let mut all_valid = true;
            let mut reports = serde_json::Map::new();
            for file in files {
                let report = read_definition(&file).map(|definition| {
                    let report = validate_definition(&definition);
                    // Registry warnings only make sense once the shape is sound.
                    match Workflow::from_value(definition) {
                        Ok(workflow) if report.valid => engine.validate_workflow(&workflow),
                        _ => report,
                    }
                });
                let report = match report {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(file = %file.display(), error = %e, "Cannot read workflow");
                        all_valid = false;
                        continue;
                    }
                };
                all_valid &= report.valid;
                reports.insert(file.display().to_string(), serde_json::to_value(report)?);
            }
            print_json(&Value::Object(reports))?;
            if !all_valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Run {
            workflows,
            template,
            vars,
            priority,
        } => {
            let context: Context = vars.into_iter().collect();
            let workflows = load_workflows(&engine, &workflows, template, &context)?;

            let prompter = prompt_gate.map(|gate| tokio::spawn(prompt::serve_terminal_prompts(gate)));
            let outcome = run_workflows(&engine, &queue, workflows, context, priority).await;
            if let Some(prompter) = prompter {
                prompter.abort();
            }
            if !outcome? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
