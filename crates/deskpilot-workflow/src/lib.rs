//! Workflow engine for Deskpilot.
//!
//! A workflow is an ordered list of steps, each naming an action type and its
//! params. Params may reference the initial variables or earlier step outputs
//! with `{{key}}` placeholders, which are resolved just before the step runs.

pub mod engine;
pub mod error;
pub mod substitution;
pub mod template;
pub mod types;
pub mod validation;

pub use engine::WorkflowEngine;
pub use error::WorkflowError;
pub use template::TemplateCatalog;
pub use types::{
    Context, ExecutionStatus, Step, StepResult, ValidationReport, Workflow, WorkflowExecution,
};
pub use validation::{validate_definition, validate_workflow};
