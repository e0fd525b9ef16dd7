//! Reusable workflow templates.
//!
//! A template is an ordinary [`Workflow`] whose strings contain placeholders.
//! Instantiating it resolves the placeholders the caller supplies; the rest
//! stay in place and are resolved from the run-time context as steps
//! produce outputs.

use serde_json::json;
use std::collections::BTreeMap;

use crate::error::WorkflowError;
use crate::substitution::resolve;
use crate::types::{Context, Step, Workflow};

/// Named collection of workflow templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Workflow>,
}

impl TemplateCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog preloaded with the built-in templates.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for template in builtin_templates() {
            catalog.register(template);
        }
        catalog
    }

    /// Add a template under its workflow name, returning any it replaced.
    pub fn register(&mut self, template: Workflow) -> Option<Workflow> {
        self.templates.insert(template.name.clone(), template)
    }

    pub fn get(&self, name: &str) -> Option<&Workflow> {
        self.templates.get(name)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Produce a concrete workflow from a template and variables.
    pub fn instantiate(&self, name: &str, variables: &Context) -> Result<Workflow, WorkflowError> {
        let template = self
            .get(name)
            .ok_or_else(|| WorkflowError::TemplateNotFound(name.to_string()))?;
        let raw = serde_json::to_value(template)?;
        Ok(serde_json::from_value(resolve(&raw, variables))?)
    }
}

/// Templates shipped with the engine.
///
/// `open_app_and_type` takes `app` and `text`; `capture_and_save` takes
/// `path` and feeds the capture output into the write step.
pub fn builtin_templates() -> Vec<Workflow> {
    vec![
        Workflow::new(
            "open_app_and_type",
            vec![
                Step::new("app_launch", json!({"app": "{{app}}"}))
                    .named("launch")
                    .delay_ms(1500),
                Step::new("keyboard_type", json!({"text": "{{text}}"}))
                    .named("type")
                    .require_confirmation(true),
            ],
        )
        .with_description("Launch an application and type text into it"),
        Workflow::new(
            "capture_and_save",
            vec![
                Step::new("screen_capture", json!({})).named("capture"),
                Step::new(
                    "file_write",
                    json!({"path": "{{path}}", "content": "{{capture}}"}),
                )
                .named("save")
                .require_confirmation(true),
            ],
        )
        .with_description("Capture the screen and write the result to a file"),
    ]
}
