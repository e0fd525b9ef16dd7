//! Structural checks for workflow definitions.
//!
//! Errors make a definition unusable; warnings flag things that will run but
//! probably not as intended (no steps, unregistered actions, duplicate step
//! names that shadow each other in the context).

use deskpilot_action::ActionRegistry;
use serde_json::Value;
use std::collections::HashSet;

use crate::types::{ValidationReport, Workflow};

/// Check a typed workflow. Passing a registry adds a warning for every step
/// whose action type has no provider.
pub fn validate_workflow(workflow: &Workflow, registry: Option<&ActionRegistry>) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if workflow.name.trim().is_empty() {
        warnings.push("Workflow name is empty".to_string());
    }
    if workflow.steps.is_empty() {
        warnings.push("Workflow has no steps".to_string());
    }

    let mut seen = HashSet::new();
    for (index, step) in workflow.steps.iter().enumerate() {
        let n = index + 1;
        if step.action_type.is_empty() {
            errors.push(format!("Step {}: missing action_type", n));
        } else if let Some(registry) = registry {
            if !registry.contains(step.action_type.as_str()) {
                warnings.push(format!(
                    "Step {}: action type '{}' is not registered",
                    n, step.action_type
                ));
            }
        }
        if let Some(name) = step.name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !seen.insert(name.to_string()) {
                warnings.push(format!("Step {}: duplicate step name '{}'", n, name));
            }
        }
    }

    ValidationReport::from_findings(errors, warnings)
}

/// Check an untyped definition, reporting every problem rather than the
/// first one a deserializer would hit.
pub fn validate_definition(definition: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let Some(object) = definition.as_object() else {
        errors.push("Workflow definition must be an object".to_string());
        return ValidationReport::from_findings(errors, warnings);
    };

    match object.get("name") {
        Some(Value::String(name)) if name.trim().is_empty() => {
            warnings.push("Workflow name is empty".to_string());
        }
        Some(Value::String(_)) => {}
        _ => errors.push("Workflow must have a string 'name'".to_string()),
    }
    if let Some(description) = object.get("description") {
        if !description.is_string() && !description.is_null() {
            errors.push("Workflow 'description' must be a string".to_string());
        }
    }

    let steps = match object.get("steps") {
        Some(Value::Array(steps)) => steps,
        Some(_) => {
            errors.push("Workflow 'steps' must be an array".to_string());
            return ValidationReport::from_findings(errors, warnings);
        }
        None => {
            errors.push("Workflow must declare a 'steps' array".to_string());
            return ValidationReport::from_findings(errors, warnings);
        }
    };
    if steps.is_empty() {
        warnings.push("Workflow has no steps".to_string());
    }

    let mut seen = HashSet::new();
    for (index, step) in steps.iter().enumerate() {
        let n = index + 1;
        let Some(step) = step.as_object() else {
            errors.push(format!("Step {}: must be an object", n));
            continue;
        };

        match step.get("action_type") {
            Some(Value::String(at)) if !at.trim().is_empty() => {}
            _ => errors.push(format!("Step {}: missing action_type", n)),
        }
        if let Some(delay) = step.get("delay_ms") {
            if !delay.is_u64() && !delay.is_null() {
                errors.push(format!(
                    "Step {}: delay_ms must be a non-negative integer",
                    n
                ));
            }
        }
        for flag in ["stop_on_error", "require_confirmation"] {
            if let Some(value) = step.get(flag) {
                if !value.is_boolean() {
                    errors.push(format!("Step {}: {} must be a boolean", n, flag));
                }
            }
        }
        match step.get("name") {
            None | Some(Value::Null) => {}
            Some(Value::String(name)) => {
                let name = name.trim();
                if !name.is_empty() && !seen.insert(name.to_string()) {
                    warnings.push(format!("Step {}: duplicate step name '{}'", n, name));
                }
            }
            Some(_) => errors.push(format!("Step {}: name must be a string", n)),
        }
    }

    ValidationReport::from_findings(errors, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Step;
    use serde_json::json;

    #[test]
    fn test_valid_workflow() {
        let workflow = Workflow::new(
            "ok",
            vec![Step::new("wait", json!({"ms": 1})).named("pause")],
        );
        let report = validate_workflow(&workflow, None);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_empty_steps_is_warning() {
        let report = validate_workflow(&Workflow::new("empty", vec![]), None);
        assert!(report.valid);
        assert_eq!(report.warnings, vec!["Workflow has no steps"]);
    }

    #[test]
    fn test_empty_name_is_warning() {
        let workflow = Workflow::new("  ", vec![Step::new("wait", json!({"ms": 1}))]);
        let report = validate_workflow(&workflow, None);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings, vec!["Workflow name is empty"]);
    }

    #[test]
    fn test_missing_action_type_is_error() {
        let workflow = Workflow::new(
            "bad",
            vec![Step::new("wait", json!({})), Step::new("", json!({}))],
        );
        let report = validate_workflow(&workflow, None);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Step 2: missing action_type"]);
    }

    #[test]
    fn test_registry_and_duplicate_warnings() {
        let mut registry = ActionRegistry::new();
        registry.register_defaults();
        let workflow = Workflow::new(
            "warned",
            vec![
                Step::new("wait", json!({"ms": 1})).named("a"),
                Step::new("mouse_click", json!({})).named("a"),
            ],
        );
        let report = validate_workflow(&workflow, Some(&registry));
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("mouse_click"));
        assert!(report.warnings[1].contains("duplicate"));
    }

    #[test]
    fn test_definition_not_an_object() {
        let report = validate_definition(&json!([1, 2]));
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Workflow definition must be an object"]);
    }

    #[test]
    fn test_definition_missing_steps() {
        let report = validate_definition(&json!({"name": "x"}));
        assert!(!report.valid);
        assert!(report.errors[0].contains("steps"));
    }

    #[test]
    fn test_definition_collects_every_problem() {
        let report = validate_definition(&json!({
            "name": "messy",
            "steps": [
                {"action_type": "wait", "delay_ms": "soon"},
                {"params": {}},
                "not a step",
                {"action_type": "notify", "stop_on_error": "yes", "delay_ms": -5}
            ]
        }));
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Step 1: delay_ms must be a non-negative integer",
                "Step 2: missing action_type",
                "Step 3: must be an object",
                "Step 4: delay_ms must be a non-negative integer",
                "Step 4: stop_on_error must be a boolean",
            ]
        );
    }

    #[test]
    fn test_definition_name_must_be_string_but_may_be_empty() {
        let report = validate_definition(&json!({"name": "", "steps": [{"action_type": "wait"}]}));
        assert!(report.valid);
        assert_eq!(report.warnings, vec!["Workflow name is empty"]);

        let report = validate_definition(&json!({"name": 7, "steps": []}));
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Workflow must have a string 'name'"]);
    }

    #[test]
    fn test_definition_empty_steps_warns() {
        let report = validate_definition(&json!({"name": "idle", "steps": []}));
        assert!(report.valid);
        assert_eq!(report.warnings, vec!["Workflow has no steps"]);
    }

    #[test]
    fn test_definition_duplicate_names_warn() {
        let report = validate_definition(&json!({
            "name": "dup",
            "steps": [
                {"name": "shot", "action_type": "screen_capture"},
                {"name": "shot", "action_type": "screen_capture"}
            ]
        }));
        assert!(report.valid);
        assert_eq!(report.warnings, vec!["Step 2: duplicate step name 'shot'"]);
    }
}
