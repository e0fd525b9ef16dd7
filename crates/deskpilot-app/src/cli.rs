//! CLI argument definitions for the Deskpilot binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// Deskpilot: run desktop automation workflows through a prioritized task queue.
#[derive(Parser, Debug)]
#[command(name = "deskpilot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Approve every confirmation request without asking.
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered action types.
    Actions,
    /// List workflow templates.
    Templates,
    /// Validate workflow definition files without running them.
    Validate {
        /// Workflow JSON files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Run workflow files as queued tasks and print the results.
    Run {
        /// Workflow JSON files, or template names with --template.
        #[arg(required = true)]
        workflows: Vec<String>,

        /// Treat each argument as a template name instead of a file.
        #[arg(short = 't', long = "template")]
        template: bool,

        /// Initial context variable as KEY=VALUE; VALUE is parsed as JSON
        /// when possible, otherwise taken as a string.
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, Value)>,

        /// Queue priority for the submitted workflows (higher runs first).
        #[arg(short = 'p', long = "priority", default_value_t = 0, allow_negative_numbers = true)]
        priority: i32,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > DESKPILOT_CONFIG env var > ~/.deskpilot/config.toml
    /// (if present) > ./config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("DESKPILOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log filter directive.
    ///
    /// Priority: --log-level flag > config file value. `RUST_LOG` is applied
    /// on top of this by the subscriber.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Parse a `KEY=VALUE` context variable.
pub fn parse_var(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");

    if let Ok(home) = home {
        let path = PathBuf::from(home).join(".deskpilot").join("config.toml");
        if path.exists() {
            return path;
        }
    }
    PathBuf::from("config.toml")
}
