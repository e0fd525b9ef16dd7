pub mod config;
pub mod error;

pub use config::{DeskpilotConfig, ExecutorConfig, GeneralConfig, QueueConfig, WorkflowConfig};
pub use error::{DeskpilotError, Result};
