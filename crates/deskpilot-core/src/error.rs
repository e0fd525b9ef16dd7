use thiserror::Error;

/// Top-level error type for the Deskpilot system.
///
/// Each subsystem crate defines its own error type and implements
/// `From<SubsystemError> for DeskpilotError` so that the `?` operator works
/// across crate boundaries in the composition root.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeskpilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Action error: {0}")]
    Action(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for DeskpilotError {
    fn from(err: toml::de::Error) -> Self {
        DeskpilotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DeskpilotError {
    fn from(err: toml::ser::Error) -> Self {
        DeskpilotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DeskpilotError {
    fn from(err: serde_json::Error) -> Self {
        DeskpilotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Deskpilot operations.
pub type Result<T> = std::result::Result<T, DeskpilotError>;
