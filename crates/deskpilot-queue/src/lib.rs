//! Priority task queue for Deskpilot.
//!
//! Holds deferred units of work, dequeues them highest-priority first with
//! FIFO order inside a priority, bounds how many run at once, and keeps a
//! bounded history of terminal tasks.

pub mod error;
pub mod queue;
pub mod state_machine;
pub mod types;

pub use error::QueueError;
pub use queue::TaskQueue;
pub use types::{QueueStats, TaskRecord, TaskStatus};
