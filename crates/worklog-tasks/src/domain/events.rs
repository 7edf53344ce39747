//! Domain events for tasks.

use serde::{Deserialize, Serialize};

/// Event type for [`TaskAdded`].
pub const TASK_ADDED: &str = "TaskAdded";
/// Event type for [`TaskCompleted`].
pub const TASK_COMPLETED: &str = "TaskCompleted";

/// Emitted when a task is filed under a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAdded {
    /// Stream id of the owning goal.
    pub goal_id: String,
    /// Short title.
    pub title: String,
}

/// Emitted when a task is done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompleted {}
