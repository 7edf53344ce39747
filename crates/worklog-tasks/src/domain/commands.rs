//! Commands for tasks.

use uuid::Uuid;
use worklog_core::event::LoggedBy;

/// Command to file a new task under a goal.
#[derive(Debug, Clone)]
pub struct AddTask {
    /// Stream id of the new task.
    pub task_id: String,
    /// Stream id of the owning goal.
    pub goal_id: String,
    /// Short title.
    pub title: String,
    /// Who issued the command.
    pub logged_by: Option<LoggedBy>,
}

impl AddTask {
    /// Generates a fresh, time-ordered task stream id.
    #[must_use]
    pub fn new_task_id() -> String {
        format!("task-{}", Uuid::now_v7())
    }
}

/// Command to mark a task done.
#[derive(Debug, Clone)]
pub struct CompleteTask {
    /// The task stream id.
    pub task_id: String,
    /// Who issued the command.
    pub logged_by: Option<LoggedBy>,
}
