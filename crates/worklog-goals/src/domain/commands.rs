//! Commands for goals.

use uuid::Uuid;
use worklog_core::event::LoggedBy;

/// Command to add a new goal.
#[derive(Debug, Clone)]
pub struct AddGoal {
    /// Stream id of the new goal.
    pub goal_id: String,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// `low`, `medium` or `high`.
    pub priority: String,
    /// Who issued the command.
    pub logged_by: Option<LoggedBy>,
}

impl AddGoal {
    /// Generates a fresh, time-ordered goal stream id.
    #[must_use]
    pub fn new_goal_id() -> String {
        format!("goal-{}", Uuid::now_v7())
    }
}

/// Command to start work on a pending goal.
#[derive(Debug, Clone)]
pub struct StartGoal {
    /// The goal stream id.
    pub goal_id: String,
    /// Who issued the command.
    pub logged_by: Option<LoggedBy>,
}

/// Command to block a goal.
#[derive(Debug, Clone)]
pub struct BlockGoal {
    /// The goal stream id.
    pub goal_id: String,
    /// Why the goal cannot proceed.
    pub reason: String,
    /// Who issued the command.
    pub logged_by: Option<LoggedBy>,
}

/// Command to release a blocked goal.
#[derive(Debug, Clone)]
pub struct UnblockGoal {
    /// The goal stream id.
    pub goal_id: String,
    /// Who issued the command.
    pub logged_by: Option<LoggedBy>,
}

/// Command to complete a goal in progress.
#[derive(Debug, Clone)]
pub struct CompleteGoal {
    /// The goal stream id.
    pub goal_id: String,
    /// Who issued the command.
    pub logged_by: Option<LoggedBy>,
}
