//! Domain events for goals.

use serde::{Deserialize, Serialize};

/// Event type for [`GoalAdded`].
pub const GOAL_ADDED: &str = "GoalAdded";
/// Event type for [`GoalStarted`].
pub const GOAL_STARTED: &str = "GoalStarted";
/// Event type for [`GoalBlocked`].
pub const GOAL_BLOCKED: &str = "GoalBlocked";
/// Event type for [`GoalUnblocked`].
pub const GOAL_UNBLOCKED: &str = "GoalUnblocked";
/// Event type for [`GoalCompleted`].
pub const GOAL_COMPLETED: &str = "GoalCompleted";

/// Every goal event type, in lifecycle order.
pub const GOAL_EVENT_TYPES: [&str; 5] = [
    GOAL_ADDED,
    GOAL_STARTED,
    GOAL_BLOCKED,
    GOAL_UNBLOCKED,
    GOAL_COMPLETED,
];

/// Emitted when a goal is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalAdded {
    /// Short title.
    pub title: String,
    /// Free-form description, possibly empty.
    pub description: String,
    /// `low`, `medium` or `high`.
    pub priority: String,
}

/// Emitted when work on a goal begins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStarted {}

/// Emitted when a goal is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalBlocked {
    /// Why the goal cannot proceed.
    pub reason: String,
}

/// Emitted when a blocked goal is released back to pending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalUnblocked {}

/// Emitted when a goal is finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalCompleted {}
