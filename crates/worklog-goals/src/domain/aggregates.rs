//! Aggregate root for goals.

use serde::{Deserialize, Serialize};
use worklog_core::aggregate::Aggregate;
use worklog_core::clock::Clock;
use worklog_core::error::DomainError;
use worklog_core::event::{EventRecord, LoggedBy};
use worklog_core::validation::Validator;

use super::events::{
    GOAL_ADDED, GOAL_BLOCKED, GOAL_COMPLETED, GOAL_STARTED, GOAL_UNBLOCKED, GoalAdded,
    GoalBlocked, GoalCompleted, GoalStarted, GoalUnblocked,
};

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 2000;
/// Maximum block reason length, in characters.
pub const MAX_REASON_LEN: usize = 500;
/// Accepted priority values.
pub const PRIORITIES: [&str; 3] = ["low", "medium", "high"];

/// Lifecycle status of a goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Added, not started.
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Waiting on something outside the goal.
    Blocked,
    /// Finished.
    Completed,
}

impl GoalStatus {
    /// Returns the name stored in the projection.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::Precondition(format!(
                "unknown goal status '{other}'"
            ))),
        }
    }
}

/// The aggregate root for a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    /// Stream identifier.
    pub id: String,
    /// Version of the last applied record.
    pub(crate) version: i64,
    /// Current lifecycle status.
    pub(crate) status: GoalStatus,
    /// Short title.
    pub(crate) title: String,
    /// Free-form description.
    pub(crate) description: String,
    /// `low`, `medium` or `high`.
    pub(crate) priority: String,
    /// Reason given by the last block, cleared on unblock.
    pub(crate) blocked_reason: Option<String>,
}

impl Goal {
    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> GoalStatus {
        self.status
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the priority.
    #[must_use]
    pub fn priority(&self) -> &str {
        &self.priority
    }

    /// Returns the block reason, if blocked.
    #[must_use]
    pub fn blocked_reason(&self) -> Option<&str> {
        self.blocked_reason.as_deref()
    }

    fn ensure_added(&self) -> Result<(), DomainError> {
        if self.version == 0 {
            return Err(DomainError::Precondition(format!(
                "goal {} has not been added",
                self.id
            )));
        }
        Ok(())
    }

    /// Adds the goal, producing a `GoalAdded` record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Precondition` if the goal already exists and
    /// `DomainError::Validation` listing every invalid input.
    pub fn add(
        &mut self,
        title: &str,
        description: &str,
        priority: &str,
        logged_by: Option<LoggedBy>,
        clock: &dyn Clock,
    ) -> Result<EventRecord, DomainError> {
        if self.version != 0 {
            return Err(DomainError::Precondition(format!(
                "goal {} already exists",
                self.id
            )));
        }
        Validator::new()
            .required("title", title)
            .max_len("title", title, MAX_TITLE_LEN)
            .max_len("description", description, MAX_DESCRIPTION_LEN)
            .one_of("priority", priority, &PRIORITIES)
            .finish()?;

        let payload = GoalAdded {
            title: title.trim().to_owned(),
            description: description.trim().to_owned(),
            priority: priority.to_owned(),
        };
        self.record(GOAL_ADDED, &payload, logged_by, clock)
    }

    /// Starts work on a pending goal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Precondition` unless the goal is pending.
    pub fn start(
        &mut self,
        logged_by: Option<LoggedBy>,
        clock: &dyn Clock,
    ) -> Result<EventRecord, DomainError> {
        self.ensure_added()?;
        let refusal = match self.status {
            GoalStatus::Pending => None,
            GoalStatus::InProgress => Some("goal is already in progress"),
            GoalStatus::Blocked => Some("cannot start a blocked goal"),
            GoalStatus::Completed => Some("cannot start a completed goal"),
        };
        if let Some(message) = refusal {
            return Err(DomainError::Precondition(message.to_owned()));
        }
        self.record(GOAL_STARTED, &GoalStarted {}, logged_by, clock)
    }

    /// Blocks a pending or in-progress goal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Precondition` if the goal is already blocked or
    /// completed, and `DomainError::Validation` for an invalid reason.
    pub fn block(
        &mut self,
        reason: &str,
        logged_by: Option<LoggedBy>,
        clock: &dyn Clock,
    ) -> Result<EventRecord, DomainError> {
        self.ensure_added()?;
        match self.status {
            GoalStatus::Pending | GoalStatus::InProgress => {}
            GoalStatus::Blocked => {
                return Err(DomainError::Precondition("goal is already blocked".into()));
            }
            GoalStatus::Completed => {
                return Err(DomainError::Precondition(
                    "cannot block a completed goal".into(),
                ));
            }
        }
        Validator::new()
            .required("reason", reason)
            .max_len("reason", reason, MAX_REASON_LEN)
            .finish()?;

        let payload = GoalBlocked {
            reason: reason.trim().to_owned(),
        };
        self.record(GOAL_BLOCKED, &payload, logged_by, clock)
    }

    /// Releases a blocked goal back to pending.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Precondition` unless the goal is blocked.
    pub fn unblock(
        &mut self,
        logged_by: Option<LoggedBy>,
        clock: &dyn Clock,
    ) -> Result<EventRecord, DomainError> {
        self.ensure_added()?;
        if self.status != GoalStatus::Blocked {
            return Err(DomainError::Precondition("goal is not blocked".into()));
        }
        self.record(GOAL_UNBLOCKED, &GoalUnblocked {}, logged_by, clock)
    }

    /// Completes a goal in progress.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Precondition` unless the goal is in progress.
    pub fn complete(
        &mut self,
        logged_by: Option<LoggedBy>,
        clock: &dyn Clock,
    ) -> Result<EventRecord, DomainError> {
        self.ensure_added()?;
        let refusal = match self.status {
            GoalStatus::InProgress => None,
            GoalStatus::Pending => Some("cannot complete a goal that has not been started"),
            GoalStatus::Blocked => Some("cannot complete a blocked goal"),
            GoalStatus::Completed => Some("goal is already completed"),
        };
        if let Some(message) = refusal {
            return Err(DomainError::Precondition(message.to_owned()));
        }
        self.record(GOAL_COMPLETED, &GoalCompleted {}, logged_by, clock)
    }
}

impl Aggregate for Goal {
    fn create(stream_id: &str) -> Self {
        Self {
            id: stream_id.to_owned(),
            version: 0,
            status: GoalStatus::Pending,
            title: String::new(),
            description: String::new(),
            priority: String::new(),
            blocked_reason: None,
        }
    }

    fn stream_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &EventRecord) -> Result<(), DomainError> {
        match event.event_type.as_str() {
            GOAL_ADDED => {
                let body: GoalAdded = event.decode_payload()?;
                self.title = body.title;
                self.description = body.description;
                self.priority = body.priority;
                self.status = GoalStatus::Pending;
            }
            GOAL_STARTED => self.status = GoalStatus::InProgress,
            GOAL_BLOCKED => {
                let body: GoalBlocked = event.decode_payload()?;
                self.status = GoalStatus::Blocked;
                self.blocked_reason = Some(body.reason);
            }
            GOAL_UNBLOCKED => {
                self.status = GoalStatus::Pending;
                self.blocked_reason = None;
            }
            GOAL_COMPLETED => self.status = GoalStatus::Completed,
            other => {
                return Err(DomainError::Infrastructure(format!(
                    "unknown goal event type {other} in stream {}",
                    event.stream_id
                )));
            }
        }
        self.version = event.version;
        Ok(())
    }
}
