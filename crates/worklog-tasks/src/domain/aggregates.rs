//! Aggregate root for tasks.

use worklog_core::aggregate::Aggregate;
use worklog_core::clock::Clock;
use worklog_core::error::DomainError;
use worklog_core::event::{EventRecord, LoggedBy};
use worklog_core::validation::Validator;

use super::events::{TASK_ADDED, TASK_COMPLETED, TaskAdded, TaskCompleted};

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// The aggregate root for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Stream identifier.
    pub id: String,
    pub(crate) version: i64,
    pub(crate) goal_id: String,
    pub(crate) title: String,
    pub(crate) done: bool,
}

impl Task {
    /// Returns the owning goal's stream id.
    #[must_use]
    pub fn goal_id(&self) -> &str {
        &self.goal_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns true once the task is completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Files the task under `goal_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Precondition` if the task already exists and
    /// `DomainError::Validation` listing every invalid input.
    pub fn add(
        &mut self,
        goal_id: &str,
        title: &str,
        logged_by: Option<LoggedBy>,
        clock: &dyn Clock,
    ) -> Result<EventRecord, DomainError> {
        if self.version != 0 {
            return Err(DomainError::Precondition(format!(
                "task {} already exists",
                self.id
            )));
        }
        Validator::new()
            .required("goal_id", goal_id)
            .required("title", title)
            .max_len("title", title, MAX_TITLE_LEN)
            .finish()?;

        let payload = TaskAdded {
            goal_id: goal_id.to_owned(),
            title: title.trim().to_owned(),
        };
        self.record(TASK_ADDED, &payload, logged_by, clock)
    }

    /// Marks the task done.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Precondition` if the task was never added or is
    /// already done.
    pub fn complete(
        &mut self,
        logged_by: Option<LoggedBy>,
        clock: &dyn Clock,
    ) -> Result<EventRecord, DomainError> {
        if self.version == 0 {
            return Err(DomainError::Precondition(format!(
                "task {} has not been added",
                self.id
            )));
        }
        if self.done {
            return Err(DomainError::Precondition("task is already completed".into()));
        }
        self.record(TASK_COMPLETED, &TaskCompleted {}, logged_by, clock)
    }
}

impl Aggregate for Task {
    fn create(stream_id: &str) -> Self {
        Self {
            id: stream_id.to_owned(),
            version: 0,
            goal_id: String::new(),
            title: String::new(),
            done: false,
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
            TASK_ADDED => {
                let body: TaskAdded = event.decode_payload()?;
                self.goal_id = body.goal_id;
                self.title = body.title;
            }
            TASK_COMPLETED => self.done = true,
            other => {
                return Err(DomainError::Infrastructure(format!(
                    "unknown task event type {other} in stream {}",
                    event.stream_id
                )));
            }
        }
        self.version = event.version;
        Ok(())
    }
}
