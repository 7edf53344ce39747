//! Command handlers for tasks.

use serde::Serialize;
use worklog_bus::{EventBus, persist_and_publish};
use worklog_core::aggregate::Aggregate;
use worklog_core::clock::Clock;
use worklog_core::error::DomainError;
use worklog_core::event::EventRecord;
use worklog_core::store::EventStore;
use worklog_goals::domain::aggregates::{Goal, GoalStatus};

use crate::domain::aggregates::Task;
use crate::domain::commands::{AddTask, CompleteTask};

/// Result of a successfully handled command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCommandResult {
    /// The task affected or created by the command.
    pub task_id: String,
    /// The record that was persisted.
    pub event: EventRecord,
}

/// Handles the `AddTask` command. The goal must exist and must not be
/// completed.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the goal stream is empty,
/// `DomainError::Precondition` if the goal is completed or the task
/// already exists, `DomainError::Validation` for invalid inputs, or any
/// store error.
pub async fn handle_add_task(
    command: &AddTask,
    clock: &dyn Clock,
    store: &dyn EventStore,
    bus: &EventBus,
) -> Result<TaskCommandResult, DomainError> {
    let goal_history = store.read_stream(&command.goal_id).await?;
    if goal_history.is_empty() {
        return Err(DomainError::AggregateNotFound(command.goal_id.clone()));
    }
    let goal = Goal::rehydrate(&command.goal_id, &goal_history)?;
    if goal.status() == GoalStatus::Completed {
        return Err(DomainError::Precondition(format!(
            "cannot add a task to completed goal {}",
            command.goal_id
        )));
    }

    let history = store.read_stream(&command.task_id).await?;
    let mut task = Task::rehydrate(&command.task_id, &history)?;
    let record = task.add(&command.goal_id, &command.title, command.logged_by, clock)?;
    let event = persist_and_publish(store, bus, record).await?;
    tracing::info!(task_id = %command.task_id, goal_id = %command.goal_id, "task added");
    Ok(TaskCommandResult {
        task_id: command.task_id.clone(),
        event,
    })
}

/// Handles the `CompleteTask` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown task,
/// `DomainError::Precondition` if it is already done, or any store error.
pub async fn handle_complete_task(
    command: &CompleteTask,
    clock: &dyn Clock,
    store: &dyn EventStore,
    bus: &EventBus,
) -> Result<TaskCommandResult, DomainError> {
    let history = store.read_stream(&command.task_id).await?;
    if history.is_empty() {
        return Err(DomainError::AggregateNotFound(command.task_id.clone()));
    }
    let mut task = Task::rehydrate(&command.task_id, &history)?;
    let record = task.complete(command.logged_by, clock)?;
    let event = persist_and_publish(store, bus, record).await?;
    Ok(TaskCommandResult {
        task_id: command.task_id.clone(),
        event,
    })
}
