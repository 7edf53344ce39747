//! Command handlers for goals.
//!
//! Each handler loads the goal's stream, rehydrates the aggregate, runs one
//! command method, then persists and publishes the resulting record.

use serde::Serialize;
use worklog_bus::{EventBus, persist_and_publish};
use worklog_core::aggregate::Aggregate;
use worklog_core::clock::Clock;
use worklog_core::error::DomainError;
use worklog_core::event::EventRecord;
use worklog_core::store::EventStore;

use crate::domain::aggregates::Goal;
use crate::domain::commands::{AddGoal, BlockGoal, CompleteGoal, StartGoal, UnblockGoal};

/// Result of a successfully handled command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCommandResult {
    /// The goal affected or created by the command.
    pub goal_id: String,
    /// The record that was persisted.
    pub event: EventRecord,
}

/// Loads and rehydrates an existing goal.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the stream is empty, or any
/// store or rehydration error.
pub(crate) async fn load_goal(goal_id: &str, store: &dyn EventStore) -> Result<Goal, DomainError> {
    let history = store.read_stream(goal_id).await?;
    if history.is_empty() {
        return Err(DomainError::AggregateNotFound(goal_id.to_owned()));
    }
    Goal::rehydrate(goal_id, &history)
}

async fn commit(
    goal_id: &str,
    record: EventRecord,
    store: &dyn EventStore,
    bus: &EventBus,
) -> Result<GoalCommandResult, DomainError> {
    let event = persist_and_publish(store, bus, record).await?;
    tracing::info!(goal_id, event_type = %event.event_type, version = event.version, "goal updated");
    Ok(GoalCommandResult {
        goal_id: goal_id.to_owned(),
        event,
    })
}

/// Handles the `AddGoal` command.
///
/// # Errors
///
/// Returns `DomainError::Precondition` if the goal already exists,
/// `DomainError::Validation` for invalid inputs, or any store error.
pub async fn handle_add_goal(
    command: &AddGoal,
    clock: &dyn Clock,
    store: &dyn EventStore,
    bus: &EventBus,
) -> Result<GoalCommandResult, DomainError> {
    let history = store.read_stream(&command.goal_id).await?;
    let mut goal = Goal::rehydrate(&command.goal_id, &history)?;
    let record = goal.add(
        &command.title,
        &command.description,
        &command.priority,
        command.logged_by,
        clock,
    )?;
    commit(&command.goal_id, record, store, bus).await
}

/// Handles the `StartGoal` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown goal,
/// `DomainError::Precondition` unless it is pending, or any store error.
pub async fn handle_start_goal(
    command: &StartGoal,
    clock: &dyn Clock,
    store: &dyn EventStore,
    bus: &EventBus,
) -> Result<GoalCommandResult, DomainError> {
    let mut goal = load_goal(&command.goal_id, store).await?;
    let record = goal.start(command.logged_by, clock)?;
    commit(&command.goal_id, record, store, bus).await
}

/// Handles the `BlockGoal` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown goal,
/// `DomainError::Precondition` if it cannot be blocked,
/// `DomainError::Validation` for an invalid reason, or any store error.
pub async fn handle_block_goal(
    command: &BlockGoal,
    clock: &dyn Clock,
    store: &dyn EventStore,
    bus: &EventBus,
) -> Result<GoalCommandResult, DomainError> {
    let mut goal = load_goal(&command.goal_id, store).await?;
    let record = goal.block(&command.reason, command.logged_by, clock)?;
    commit(&command.goal_id, record, store, bus).await
}

/// Handles the `UnblockGoal` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown goal,
/// `DomainError::Precondition` unless it is blocked, or any store error.
pub async fn handle_unblock_goal(
    command: &UnblockGoal,
    clock: &dyn Clock,
    store: &dyn EventStore,
    bus: &EventBus,
) -> Result<GoalCommandResult, DomainError> {
    let mut goal = load_goal(&command.goal_id, store).await?;
    let record = goal.unblock(command.logged_by, clock)?;
    commit(&command.goal_id, record, store, bus).await
}

/// Handles the `CompleteGoal` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown goal,
/// `DomainError::Precondition` unless it is in progress, or any store error.
pub async fn handle_complete_goal(
    command: &CompleteGoal,
    clock: &dyn Clock,
    store: &dyn EventStore,
    bus: &EventBus,
) -> Result<GoalCommandResult, DomainError> {
    let mut goal = load_goal(&command.goal_id, store).await?;
    let record = goal.complete(command.logged_by, clock)?;
    commit(&command.goal_id, record, store, bus).await
}
