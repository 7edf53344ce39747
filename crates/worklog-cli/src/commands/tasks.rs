//! `worklog task ...`

use serde_json::Value;
use tracing::{info, instrument};
use worklog_core::event::LoggedBy;
use worklog_tasks::application::{command_handlers, query_handlers};
use worklog_tasks::domain::commands::{AddTask, CompleteTask};

use crate::cli::TaskCommand;
use crate::error::AppError;
use crate::state::AppState;

/// Runs one task subcommand.
///
/// # Errors
///
/// Returns `AppError::Domain` if the command is rejected or a query fails.
#[instrument(skip(state), fields(logged_by = %logged_by))]
pub async fn dispatch(
    command: TaskCommand,
    logged_by: LoggedBy,
    state: &AppState,
) -> Result<Value, AppError> {
    let logged_by = Some(logged_by);
    let clock = state.clock.as_ref();
    let store = state.store.as_ref();

    match command {
        TaskCommand::Add { goal_id, title, id } => {
            let command = AddTask {
                task_id: id.unwrap_or_else(AddTask::new_task_id),
                goal_id,
                title,
                logged_by,
            };
            info!(task_id = %command.task_id, goal_id = %command.goal_id, "handling add_task command");
            let result =
                command_handlers::handle_add_task(&command, clock, store, &state.bus).await?;
            Ok(serde_json::to_value(result)?)
        }
        TaskCommand::Complete { id } => {
            let command = CompleteTask {
                task_id: id,
                logged_by,
            };
            let result =
                command_handlers::handle_complete_task(&command, clock, store, &state.bus).await?;
            Ok(serde_json::to_value(result)?)
        }
        TaskCommand::List { goal } => {
            let tasks = query_handlers::list_tasks(state.db.pool(), goal.as_deref()).await?;
            Ok(serde_json::to_value(tasks)?)
        }
    }
}
