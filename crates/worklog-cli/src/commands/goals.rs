//! `worklog goal ...`

use serde_json::Value;
use tracing::{info, instrument};
use worklog_core::event::LoggedBy;
use worklog_goals::application::{command_handlers, query_handlers};
use worklog_goals::domain::aggregates::GoalStatus;
use worklog_goals::domain::commands::{AddGoal, BlockGoal, CompleteGoal, StartGoal, UnblockGoal};

use crate::cli::GoalCommand;
use crate::error::AppError;
use crate::state::AppState;

/// Runs one goal subcommand.
///
/// # Errors
///
/// Returns `AppError::Domain` if the command is rejected or a query fails.
#[instrument(skip(state), fields(logged_by = %logged_by))]
pub async fn dispatch(
    command: GoalCommand,
    logged_by: LoggedBy,
    state: &AppState,
) -> Result<Value, AppError> {
    let logged_by = Some(logged_by);
    let clock = state.clock.as_ref();
    let store = state.store.as_ref();
    let bus = &state.bus;

    let result = match command {
        GoalCommand::Add {
            title,
            description,
            priority,
            id,
        } => {
            let command = AddGoal {
                goal_id: id.unwrap_or_else(AddGoal::new_goal_id),
                title,
                description,
                priority,
                logged_by,
            };
            info!(goal_id = %command.goal_id, "handling add_goal command");
            command_handlers::handle_add_goal(&command, clock, store, bus).await?
        }
        GoalCommand::Start { id } => {
            let command = StartGoal {
                goal_id: id,
                logged_by,
            };
            command_handlers::handle_start_goal(&command, clock, store, bus).await?
        }
        GoalCommand::Block { id, reason } => {
            let command = BlockGoal {
                goal_id: id,
                reason,
                logged_by,
            };
            command_handlers::handle_block_goal(&command, clock, store, bus).await?
        }
        GoalCommand::Unblock { id } => {
            let command = UnblockGoal {
                goal_id: id,
                logged_by,
            };
            command_handlers::handle_unblock_goal(&command, clock, store, bus).await?
        }
        GoalCommand::Complete { id } => {
            let command = CompleteGoal {
                goal_id: id,
                logged_by,
            };
            command_handlers::handle_complete_goal(&command, clock, store, bus).await?
        }
        GoalCommand::List { status } => {
            let status = status.as_deref().map(str::parse::<GoalStatus>).transpose()?;
            let goals = query_handlers::list_goals(state.db.pool(), status).await?;
            return Ok(serde_json::to_value(goals)?);
        }
        GoalCommand::Show { id } => {
            let goal = query_handlers::get_goal(state.db.pool(), &id).await?;
            return Ok(serde_json::to_value(goal)?);
        }
    };
    Ok(serde_json::to_value(result)?)
}
