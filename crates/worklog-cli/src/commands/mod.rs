//! Subcommand dispatch.
//!
//! Every subcommand returns a JSON value that `main` prints on stdout.

pub mod goals;
pub mod maintenance;
pub mod tasks;

use std::sync::Arc;

use serde_json::Value;
use worklog_core::clock::{Clock, SystemClock};

use crate::cli::{Cli, Command, WorkCommand};
use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;

/// Runs one parsed command against the wall clock.
///
/// # Errors
///
/// Returns whatever the command failed with.
pub async fn run(cli: Cli, config: &Config) -> Result<Value, AppError> {
    run_with_clock(cli, config, Arc::new(SystemClock)).await
}

/// Runs one parsed command, stamping new records with `clock`.
///
/// # Errors
///
/// Returns whatever the command failed with.
pub async fn run_with_clock(
    cli: Cli,
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<Value, AppError> {
    match cli.command {
        Command::Migrate => maintenance::migrate(config, clock).await,
        Command::Verify => maintenance::verify(config, clock).await,
        Command::Rebuild { yes } => maintenance::rebuild(config, clock, yes).await,
        Command::Work(work) => {
            let state = AppState::open(config, clock).await?;
            let output = match work {
                WorkCommand::Goal(goal) => goals::dispatch(goal, cli.logged_by, &state).await,
                WorkCommand::Task(task) => tasks::dispatch(task, cli.logged_by, &state).await,
                WorkCommand::Activity { limit } => maintenance::activity(&state, limit).await,
            };
            state.close().await?;
            output
        }
    }
}
