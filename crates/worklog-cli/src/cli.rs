//! Argument definitions.

use clap::{Parser, Subcommand};
use worklog_core::event::LoggedBy;

/// Event-sourced work log.
#[derive(Debug, Parser)]
#[command(name = "worklog")]
#[command(about = "Event-sourced work log", long_about = None)]
pub struct Cli {
    /// Who is issuing the command: `human` or `machine`.
    #[arg(long, global = true, default_value = "human")]
    pub logged_by: LoggedBy,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending projection migrations.
    Migrate,
    /// Check applied migrations against the files on disk.
    Verify,
    /// Delete the projection database and replay the event log into it.
    Rebuild {
        /// Confirm that the projection database may be deleted.
        #[arg(long)]
        yes: bool,
    },
    #[command(flatten)]
    Work(WorkCommand),
}

/// Subcommands that run against the migrated projection database and the
/// live bus.
#[derive(Debug, Subcommand)]
pub enum WorkCommand {
    /// Goal commands and queries.
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Task commands and queries.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Show the most recent events.
    Activity {
        /// Maximum number of rows, at least 1.
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },
}

/// `worklog goal ...`
#[derive(Debug, Subcommand)]
pub enum GoalCommand {
    /// Add a goal.
    Add {
        /// Short title.
        title: String,
        /// Free-form description.
        #[arg(long, default_value = "")]
        description: String,
        /// `low`, `medium` or `high`.
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Stream id to use instead of a generated one.
        #[arg(long)]
        id: Option<String>,
    },
    /// Start a pending goal.
    Start {
        /// Goal id.
        id: String,
    },
    /// Block a goal.
    Block {
        /// Goal id.
        id: String,
        /// Why the goal is blocked.
        #[arg(long)]
        reason: String,
    },
    /// Return a blocked goal to pending.
    Unblock {
        /// Goal id.
        id: String,
    },
    /// Complete a goal in progress.
    Complete {
        /// Goal id.
        id: String,
    },
    /// List goals.
    List {
        /// Only goals with this status.
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one goal.
    Show {
        /// Goal id.
        id: String,
    },
}

/// `worklog task ...`
#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Add a task under a goal.
    Add {
        /// Owning goal id.
        goal_id: String,
        /// Short title.
        title: String,
        /// Stream id to use instead of a generated one.
        #[arg(long)]
        id: Option<String>,
    },
    /// Complete a task.
    Complete {
        /// Task id.
        id: String,
    },
    /// List tasks.
    List {
        /// Only tasks filed under this goal.
        #[arg(long)]
        goal: Option<String>,
    },
}
