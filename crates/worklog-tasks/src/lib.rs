//! Worklog: tasks module.
//!
//! A task is a small piece of work filed under a goal. The `tasks` read
//! model copies the goal's title from the `goals` projection when the task
//! is added, so it must be projected after the goal it belongs to.

pub mod application;
pub mod domain;
pub mod projection;

pub use projection::TasksModule;
