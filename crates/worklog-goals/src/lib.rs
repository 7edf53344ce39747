//! Worklog: goals module.
//!
//! A goal is a unit of work with a title, a priority and a small lifecycle:
//! pending, in progress, blocked, completed. Its read model lives in the
//! `goals` table, migrated from the `work/goals` namespace.

pub mod application;
pub mod domain;
pub mod projection;

pub use projection::GoalsModule;
