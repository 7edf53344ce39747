//! Domain layer for tasks.

pub mod aggregates;
pub mod commands;
pub mod events;
