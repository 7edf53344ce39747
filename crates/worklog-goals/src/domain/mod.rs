//! Domain layer for goals.

pub mod aggregates;
pub mod commands;
pub mod events;
