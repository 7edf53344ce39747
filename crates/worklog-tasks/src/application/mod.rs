//! Application layer for tasks.

pub mod command_handlers;
pub mod query_handlers;
