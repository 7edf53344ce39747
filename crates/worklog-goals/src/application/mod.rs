//! Application layer for goals.

pub mod command_handlers;
pub mod query_handlers;
