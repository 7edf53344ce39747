//! Worklog Core: event-sourcing abstractions.
//!
//! This crate defines the record shape every fact is stored as, the
//! aggregate replay contract, and the traits that storage and projection
//! crates implement. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod handler;
pub mod store;
pub mod validation;
