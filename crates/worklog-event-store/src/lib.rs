//! Worklog Event Store: durable per-stream event files.
//!
//! Each stream is a directory under the store root and each record is one
//! pretty-printed JSON file named `{seq:06}.{type}.json`.

pub mod fs_event_store;
pub mod layout;
pub mod stored;
