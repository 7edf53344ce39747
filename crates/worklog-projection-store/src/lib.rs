//! Worklog: projection store.
//!
//! Owns the SQLite database that projections write into, the namespaced
//! migration runner that prepares its schema, and the projections every
//! installation carries regardless of which domain modules are enabled.

pub mod activity;
pub mod db;
pub mod migrator;
pub mod module;

pub use db::{DbError, ProjectionDb};
pub use migrator::{MigrationError, Migrator};
pub use module::ProjectionModule;
