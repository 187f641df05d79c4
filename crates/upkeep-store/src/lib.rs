//! # Upkeep Store
//!
//! SQLite persistence for work orders, templates, schedules, and personnel.
//! Implements the `WorkOrderStore` trait the scheduler consumes.

pub mod sqlite;

pub use sqlite::SqliteWorkOrderStore;
