//! # Upkeep Scheduler
//!
//! The maintenance engine: turns recurrence rules into concrete work orders,
//! spawns successors when scheduled work completes, and notifies assignees
//! about upcoming, due-today, and overdue work.
//!
//! ## Architecture
//! ```text
//! BackgroundRunner (tokio task, fixed cadence)
//!   ├── ScheduleEngine        — due templates → new work orders
//!   ├── LifecycleTracker      — completed work → successor work orders
//!   └── NotificationScheduler — threshold scan → email per assignee
//!                                 ├── upcoming  (due in N days)
//!                                 ├── due today
//!                                 └── overdue   (re-escalated daily)
//! ```
//!
//! The runner executes cycles sequentially; stages are isolated so a fault
//! in one never skips the others, and a failing cycle never kills the loop.

pub mod engine;
pub mod lifecycle;
pub mod notifier;
pub mod runner;
pub mod templates;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::{PassStats, ScheduleEngine};
pub use lifecycle::LifecycleTracker;
pub use notifier::{NotificationScheduler, NotifyStats};
pub use runner::BackgroundRunner;
