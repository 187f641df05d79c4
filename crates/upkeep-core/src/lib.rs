//! # Upkeep Core
//!
//! Shared foundation for the Upkeep maintenance engine: the work order data
//! model, recurrence-rule date math, the collaborator traits the scheduler
//! consumes (`WorkOrderStore`, `NotificationSender`), the error taxonomy,
//! and TOML configuration.

pub mod config;
pub mod error;
pub mod recurrence;
pub mod traits;
pub mod types;

pub use config::UpkeepConfig;
pub use error::{Result, UpkeepError};
pub use recurrence::{RecurrenceRule, RecurrenceUnit};
pub use traits::{NotificationSender, WorkOrderStore};
pub use types::{
    Assignment, NewWorkOrder, NotificationKind, NotificationMessage, NotificationRecord,
    NotificationStatus, Priority, WorkOrderInstance, WorkOrderStatus, WorkOrderTemplate,
};
