//! Notification delivery for Upkeep — SMTP email sending backed by a
//! persistent audit log of every attempt.

pub mod email;
pub mod log;

pub use email::EmailNotifier;
pub use log::NotificationLog;
