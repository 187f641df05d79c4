//! Error taxonomy for the Upkeep engine.

use thiserror::Error;

/// All errors produced by Upkeep crates.
#[derive(Debug, Error)]
pub enum UpkeepError {
    /// Configuration could not be read, parsed, or validated.
    #[error("Config error: {0}")]
    Config(String),

    /// A single store operation failed (query, insert, update).
    #[error("Store error: {0}")]
    Store(String),

    /// The store could not be reached at all; aborts the current stage.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store rejected a work order insert (e.g. a dangling equipment or
    /// craftsman reference). Not retried within the same cycle.
    #[error("Work order generation failed: {0}")]
    Generation(String),

    /// A notification could not be delivered (SMTP/network/auth failure).
    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UpkeepError>;
