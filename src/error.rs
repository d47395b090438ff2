//! # Acoustic Modem Error Handling
//!
//! This module defines the AudioModemError enum, which represents the different
//! error types that can occur in the audiomodem crate.

use thiserror::Error;

/// Represents the different error types that can occur in the crate.
#[derive(Debug, Error)]
pub enum AudioModemError {
    /// Indicates an operation was invoked before `configure`.
    #[error("Modem not configured")]
    NotConfigured,

    /// Indicates a configuration whose derived parameters violate an invariant.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Indicates a transport operation was requested while another is active.
    #[error("Transport busy: an operation is already in progress")]
    Busy,

    /// Indicates a send gave up after exhausting its retransmission budget.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u8 },

    /// Indicates an in-flight operation was terminated by `reset`.
    #[error("Operation cancelled by reset")]
    Reset,

    /// Indicates the underlying channel failed.
    #[error("Modem channel error: {0}")]
    ModemError(String),
}
