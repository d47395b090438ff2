//! # Logging Initialization
//!
//! This crate logs through the `log` facade: the transport records state
//! transitions and rejected packets at `debug`/`warn`, the modem records
//! frame lock, aborts and end-of-data at `debug`. [`init_logger`] installs
//! the `env_logger` backend once at startup; the `RUST_LOG` environment
//! variable selects the level as usual.

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    env_logger::init();
}
