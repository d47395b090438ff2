//! # audiomodem - Reliable Data Transmission over an Acoustic FSK Channel
//!
//! The audiomodem crate transmits arbitrary byte streams across an acoustic
//! channel: a continuous-phase binary FSK modem turns bytes into
//! audible-band f32 samples and streams samples back into bytes, and a
//! stop-and-wait ARQ packet transport layered on top provides reliable,
//! ordered, fragmented delivery over that modem.
//!
//! ## Features
//!
//! - Sample-by-sample FSK demodulation: AGC, band-pass pre-filtering, I/Q
//!   mixdown, phase discrimination, majority-vote bit integration
//! - Correlation-based frame synchronization tolerant of partial preamble
//!   loss and modest preamble bit errors
//! - XModem-style packets with CRC-16-CCITT and sequence complements
//! - Stop-and-wait ACK/NAK/EOT state machine with timeouts and retries
//! - Async `DataChannel` boundary between transport and modem, with a
//!   sample-block bridge for audio adaptors and a mock for tests
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```rust
//! use audiomodem::{FskModem, ModemConfig};
//!
//! let mut modem = FskModem::new();
//! modem.configure(ModemConfig::default()).unwrap();
//!
//! let samples = modem.modulate(&[0x48, 0x69]).unwrap();
//! let bytes = modem.demodulate(&samples).unwrap();
//! assert_eq!(bytes, vec![0x48, 0x69]);
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod modem;
pub mod transport;
pub mod util;

pub use crate::error::AudioModemError;
pub use crate::logging::init_logger;

// Physical modem
pub use modem::{FskModem, ModemConfig, ModemStats, Parity};

// Reliable transport
pub use transport::{
    modem_channel_pair, ControlByte, DataChannel, MockChannel, ModemChannel, Packet, PacketError,
    ReliableTransport, ResetSignal, TransportConfig, TransportPhase, TransportStats,
};
