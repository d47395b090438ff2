//! Acoustic Modem Protocol Constants
//!
//! This module defines the wire-level constants of the packet transport and
//! the physical-layer defaults and DSP tuning values used by the FSK modem.

// ----------------------------------------------------------------------------
// Packet transport wire constants
// ----------------------------------------------------------------------------

/// Start-of-header byte opening every data packet
pub const SOH: u8 = 0x01;

/// Positive acknowledgement control byte
pub const ACK: u8 = 0x06;

/// Negative acknowledgement control byte
pub const NAK: u8 = 0x15;

/// End-of-transmission control byte
pub const EOT: u8 = 0x04;

/// Fixed packet bytes surrounding the payload: SOH, SEQ, ~SEQ, LEN, CRC16
pub const PACKET_OVERHEAD: usize = 6;

/// Largest payload a single packet can carry (LEN is one byte)
pub const MAX_PACKET_PAYLOAD: usize = 255;

/// Default acknowledgement timeout per fragment
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 3000;

/// Default number of retransmissions before a send gives up
pub const DEFAULT_MAX_RETRIES: u8 = 10;

/// Default fragment size for outgoing payloads
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 128;

// ----------------------------------------------------------------------------
// Physical-layer defaults (interoperable parameter set)
// ----------------------------------------------------------------------------

/// Default audio sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default symbol rate in bits per second
pub const DEFAULT_BAUD_RATE: u32 = 300;

/// Default mark (bit 1) frequency in Hz
pub const DEFAULT_MARK_FREQ: f32 = 1650.0;

/// Default space (bit 0) frequency in Hz
pub const DEFAULT_SPACE_FREQ: f32 = 1850.0;

/// Default preamble byte pattern
pub const DEFAULT_PREAMBLE: [u8; 2] = [0x55, 0x55];

/// Default start frame delimiter byte pattern
pub const DEFAULT_SFD: [u8; 1] = [0x7E];

/// Default correlation ratio required to declare frame lock
pub const DEFAULT_SYNC_THRESHOLD: f32 = 0.75;

/// Default band-pass pre-filter bandwidth in Hz
pub const DEFAULT_PREFILTER_BANDWIDTH: f32 = 800.0;

// ----------------------------------------------------------------------------
// DSP tuning
// ----------------------------------------------------------------------------

/// Peak amplitude of transmitted tones
pub const TX_AMPLITUDE: f32 = 0.5;

/// Smallest integer samples-per-bit ratio the demodulator can track
pub const MIN_SAMPLES_PER_BIT: usize = 4;

/// I/Q envelope below this level counts as channel silence
pub const SILENCE_AMPLITUDE: f32 = 0.01;

/// AGC output magnitude target
pub const AGC_TARGET_LEVEL: f32 = 0.5;

/// AGC gain clamp, lower bound
pub const AGC_MIN_GAIN: f32 = 0.1;

/// AGC gain clamp, upper bound
pub const AGC_MAX_GAIN: f32 = 10.0;

/// AGC envelope attack time constant in milliseconds
pub const AGC_ATTACK_MS: f32 = 1.0;

/// AGC envelope release time constant in milliseconds
pub const AGC_RELEASE_MS: f32 = 10.0;

/// Extra bit cells kept in the sync ring beyond the expected pattern
pub const SYNC_RING_MARGIN: usize = 32;

/// Sample block size the channel adaptor streams audio in
pub const AUDIO_BLOCK_SIZE: usize = 128;
