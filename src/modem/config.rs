//! # Modem Configuration
//!
//! Physical-layer parameters for the FSK modem and the quantities derived
//! from them. A configuration is validated once by
//! [`FskModem::configure`](crate::modem::FskModem::configure) and is
//! immutable afterwards; everything the per-sample pipeline needs
//! (samples per bit, center frequency, filter bandwidths) is derived here.

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_MARK_FREQ, DEFAULT_PREAMBLE, DEFAULT_PREFILTER_BANDWIDTH,
    DEFAULT_SAMPLE_RATE, DEFAULT_SFD, DEFAULT_SPACE_FREQ, DEFAULT_SYNC_THRESHOLD,
    MIN_SAMPLES_PER_BIT,
};
use crate::error::AudioModemError;

/// UART-style parity mode for the byte framing on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// FSK modem configuration.
///
/// `Default` yields the interoperable parameter set: 48 kHz sampling,
/// 300 baud, mark 1650 Hz / space 1850 Hz, 8N1 byte framing, preamble
/// `[0x55, 0x55]`, SFD `[0x7E]`, sync threshold 0.75, AGC enabled,
/// 800 Hz pre-filter bandwidth.
#[derive(Debug, Clone, PartialEq)]
pub struct ModemConfig {
    /// Audio sample rate in Hz
    pub sample_rate: u32,

    /// Symbol rate in bits per second
    pub baud_rate: u32,

    /// Frequency carrying bit 1, in Hz
    pub mark_freq: f32,

    /// Frequency carrying bit 0, in Hz
    pub space_freq: f32,

    /// Start bits per byte frame (currently fixed at 1)
    pub start_bits: u8,

    /// Stop bits per byte frame (currently fixed at 1)
    pub stop_bits: u8,

    /// Parity mode; the parity bit is transmitted but not verified on receive
    pub parity: Parity,

    /// Preamble byte pattern preceding the SFD
    pub preamble: Vec<u8>,

    /// Start frame delimiter byte pattern
    pub sfd: Vec<u8>,

    /// Correlation ratio in [0, 1] required to declare frame lock
    pub sync_threshold: f32,

    /// Enable the automatic gain control stage
    pub agc_enabled: bool,

    /// Band-pass pre-filter bandwidth in Hz; widened to the Carson
    /// bandwidth when configured narrower
    pub prefilter_bandwidth: f32,

    /// Reserved for adaptive bit-decision thresholding
    pub adaptive_threshold: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        ModemConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            baud_rate: DEFAULT_BAUD_RATE,
            mark_freq: DEFAULT_MARK_FREQ,
            space_freq: DEFAULT_SPACE_FREQ,
            start_bits: 1,
            stop_bits: 1,
            parity: Parity::None,
            preamble: DEFAULT_PREAMBLE.to_vec(),
            sfd: DEFAULT_SFD.to_vec(),
            sync_threshold: DEFAULT_SYNC_THRESHOLD,
            agc_enabled: true,
            prefilter_bandwidth: DEFAULT_PREFILTER_BANDWIDTH,
            adaptive_threshold: false,
        }
    }
}

impl ModemConfig {
    /// Integer audio samples representing one transmitted bit.
    pub fn samples_per_bit(&self) -> usize {
        (self.sample_rate / self.baud_rate) as usize
    }

    /// Bits on the wire per byte frame: start + data + parity + stop.
    pub fn bits_per_byte(&self) -> usize {
        let parity_bits = if self.parity == Parity::None { 0 } else { 1 };
        8 + self.start_bits as usize + self.stop_bits as usize + parity_bits
    }

    /// Midpoint between mark and space, the I/Q local oscillator frequency.
    pub fn center_freq(&self) -> f32 {
        (self.mark_freq + self.space_freq) / 2.0
    }

    /// Frequency deviation from center to either tone.
    pub fn deviation(&self) -> f32 {
        (self.space_freq - self.mark_freq).abs() / 2.0
    }

    /// Carson-rule occupied bandwidth of the FSK signal.
    pub fn carson_bandwidth(&self) -> f32 {
        2.0 * (self.deviation() + self.baud_rate as f32)
    }

    /// Pre-filter bandwidth actually applied: never narrower than Carson.
    pub fn effective_prefilter_bandwidth(&self) -> f32 {
        self.prefilter_bandwidth.max(self.carson_bandwidth())
    }

    /// Consecutive silent samples after which the demodulator declares
    /// end-of-data: one byte frame's worth.
    pub fn silence_threshold_samples(&self) -> usize {
        self.bits_per_byte() * self.samples_per_bit()
    }

    /// Check the derived invariants the demodulator arithmetic relies on.
    pub fn validate(&self) -> Result<(), AudioModemError> {
        if self.sample_rate == 0 || self.baud_rate == 0 {
            return Err(AudioModemError::InvalidConfig(
                "sample rate and baud rate must be non-zero".into(),
            ));
        }
        let spb = self.samples_per_bit();
        if spb < MIN_SAMPLES_PER_BIT {
            return Err(AudioModemError::InvalidConfig(format!(
                "samples per bit {spb} below minimum {MIN_SAMPLES_PER_BIT}"
            )));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if self.mark_freq >= nyquist || self.space_freq >= nyquist {
            return Err(AudioModemError::InvalidConfig(format!(
                "mark/space frequencies must stay below Nyquist ({nyquist} Hz)"
            )));
        }
        if self.mark_freq <= 0.0 || self.space_freq <= 0.0 {
            return Err(AudioModemError::InvalidConfig(
                "mark/space frequencies must be positive".into(),
            ));
        }
        if self.start_bits != 1 || self.stop_bits != 1 {
            return Err(AudioModemError::InvalidConfig(
                "only 1 start bit and 1 stop bit are supported".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sync_threshold) {
            return Err(AudioModemError::InvalidConfig(format!(
                "sync threshold {} outside [0, 1]",
                self.sync_threshold
            )));
        }
        if self.preamble.is_empty() && self.sfd.is_empty() {
            return Err(AudioModemError::InvalidConfig(
                "preamble and SFD cannot both be empty".into(),
            ));
        }
        Ok(())
    }
}
