//! # Wire Bit Framing
//!
//! UART-style expansion of bytes into on-air bits: start bits (0), eight
//! data bits MSB-first, an optional parity bit, stop bits (1). The same
//! expansion builds the preamble+SFD pattern the synchronizer correlates
//! against, so modulator and demodulator cannot drift apart.

use crate::modem::config::{ModemConfig, Parity};

/// Parity bit for a data byte, or `None` when parity is disabled.
pub fn parity_bit(byte: u8, parity: Parity) -> Option<u8> {
    let ones = byte.count_ones() as u8;
    match parity {
        Parity::None => None,
        Parity::Even => Some(ones & 1),
        Parity::Odd => Some(1 - (ones & 1)),
    }
}

/// Expand one byte into its on-air bit sequence.
pub fn byte_wire_bits(byte: u8, config: &ModemConfig) -> Vec<u8> {
    let mut bits = Vec::with_capacity(config.bits_per_byte());
    for _ in 0..config.start_bits {
        bits.push(0);
    }
    for pos in (0..8).rev() {
        bits.push((byte >> pos) & 1);
    }
    if let Some(parity) = parity_bit(byte, config.parity) {
        bits.push(parity);
    }
    for _ in 0..config.stop_bits {
        bits.push(1);
    }
    bits
}

/// The expected bit pattern of the preamble followed by the SFD, used by
/// the frame synchronizer's correlation match.
pub fn sync_pattern(config: &ModemConfig) -> Vec<u8> {
    let mut pattern =
        Vec::with_capacity((config.preamble.len() + config.sfd.len()) * config.bits_per_byte());
    for &byte in config.preamble.iter().chain(config.sfd.iter()) {
        pattern.extend(byte_wire_bits(byte, config));
    }
    pattern
}
