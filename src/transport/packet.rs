//! # Packet Codec
//!
//! Wire-level data unit of the reliable transport:
//!
//! ```text
//! ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌───────────┐ ┌─────────┐
//! │ SOH  │ │ SEQ  │ │ ~SEQ │ │ LEN  │ │  PAYLOAD  │ │ CRC-16  │
//! │ 0x01 │ │1..255│ │      │ │0..255│ │  LEN B    │ │ MSB 1st │
//! └──────┘ └──────┘ └──────┘ └──────┘ └───────────┘ └─────────┘
//! ```
//!
//! The CRC-16-CCITT covers the four header bytes and the payload.
//! Sequence numbers wrap through 1..255; 0 is reserved. Control bytes
//! (ACK/NAK/EOT) travel as single raw bytes with no framing and no CRC.

use crate::constants::{ACK, EOT, MAX_PACKET_PAYLOAD, NAK, PACKET_OVERHEAD, SOH};
use crate::util::crc16::crc16_ccitt;
use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;
use thiserror::Error;

/// Packet-level rejection reasons. These are events to the processing
/// loop, not operation failures: the loop logs them, NAKs, and continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Buffer too short: need {needed} bytes, got {actual}")]
    BufferTooShort { needed: usize, actual: usize },

    #[error("Invalid start of header: 0x{0:02X}")]
    InvalidSoh(u8),

    #[error("Sequence complement mismatch: SEQ 0x{sequence:02X}, ~SEQ 0x{complement:02X}")]
    SequenceComplementMismatch { sequence: u8, complement: u8 },

    #[error("Sequence 0 is reserved")]
    ReservedSequence,

    #[error("CRC mismatch: expected {expected:04X}, calculated {calculated:04X}")]
    CrcMismatch { expected: u16, calculated: u16 },

    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}

/// A single ARQ data packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub sequence: u8,
    pub payload: Vec<u8>,
}

/// Single-byte control characters of the ARQ protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlByte {
    Ack,
    Nak,
    Eot,
}

impl ControlByte {
    pub fn as_u8(&self) -> u8 {
        match self {
            ControlByte::Ack => ACK,
            ControlByte::Nak => NAK,
            ControlByte::Eot => EOT,
        }
    }
}

impl TryFrom<u8> for ControlByte {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            ACK => Ok(ControlByte::Ack),
            NAK => Ok(ControlByte::Nak),
            EOT => Ok(ControlByte::Eot),
            other => Err(other),
        }
    }
}

/// Next sequence number: wraps through 1..255, never visiting 0.
pub fn next_sequence(seq: u8) -> u8 {
    (seq % 255) + 1
}

/// Structural parse of the fixed-offset fields; semantic checks follow in
/// [`Packet::parse`].
fn parse_fields(input: &[u8]) -> IResult<&[u8], (u8, u8, u8, &[u8], u16)> {
    let (input, soh) = be_u8(input)?;
    let (input, sequence) = be_u8(input)?;
    let (input, complement) = be_u8(input)?;
    let (input, len) = be_u8(input)?;
    let (input, payload) = take(len as usize)(input)?;
    let (input, crc) = be_u16(input)?;
    Ok((input, (soh, sequence, complement, payload, crc)))
}

impl Packet {
    /// Create a packet, rejecting the reserved sequence 0 and oversized
    /// payloads.
    pub fn new(sequence: u8, payload: Vec<u8>) -> Result<Self, PacketError> {
        if sequence == 0 {
            return Err(PacketError::ReservedSequence);
        }
        if payload.len() > MAX_PACKET_PAYLOAD {
            return Err(PacketError::PayloadTooLarge(payload.len()));
        }
        Ok(Packet { sequence, payload })
    }

    /// Serialize to wire form, CRC appended MSB-first.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(PACKET_OVERHEAD + self.payload.len());
        buf.put_u8(SOH);
        buf.put_u8(self.sequence);
        buf.put_u8(!self.sequence);
        buf.put_u8(self.payload.len() as u8);
        buf.put_slice(&self.payload);
        let crc = crc16_ccitt(&buf);
        buf.put_u16(crc);
        buf.to_vec()
    }

    /// Parse and verify a wire buffer.
    ///
    /// Rejections, in order: buffer shorter than the fixed overhead, bad
    /// SOH, complement mismatch, reserved sequence, buffer shorter than
    /// the length field implies, CRC mismatch.
    pub fn parse(input: &[u8]) -> Result<Packet, PacketError> {
        if input.len() < PACKET_OVERHEAD {
            return Err(PacketError::BufferTooShort {
                needed: PACKET_OVERHEAD,
                actual: input.len(),
            });
        }
        if input[0] != SOH {
            return Err(PacketError::InvalidSoh(input[0]));
        }
        let sequence = input[1];
        let complement = input[2];
        if complement != !sequence {
            return Err(PacketError::SequenceComplementMismatch {
                sequence,
                complement,
            });
        }
        if sequence == 0 {
            return Err(PacketError::ReservedSequence);
        }

        let (_, (_, _, _, payload, wire_crc)) =
            parse_fields(input).map_err(|_| PacketError::BufferTooShort {
                needed: PACKET_OVERHEAD + input[3] as usize,
                actual: input.len(),
            })?;

        let covered = 4 + payload.len();
        let calculated = crc16_ccitt(&input[..covered]);
        if calculated != wire_crc {
            return Err(PacketError::CrcMismatch {
                expected: wire_crc,
                calculated,
            });
        }

        Ok(Packet {
            sequence,
            payload: payload.to_vec(),
        })
    }
}
