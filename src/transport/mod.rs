//! # Reliable Transport
//!
//! Stop-and-wait ARQ over a [`DataChannel`]: outgoing payloads are split
//! into numbered packets protected by CRC-16-CCITT, each acknowledged by
//! the peer before the next is sent; the receive side reassembles payloads
//! in sequence order until EOT. Retries and timeouts are the only local
//! recovery; everything else surfaces as an error or, for malformed
//! packets, a logged event.
//!
//! The transport is single-threaded cooperative: `send` and `receive`
//! suspend their caller and drive the processing loop internally, so the
//! loop is the only place the channel is polled and timeout handling can
//! never race response handling.

pub mod channel;
pub mod channel_mock;
pub mod packet;

pub use channel::{modem_channel_pair, DataChannel, ModemChannel};
pub use channel_mock::MockChannel;
pub use packet::{next_sequence, ControlByte, Packet, PacketError};

use crate::constants::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_MAX_RETRIES, MAX_PACKET_PAYLOAD,
};
use crate::error::AudioModemError;
use crate::util::hex::pretty_hex;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};

/// ARQ tuning parameters.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// How long to wait for a response after sending a fragment
    pub timeout: Duration,
    /// Retransmissions allowed per fragment before the send fails
    pub max_retries: u8,
    /// Largest fragment carved from an outgoing payload
    pub max_payload_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            timeout: Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<(), AudioModemError> {
        if self.max_payload_size == 0 || self.max_payload_size > MAX_PACKET_PAYLOAD {
            return Err(AudioModemError::InvalidConfig(format!(
                "max payload size {} outside 1..={MAX_PACKET_PAYLOAD}",
                self.max_payload_size
            )));
        }
        Ok(())
    }
}

/// Which operation currently owns the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    Idle,
    Sending,
    Receiving,
}

/// Protocol counters for monitoring and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Data packets serialized onto the channel, retransmissions included
    pub packets_sent: u64,
    /// Retransmissions triggered by NAK or timeout
    pub retransmissions: u64,
    /// In-sequence data packets accepted
    pub packets_received: u64,
    /// ACK control bytes emitted
    pub acks_sent: u64,
    /// NAK control bytes emitted
    pub naks_sent: u64,
    /// Data packets discarded for an unexpected sequence number
    pub dropped_packets: u64,
    /// Buffers rejected by the packet parser
    pub parse_errors: u64,
    /// Control bytes emitted through `send_control`
    pub control_bytes_sent: u64,
}

/// Cancellation handle for an in-flight `send` or `receive`.
///
/// Cloneable and cheap; [`trigger`](Self::trigger) deterministically fails
/// the outstanding operation with [`AudioModemError::Reset`]. A trigger is
/// consumed by the operation it cancels.
#[derive(Clone, Default)]
pub struct ResetSignal {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ResetSignal {
    fn new() -> Self {
        Self::default()
    }

    /// Cancel the operation currently driving the transport, if any.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Resolve once triggered, consuming the trigger.
    async fn triggered(&self) {
        loop {
            if self.flag.swap(false, Ordering::SeqCst) {
                return;
            }
            self.notify.notified().await;
        }
    }
}

/// Stop-and-wait ARQ endpoint. Exclusively owns its channel.
pub struct ReliableTransport<C: DataChannel> {
    channel: C,
    config: TransportConfig,
    phase: TransportPhase,
    reset_signal: ResetSignal,
    stats: TransportStats,
}

impl<C: DataChannel> ReliableTransport<C> {
    /// Transport with default tuning (3 s timeout, 10 retries, 128-byte
    /// fragments).
    pub fn new(channel: C) -> Self {
        ReliableTransport {
            channel,
            config: TransportConfig::default(),
            phase: TransportPhase::Idle,
            reset_signal: ResetSignal::new(),
            stats: TransportStats::default(),
        }
    }

    /// Transport with explicit tuning.
    pub fn with_config(channel: C, config: TransportConfig) -> Result<Self, AudioModemError> {
        config.validate()?;
        let mut transport = Self::new(channel);
        transport.config = config;
        Ok(transport)
    }

    /// Replace the tuning parameters. Fails with `Busy` mid-operation.
    pub fn configure(&mut self, config: TransportConfig) -> Result<(), AudioModemError> {
        if self.phase != TransportPhase::Idle {
            return Err(AudioModemError::Busy);
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn phase(&self) -> TransportPhase {
        self.phase
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// The underlying channel, e.g. for modem statistics.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Handle for cancelling an in-flight operation from another task.
    pub fn reset_signal(&self) -> ResetSignal {
        self.reset_signal.clone()
    }

    /// Reliably deliver `payload` to the peer.
    ///
    /// Splits the payload into fragments of at most `max_payload_size`
    /// bytes (an empty payload becomes one zero-length fragment), sends
    /// them stop-and-wait, and finishes with EOT once every fragment is
    /// acknowledged. Fails with `Busy` if an operation is in flight,
    /// `MaxRetriesExceeded` when a fragment exhausts its retries, or
    /// `ModemError` when the channel fails.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), AudioModemError> {
        if self.phase != TransportPhase::Idle {
            return Err(AudioModemError::Busy);
        }
        self.phase = TransportPhase::Sending;
        debug!("send: {} bytes", payload.len());
        let result = self.run_send(payload).await;
        self.phase = TransportPhase::Idle;
        result
    }

    /// Receive one complete payload from the peer.
    ///
    /// Accepts in-sequence packets (ACKing each after its payload is
    /// appended), NAKs everything else, and completes with the
    /// concatenated payload when EOT arrives.
    pub async fn receive(&mut self) -> Result<Vec<u8>, AudioModemError> {
        if self.phase != TransportPhase::Idle {
            return Err(AudioModemError::Busy);
        }
        self.phase = TransportPhase::Receiving;
        debug!("receive: waiting for packets");
        let result = self.run_receive().await;
        self.phase = TransportPhase::Idle;
        result
    }

    /// Emit a single control byte through the channel write path.
    pub async fn send_control(&mut self, control: ControlByte) -> Result<(), AudioModemError> {
        self.channel.modulate(&[control.as_u8()]).await?;
        self.stats.control_bytes_sent += 1;
        Ok(())
    }

    /// Cancel any stuck operation, clear all state, reset the channel, and
    /// return to Idle.
    pub async fn reset(&mut self) -> Result<(), AudioModemError> {
        self.reset_signal.clear();
        self.phase = TransportPhase::Idle;
        self.stats = TransportStats::default();
        self.channel.reset().await
    }

    async fn run_send(&mut self, payload: &[u8]) -> Result<(), AudioModemError> {
        let fragments: Vec<&[u8]> = if payload.is_empty() {
            vec![&[]]
        } else {
            payload.chunks(self.config.max_payload_size).collect()
        };

        let mut sequence: u8 = 1;
        let mut index = 0usize;
        let mut retries: u8 = 0;

        self.transmit_fragment(sequence, fragments[index]).await?;
        let mut deadline = Instant::now() + self.config.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = tokio::select! {
                _ = self.reset_signal.triggered() => {
                    debug!("send cancelled by reset");
                    return Err(AudioModemError::Reset);
                }
                result = timeout(remaining, self.channel.demodulate()) => result,
            };

            let data = match outcome {
                // Deadline expired with no response for the current fragment.
                Err(_) => {
                    retries += 1;
                    if retries > self.config.max_retries {
                        warn!("fragment {index} unacknowledged after {retries} attempts");
                        return Err(AudioModemError::MaxRetriesExceeded { attempts: retries });
                    }
                    debug!("ack timeout, retransmitting fragment {index} (retry {retries})");
                    self.stats.retransmissions += 1;
                    self.transmit_fragment(sequence, fragments[index]).await?;
                    deadline = Instant::now() + self.config.timeout;
                    continue;
                }
                Ok(Err(e)) => return Err(e),
                Ok(Ok(data)) => data,
            };

            if data.len() != 1 {
                debug!("ignoring {}-byte buffer while sending", data.len());
                continue;
            }
            match ControlByte::try_from(data[0]) {
                Ok(ControlByte::Ack) => {
                    debug!("fragment {index} acknowledged");
                    index += 1;
                    sequence = next_sequence(sequence);
                    retries = 0;
                    if index < fragments.len() {
                        self.transmit_fragment(sequence, fragments[index]).await?;
                        deadline = Instant::now() + self.config.timeout;
                    } else {
                        self.send_control(ControlByte::Eot).await?;
                        debug!("send complete: {} fragments", fragments.len());
                        return Ok(());
                    }
                }
                Ok(ControlByte::Nak) => {
                    retries += 1;
                    if retries > self.config.max_retries {
                        warn!("fragment {index} rejected after {retries} attempts");
                        return Err(AudioModemError::MaxRetriesExceeded { attempts: retries });
                    }
                    debug!("nak, retransmitting fragment {index} (retry {retries})");
                    self.stats.retransmissions += 1;
                    self.transmit_fragment(sequence, fragments[index]).await?;
                    deadline = Instant::now() + self.config.timeout;
                }
                Ok(ControlByte::Eot) | Err(_) => {
                    debug!("unexpected byte 0x{:02x} while sending", data[0]);
                }
            }
        }
    }

    async fn run_receive(&mut self) -> Result<Vec<u8>, AudioModemError> {
        let mut expected_seq: u8 = 1;
        let mut received: Vec<u8> = Vec::new();

        loop {
            let data = tokio::select! {
                _ = self.reset_signal.triggered() => {
                    debug!("receive cancelled by reset");
                    return Err(AudioModemError::Reset);
                }
                result = self.channel.demodulate() => result?,
            };

            if data.is_empty() {
                continue;
            }
            if data.len() == 1 {
                if let Ok(control) = ControlByte::try_from(data[0]) {
                    match control {
                        ControlByte::Eot => {
                            debug!("receive complete: {} bytes", received.len());
                            return Ok(received);
                        }
                        ControlByte::Ack | ControlByte::Nak => {
                            debug!("ignoring stray control 0x{:02x}", data[0]);
                        }
                    }
                    continue;
                }
            }

            match Packet::parse(&data) {
                Ok(packet) if packet.sequence == expected_seq => {
                    debug!(
                        "accepted seq {} ({} bytes)",
                        packet.sequence,
                        packet.payload.len()
                    );
                    received.extend_from_slice(&packet.payload);
                    expected_seq = next_sequence(expected_seq);
                    self.stats.packets_received += 1;
                    // ACK only after the payload is appended.
                    self.send_control(ControlByte::Ack).await?;
                    self.stats.acks_sent += 1;
                }
                Ok(packet) => {
                    debug!(
                        "dropping seq {} (expected {})",
                        packet.sequence, expected_seq
                    );
                    self.stats.dropped_packets += 1;
                    self.send_control(ControlByte::Nak).await?;
                    self.stats.naks_sent += 1;
                }
                Err(e) => {
                    warn!("packet rejected: {e}");
                    self.stats.parse_errors += 1;
                    self.send_control(ControlByte::Nak).await?;
                    self.stats.naks_sent += 1;
                }
            }
        }
    }

    async fn transmit_fragment(
        &mut self,
        sequence: u8,
        fragment: &[u8],
    ) -> Result<(), AudioModemError> {
        let packet = Packet {
            sequence,
            payload: fragment.to_vec(),
        };
        let wire = packet.serialize();
        debug!("tx seq {sequence}: {}", pretty_hex(&wire));
        self.channel.modulate(&wire).await?;
        self.stats.packets_sent += 1;
        Ok(())
    }
}
