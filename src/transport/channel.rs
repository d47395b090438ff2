//! # Data Channel
//!
//! The modem↔transport boundary. [`DataChannel`] is the byte-oriented
//! async contract the reliable transport drives; [`ModemChannel`] is its
//! production implementation, bridging an owned [`FskModem`] to the
//! fixed-size f32 sample blocks an audio adaptor exchanges with the sound
//! hardware.

use crate::constants::AUDIO_BLOCK_SIZE;
use crate::error::AudioModemError;
use crate::modem::{FskModem, ModemConfig};
use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

/// Byte-oriented channel contract consumed by the transport.
///
/// A channel is exclusively owned by one transport. Writes are atomic at
/// buffer granularity, so control bytes and packet frames never interleave
/// below a whole buffer.
#[async_trait]
pub trait DataChannel: Send {
    /// Hand a byte buffer to the modem for transmission. Returns once the
    /// buffer is enqueued, not when audio playout finishes.
    async fn modulate(&mut self, data: &[u8]) -> Result<(), AudioModemError>;

    /// Suspend until the modem surfaces at least one byte, then return the
    /// buffered bytes. May return a single byte: control characters must
    /// be deliverable on their own.
    async fn demodulate(&mut self) -> Result<Vec<u8>, AudioModemError>;

    /// Drop any pending transmit queue and any demodulated bytes not yet
    /// surfaced.
    async fn reset(&mut self) -> Result<(), AudioModemError>;
}

/// [`DataChannel`] implementation over an owned [`FskModem`] and a pair of
/// sample-block queues.
///
/// The audio adaptor on the other side of the queues plays blocks popped
/// from `tx` and pushes captured blocks into `rx`, typically
/// [`AUDIO_BLOCK_SIZE`] samples at a time.
pub struct ModemChannel {
    modem: FskModem,
    tx: mpsc::UnboundedSender<Vec<f32>>,
    rx: mpsc::UnboundedReceiver<Vec<f32>>,
    /// Demodulated bytes awaiting the frame's end-of-data flush
    rx_buffer: Vec<u8>,
    /// End-of-data count already consumed from the modem statistics
    flushed_events: u64,
}

impl ModemChannel {
    /// Wrap a configured modem and its audio-side block queues.
    pub fn new(
        modem: FskModem,
        tx: mpsc::UnboundedSender<Vec<f32>>,
        rx: mpsc::UnboundedReceiver<Vec<f32>>,
    ) -> Result<Self, AudioModemError> {
        if !modem.is_configured() {
            return Err(AudioModemError::NotConfigured);
        }
        Ok(ModemChannel {
            modem,
            tx,
            rx,
            rx_buffer: Vec::new(),
            flushed_events: 0,
        })
    }

    /// Access the underlying modem, e.g. for statistics.
    pub fn modem(&self) -> &FskModem {
        &self.modem
    }
}

#[async_trait]
impl DataChannel for ModemChannel {
    async fn modulate(&mut self, data: &[u8]) -> Result<(), AudioModemError> {
        let samples = self.modem.modulate(data)?;
        for block in samples.chunks(AUDIO_BLOCK_SIZE) {
            self.tx
                .send(block.to_vec())
                .map_err(|_| AudioModemError::ModemError("audio output closed".into()))?;
        }
        debug!("enqueued {} bytes as {} samples", data.len(), samples.len());
        Ok(())
    }

    /// Collects demodulated bytes until the modem's end-of-data marks the
    /// frame boundary, then surfaces the whole frame at once. Control
    /// bytes ride in one-byte frames, so they still arrive alone.
    async fn demodulate(&mut self) -> Result<Vec<u8>, AudioModemError> {
        loop {
            let block = self
                .rx
                .recv()
                .await
                .ok_or_else(|| AudioModemError::ModemError("audio input closed".into()))?;
            let bytes = self.modem.demodulate(&block)?;
            self.rx_buffer.extend(bytes);

            let events = self.modem.stats().end_of_data_events;
            if events != self.flushed_events {
                self.flushed_events = events;
                if !self.rx_buffer.is_empty() {
                    return Ok(std::mem::take(&mut self.rx_buffer));
                }
            }
        }
    }

    async fn reset(&mut self) -> Result<(), AudioModemError> {
        self.modem.reset();
        self.rx_buffer.clear();
        self.flushed_events = 0;
        while self.rx.try_recv().is_ok() {}
        Ok(())
    }
}

/// Build two cross-wired [`ModemChannel`]s sharing one configuration: what
/// either endpoint transmits, the other hears. Used for loopback testing
/// of the full modem + transport stack.
pub fn modem_channel_pair(
    config: ModemConfig,
) -> Result<(ModemChannel, ModemChannel), AudioModemError> {
    let mut modem_a = FskModem::new();
    modem_a.configure(config.clone())?;
    let mut modem_b = FskModem::new();
    modem_b.configure(config)?;

    let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
    let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

    let a = ModemChannel::new(modem_a, a_to_b_tx, b_to_a_rx)?;
    let b = ModemChannel::new(modem_b, b_to_a_tx, a_to_b_rx)?;
    Ok((a, b))
}
