//! Mock data channel for testing
//!
//! A scriptable [`DataChannel`](crate::transport::channel::DataChannel)
//! double: tests queue the buffers `demodulate` should surface and inspect
//! everything the transport wrote, without any modem or audio in the loop.
//! When the receive script runs dry, `demodulate` pends until more data is
//! queued, which is exactly what the transport's timeout path needs.

use crate::error::AudioModemError;
use crate::transport::channel::DataChannel;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Mock channel that simulates the modem boundary.
#[derive(Clone, Default)]
pub struct MockChannel {
    /// Buffers `demodulate` will surface, in order
    rx_script: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Buffers the transport handed to `modulate`
    tx_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Error message to fail the next operation with
    next_error: Arc<Mutex<Option<String>>>,
    /// Number of `reset` calls observed
    resets: Arc<Mutex<u32>>,
    notify: Arc<Notify>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one buffer for a future `demodulate` call.
    pub fn queue_rx(&self, data: &[u8]) {
        self.rx_script.lock().unwrap().push_back(data.to_vec());
        self.notify.notify_one();
    }

    /// Everything written through `modulate`, one entry per call.
    pub fn tx_data(&self) -> Vec<Vec<u8>> {
        self.tx_log.lock().unwrap().clone()
    }

    /// Fail the next `modulate` or `demodulate` with a channel error.
    pub fn set_next_error(&self, message: &str) {
        *self.next_error.lock().unwrap() = Some(message.to_string());
        self.notify.notify_one();
    }

    /// Number of `reset` calls the transport issued.
    pub fn reset_count(&self) -> u32 {
        *self.resets.lock().unwrap()
    }

    /// Drop the script and the captured writes.
    pub fn clear(&self) {
        self.rx_script.lock().unwrap().clear();
        self.tx_log.lock().unwrap().clear();
    }

    fn take_error(&self) -> Option<AudioModemError> {
        self.next_error
            .lock()
            .unwrap()
            .take()
            .map(AudioModemError::ModemError)
    }
}

#[async_trait]
impl DataChannel for MockChannel {
    async fn modulate(&mut self, data: &[u8]) -> Result<(), AudioModemError> {
        if let Some(error) = self.take_error() {
            return Err(error);
        }
        self.tx_log.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn demodulate(&mut self) -> Result<Vec<u8>, AudioModemError> {
        loop {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            if let Some(data) = self.rx_script.lock().unwrap().pop_front() {
                return Ok(data);
            }
            self.notify.notified().await;
        }
    }

    async fn reset(&mut self) -> Result<(), AudioModemError> {
        *self.resets.lock().unwrap() += 1;
        self.rx_script.lock().unwrap().clear();
        Ok(())
    }
}
