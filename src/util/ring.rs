//! # RingBuffer - Fixed-Capacity Streaming Buffer
//!
//! A single-producer single-consumer byte ring with a fixed capacity and
//! wrap indices. The demodulator uses one as its received-bit window: bits
//! are pushed with [`RingBuffer::push_overwrite`] so the oldest cell drops
//! out once the window is full, and the correlation matcher reads the most
//! recent cells back through [`RingBuffer::get`] without consuming them.
//!
//! ## Usage
//!
//! ```rust
//! use audiomodem::util::RingBuffer;
//!
//! let mut ring = RingBuffer::new(4);
//! ring.write_array(&[1, 2, 3]).unwrap();
//!
//! let mut out = [0u8; 2];
//! assert_eq!(ring.read_into(&mut out), 2);
//! assert_eq!(out, [1, 2]);
//! ```

use thiserror::Error;

/// Errors that can occur during RingBuffer operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingBufferError {
    #[error("Buffer full: capacity {capacity}, requested {requested} more")]
    BufferFull { capacity: usize, requested: usize },
}

/// Fixed-capacity byte ring buffer with wrap indices.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    cells: Vec<u8>,
    /// Read head, always < capacity
    head: usize,
    /// Number of readable bytes
    len: usize,
}

impl RingBuffer {
    /// Create a ring holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self {
            cells: vec![0; capacity],
            head: 0,
            len: 0,
        }
    }

    /// Total number of cells.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of readable bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bytes are readable.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when a further `push` would fail.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Append one byte; fails when the ring is full.
    pub fn push(&mut self, byte: u8) -> Result<(), RingBufferError> {
        if self.is_full() {
            return Err(RingBufferError::BufferFull {
                capacity: self.capacity(),
                requested: 1,
            });
        }
        let tail = (self.head + self.len) % self.capacity();
        self.cells[tail] = byte;
        self.len += 1;
        Ok(())
    }

    /// Append one byte, dropping the oldest byte when the ring is full.
    pub fn push_overwrite(&mut self, byte: u8) {
        if self.is_full() {
            self.head = (self.head + 1) % self.capacity();
            self.len -= 1;
        }
        let tail = (self.head + self.len) % self.capacity();
        self.cells[tail] = byte;
        self.len += 1;
    }

    /// Append a slice; fails without writing anything if it does not fit.
    pub fn write_array(&mut self, data: &[u8]) -> Result<usize, RingBufferError> {
        if data.len() > self.capacity() - self.len {
            return Err(RingBufferError::BufferFull {
                capacity: self.capacity(),
                requested: data.len(),
            });
        }
        for &byte in data {
            let tail = (self.head + self.len) % self.capacity();
            self.cells[tail] = byte;
            self.len += 1;
        }
        Ok(data.len())
    }

    /// Consume up to `out.len()` bytes from the front; returns the count read.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.len);
        for slot in out.iter_mut().take(count) {
            *slot = self.cells[self.head];
            self.head = (self.head + 1) % self.capacity();
            self.len -= 1;
        }
        count
    }

    /// Read cell `i` relative to the read head without consuming it.
    pub fn get(&self, i: usize) -> Option<u8> {
        if i >= self.len {
            return None;
        }
        Some(self.cells[(self.head + i) % self.capacity()])
    }
}
