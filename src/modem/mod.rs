//! # FSK Physical Modem
//!
//! This module implements the continuous-phase binary FSK modem that turns
//! byte buffers into audible-band f32 samples and streams samples back into
//! bytes.
//!
//! ## Transmit path
//!
//! Bytes are framed UART-style (start bit, eight data bits MSB-first,
//! optional parity, stop bit) and rendered as mark/space sinusoid segments
//! with phase carried continuously across every bit boundary. A frame is
//! guard silence, the preamble bytes, the SFD bytes, the payload, then one
//! byte-frame of trailing silence.
//!
//! ## Receive path
//!
//! Per sample: AGC, band-pass pre-filter at the center frequency, I/Q
//! mixdown against a local oscillator, low-pass filtering of I and Q at the
//! baud rate, instantaneous phase via `atan2`, wrapped phase difference,
//! post-filtering, and a hard bit decision. Hard bits are integrated by
//! majority vote once per bit period; integrated bits feed a correlation
//! synchronizer over a bounded bit ring and, once frame lock is declared, a
//! UART byte assembler. Sustained silence (one byte-frame of samples below
//! the silence level) terminates the frame and resets the receive state.

pub mod config;
pub mod dsp;
pub mod framing;

pub use config::{ModemConfig, Parity};

use crate::constants::{SILENCE_AMPLITUDE, SYNC_RING_MARGIN, TX_AMPLITUDE};
use crate::error::AudioModemError;
use crate::modem::dsp::{Agc, Biquad, OnePole};
use crate::modem::framing::{byte_wire_bits, sync_pattern};
use crate::util::RingBuffer;
use log::{debug, trace};
use std::f32::consts::{PI, TAU};

/// Receive-path counters, cleared by [`FskModem::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModemStats {
    /// Samples consumed by `demodulate`
    pub samples_processed: u64,
    /// Payload bytes emitted to the caller
    pub bytes_emitted: u64,
    /// Times the synchronizer declared frame lock
    pub sync_acquisitions: u64,
    /// Frames dropped on a malformed start or stop bit
    pub frames_aborted: u64,
    /// End-of-data events raised by sustained silence
    pub end_of_data_events: u64,
}

/// Continuous-phase binary FSK modem.
///
/// Created unconfigured; [`configure`](Self::configure) validates the
/// parameter set and allocates the DSP chain. A modem instance is
/// single-threaded and non-reentrant: it owns mutable per-sample state and
/// must be driven from one logical executor at a time.
pub struct FskModem {
    inner: Option<Demodulator>,
}

impl FskModem {
    /// Create an unconfigured modem.
    pub fn new() -> Self {
        FskModem { inner: None }
    }

    /// Validate `config`, build the DSP state, and transition to ready.
    pub fn configure(&mut self, config: ModemConfig) -> Result<(), AudioModemError> {
        config.validate()?;
        self.inner = Some(Demodulator::new(config));
        Ok(())
    }

    /// True once `configure` has succeeded.
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }

    /// The active configuration, if any.
    pub fn config(&self) -> Option<&ModemConfig> {
        self.inner.as_ref().map(|inner| &inner.config)
    }

    /// Receive-path counters (zeroed when unconfigured).
    pub fn stats(&self) -> ModemStats {
        self.inner
            .as_ref()
            .map(|inner| inner.stats)
            .unwrap_or_default()
    }

    /// Return to the initial ready state, preserving the configuration.
    pub fn reset(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            *inner = Demodulator::new(inner.config.clone());
        }
    }

    /// Render `data` as one audio frame.
    ///
    /// Deterministic and independent of any previous call: guard silence of
    /// two bit periods, then preamble, SFD and payload bytes as
    /// continuous-phase mark/space tones at amplitude 0.5, then one
    /// byte-frame of trailing silence.
    pub fn modulate(&self, data: &[u8]) -> Result<Vec<f32>, AudioModemError> {
        let inner = self.inner.as_ref().ok_or(AudioModemError::NotConfigured)?;
        let config = &inner.config;
        let spb = config.samples_per_bit();
        let frame_bytes = config.preamble.len() + config.sfd.len() + data.len();
        let total =
            2 * spb + frame_bytes * config.bits_per_byte() * spb + config.bits_per_byte() * spb;

        let mut samples = Vec::with_capacity(total);
        samples.resize(2 * spb, 0.0);

        let sample_rate = config.sample_rate as f32;
        let mut phase: f32 = 0.0;
        for &byte in config
            .preamble
            .iter()
            .chain(config.sfd.iter())
            .chain(data.iter())
        {
            for bit in byte_wire_bits(byte, config) {
                let freq = if bit == 1 {
                    config.mark_freq
                } else {
                    config.space_freq
                };
                let step = TAU * freq / sample_rate;
                for _ in 0..spb {
                    samples.push(TX_AMPLITUDE * phase.sin());
                    phase += step;
                    if phase >= TAU {
                        phase -= TAU;
                    }
                }
            }
        }

        let len = samples.len();
        samples.resize(len + config.bits_per_byte() * spb, 0.0);
        Ok(samples)
    }

    /// Feed a block of samples; return any bytes whose frames completed.
    ///
    /// Streaming: a call may return nothing while a byte is mid-flight and
    /// surface it on a later call. State accumulates across calls until
    /// silence or [`reset`](Self::reset).
    pub fn demodulate(&mut self, samples: &[f32]) -> Result<Vec<u8>, AudioModemError> {
        let inner = self.inner.as_mut().ok_or(AudioModemError::NotConfigured)?;
        for &sample in samples {
            inner.process_sample(sample);
        }
        Ok(std::mem::take(&mut inner.pending))
    }
}

impl Default for FskModem {
    fn default() -> Self {
        Self::new()
    }
}

/// Full receive-path state, rebuilt from the configuration on reset.
struct Demodulator {
    config: ModemConfig,

    // Derived values cached out of the per-sample path.
    samples_per_bit: usize,
    silence_threshold: usize,

    // DSP chain. The low-passes are single-pole: the decision chain's
    // combined delay must stay inside half a bit period.
    agc: Agc,
    prefilter: Biquad,
    i_filter: OnePole,
    q_filter: OnePole,
    postfilter: OnePole,
    lo_phase: f32,
    lo_step: f32,
    prev_phase: f32,

    // Bit integration.
    bit_accumulator: usize,
    bit_sample_count: usize,

    // Frame synchronization.
    expected_pattern: Vec<u8>,
    bit_ring: RingBuffer,
    frame_started: bool,

    // Byte assembly.
    byte_register: u8,
    bit_position: usize,

    // Silence tracking.
    silent_samples: usize,

    pending: Vec<u8>,
    stats: ModemStats,
}

impl Demodulator {
    fn new(config: ModemConfig) -> Self {
        let sample_rate = config.sample_rate as f32;
        let baud = config.baud_rate as f32;
        let expected_pattern = sync_pattern(&config);
        let ring_capacity = expected_pattern.len() + SYNC_RING_MARGIN;

        Demodulator {
            samples_per_bit: config.samples_per_bit(),
            silence_threshold: config.silence_threshold_samples(),
            agc: Agc::new(sample_rate),
            prefilter: Biquad::bandpass(
                sample_rate,
                config.center_freq(),
                config.effective_prefilter_bandwidth(),
            ),
            i_filter: OnePole::lowpass(sample_rate, baud),
            q_filter: OnePole::lowpass(sample_rate, baud),
            postfilter: OnePole::lowpass(sample_rate, baud),
            lo_phase: 0.0,
            lo_step: TAU * config.center_freq() / sample_rate,
            prev_phase: 0.0,
            bit_accumulator: 0,
            bit_sample_count: 0,
            expected_pattern,
            bit_ring: RingBuffer::new(ring_capacity),
            frame_started: false,
            byte_register: 0,
            bit_position: 0,
            silent_samples: 0,
            pending: Vec::new(),
            stats: ModemStats::default(),
            config,
        }
    }

    fn process_sample(&mut self, sample: f32) {
        self.stats.samples_processed += 1;

        let s = if self.config.agc_enabled {
            self.agc.process(sample)
        } else {
            sample
        };
        // Silence is judged on the gain-corrected input, not the I/Q
        // envelope: the envelope lags the carrier by the filter decay,
        // which would push end-of-data past the frame's own trailing
        // silence.
        let input_level = s.abs();
        let s = self.prefilter.process(s);

        let i = self.i_filter.process(s * self.lo_phase.cos());
        let q = self.q_filter.process(s * self.lo_phase.sin());
        self.lo_phase += self.lo_step;
        if self.lo_phase >= TAU {
            self.lo_phase -= TAU;
        }

        let phase = q.atan2(i);

        let mut delta = phase - self.prev_phase;
        self.prev_phase = phase;
        if delta > PI {
            delta -= TAU;
        } else if delta < -PI {
            delta += TAU;
        }

        let discriminator = self.postfilter.process(delta);
        // Positive discriminator output is mark. The pair of conventions
        // here (Q = s·sin θ, φ = atan2(Q, I), mark below space) must stay
        // consistent with `modulate`; the round-trip tests pin them.
        let hard_bit = (discriminator > 0.0) as usize;

        if input_level < SILENCE_AMPLITUDE {
            self.silent_samples += 1;
            if self.silent_samples >= self.silence_threshold {
                self.stats.end_of_data_events += 1;
                debug!(
                    "end of data after {} silent samples",
                    self.silent_samples
                );
                self.reset_frame_state();
                return;
            }
        } else {
            self.silent_samples = 0;
        }

        self.bit_accumulator += hard_bit;
        self.bit_sample_count += 1;
        if self.bit_sample_count >= self.samples_per_bit {
            let bit = (2 * self.bit_accumulator > self.samples_per_bit) as u8;
            self.bit_accumulator = 0;
            self.bit_sample_count = 0;
            self.process_bit(bit);
        }
    }

    /// One integrated bit: preamble search while unframed, byte assembly
    /// once framed.
    fn process_bit(&mut self, bit: u8) {
        if !self.frame_started {
            self.bit_ring.push_overwrite(bit);
            self.check_sync();
            return;
        }

        match self.bit_position {
            0 => {
                if bit != 0 {
                    self.abort_frame("start bit not low");
                    return;
                }
                self.byte_register = 0;
                self.bit_position = 1;
            }
            pos @ 1..=8 => {
                self.byte_register |= bit << (8 - pos);
                self.bit_position += 1;
            }
            9 if self.config.parity != Parity::None => {
                // Parity position consumed but not verified (reserved).
                self.bit_position = 10;
            }
            _ => {
                if bit != 1 {
                    self.abort_frame("stop bit not high");
                    return;
                }
                trace!("byte assembled: 0x{:02x}", self.byte_register);
                self.pending.push(self.byte_register);
                self.stats.bytes_emitted += 1;
                self.byte_register = 0;
                self.bit_position = 0;
            }
        }
    }

    /// Correlate the newest bits against the expected preamble+SFD pattern.
    ///
    /// Tail-aligned: with fewer bits buffered than the pattern holds, the
    /// newest bits are matched against the end of the pattern while the
    /// missing head counts as mismatches. Truncated preambles can still
    /// reach the threshold; short buffers cannot fire spuriously.
    fn check_sync(&mut self) {
        let pattern_len = self.expected_pattern.len();
        let compared = self.bit_ring.len().min(pattern_len);
        let ring_offset = self.bit_ring.len() - compared;
        let pattern_offset = pattern_len - compared;
        let matches = (0..compared)
            .filter(|&k| {
                self.bit_ring.get(ring_offset + k) == Some(self.expected_pattern[pattern_offset + k])
            })
            .count();
        let ratio = matches as f32 / pattern_len as f32;
        if ratio >= self.config.sync_threshold {
            self.frame_started = true;
            self.byte_register = 0;
            self.bit_position = 0;
            self.bit_ring.clear();
            self.stats.sync_acquisitions += 1;
            debug!("frame lock, match ratio {ratio:.2}");
        }
    }

    /// Malformed start/stop bit: back to preamble search. Bytes already
    /// emitted stay emitted.
    fn abort_frame(&mut self, reason: &str) {
        debug!("frame aborted: {reason}");
        self.frame_started = false;
        self.byte_register = 0;
        self.bit_position = 0;
        self.stats.frames_aborted += 1;
    }

    /// Post-frame reset after sustained silence; config and filters keep
    /// running, frame/bit/byte state starts over.
    fn reset_frame_state(&mut self) {
        self.silent_samples = 0;
        self.bit_accumulator = 0;
        self.bit_sample_count = 0;
        self.bit_ring.clear();
        self.frame_started = false;
        self.byte_register = 0;
        self.bit_position = 0;
    }
}
