//! # DSP Primitives
//!
//! The IIR filters and AGC stage used by the demodulation pipeline.
//! Coefficients are computed once from the configuration; per-sample state
//! is one or two delay cells, so filters are cheap to reset and clone.
//!
//! The band-pass pre-filter is a biquad section. The I/Q and discriminator
//! low-passes are single-pole: their combined delay through the chain must
//! stay well inside half a bit period, or the majority vote would straddle
//! bit boundaries.

use crate::constants::{
    AGC_ATTACK_MS, AGC_MAX_GAIN, AGC_MIN_GAIN, AGC_RELEASE_MS, AGC_TARGET_LEVEL,
};
use std::f32::consts::TAU;

/// Second-order IIR section, transposed direct form II.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Band-pass (constant 0 dB peak gain) centered on `center` with the
    /// given -3 dB bandwidth.
    pub fn bandpass(sample_rate: f32, center: f32, bandwidth: f32) -> Self {
        let w0 = TAU * center / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let q = center / bandwidth;
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: alpha / a0,
            b1: 0.0,
            b2: -alpha / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    /// Zero the delay cells, keeping the coefficients.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Single-pole IIR low-pass.
#[derive(Debug, Clone)]
pub struct OnePole {
    coeff: f32,
    state: f32,
}

impl OnePole {
    /// Low-pass with -3 dB point at `cutoff`.
    pub fn lowpass(sample_rate: f32, cutoff: f32) -> Self {
        Self {
            coeff: (-TAU * cutoff / sample_rate).exp(),
            state: 0.0,
        }
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.state = self.coeff * self.state + (1.0 - self.coeff) * x;
        self.state
    }

    /// Zero the delay cell, keeping the coefficient.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// Automatic gain control: a one-pole envelope follower driving a clamped
/// feed-forward gain toward a fixed output level.
#[derive(Debug, Clone)]
pub struct Agc {
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
    gain: f32,
}

impl Agc {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            attack_coeff: one_pole_coeff(AGC_ATTACK_MS, sample_rate),
            release_coeff: one_pole_coeff(AGC_RELEASE_MS, sample_rate),
            envelope: 0.0,
            gain: 1.0,
        }
    }

    /// Track the envelope and scale one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let magnitude = x.abs();
        let coeff = if magnitude > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * magnitude;

        if self.envelope > f32::EPSILON {
            self.gain = (AGC_TARGET_LEVEL / self.envelope).clamp(AGC_MIN_GAIN, AGC_MAX_GAIN);
        }
        x * self.gain
    }

    /// Current gain, for diagnostics.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.gain = 1.0;
    }
}

/// IIR smoothing coefficient for a time constant in milliseconds.
fn one_pole_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    (-1.0 / (time_ms * 1e-3 * sample_rate)).exp()
}
