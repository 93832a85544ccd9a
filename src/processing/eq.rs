//! Biquad filters (RBJ cookbook), the 8-band preset EQ and stereo widening.

use std::f32::consts::PI;

use super::options::{EqPreset, EQ_BANDS};
use crate::audio::buffer::SampleBuffer;
use crate::error::Result;

pub const BAND_FREQUENCIES: [f32; EQ_BANDS] =
    [60.0, 150.0, 400.0, 1000.0, 2400.0, 6000.0, 10000.0, 15000.0];
const BAND_Q: f32 = 1.0;
const STEREO_WIDTH: f32 = 1.5;

const VOICE_GAINS: [f32; EQ_BANDS] = [-6.0, -3.0, 0.0, 2.0, 4.0, 3.0, 1.0, 0.0];
const MUSIC_GAINS: [f32; EQ_BANDS] = [2.0, 1.0, 0.0, -1.0, 0.0, 1.0, 2.0, 2.0];
const BASS_GAINS: [f32; EQ_BANDS] = [6.0, 4.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];

/// Normalized second-order section, `a0 == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Biquad {
    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// `(cos w0, alpha)`
    fn omega(freq: f32, sample_rate: u32, q: f32) -> (f32, f32) {
        let w0 = 2.0 * PI * freq / sample_rate as f32;
        let (sin, cos) = w0.sin_cos();
        (cos, sin / (2.0 * q))
    }

    pub fn peaking(freq: f32, q: f32, gain_db: f32, sample_rate: u32) -> Self {
        let a = 10f32.powf(gain_db / 40.0);
        let (cos, alpha) = Self::omega(freq, sample_rate, q);
        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos,
            1.0 - alpha / a,
        )
    }

    pub fn lowpass(freq: f32, q: f32, sample_rate: u32) -> Self {
        let (cos, alpha) = Self::omega(freq, sample_rate, q);
        Self::normalized(
            (1.0 - cos) / 2.0,
            1.0 - cos,
            (1.0 - cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    pub fn highpass(freq: f32, q: f32, sample_rate: u32) -> Self {
        let (cos, alpha) = Self::omega(freq, sample_rate, q);
        Self::normalized(
            (1.0 + cos) / 2.0,
            -(1.0 + cos),
            (1.0 + cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    /// Constant 0 dB peak gain
    pub fn bandpass(freq: f32, q: f32, sample_rate: u32) -> Self {
        let (cos, alpha) = Self::omega(freq, sample_rate, q);
        Self::normalized(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
    }

    /// Transposed direct form II over one channel, fresh state.
    pub fn filter(&self, input: &[f32]) -> Vec<f32> {
        let (mut z1, mut z2) = (0.0f32, 0.0f32);
        input
            .iter()
            .map(|&x| {
                let y = self.b0 * x + z1;
                z1 = self.b1 * x - self.a1 * y + z2;
                z2 = self.b2 * x - self.a2 * y;
                y
            })
            .collect()
    }
}

/// Gains in dB for each band, `None` when the preset is off.
pub fn preset_gains(preset: EqPreset, custom: &[f32]) -> Option<[f32; EQ_BANDS]> {
    match preset {
        EqPreset::None => None,
        EqPreset::Voice => Some(VOICE_GAINS),
        EqPreset::Music => Some(MUSIC_GAINS),
        EqPreset::Bass => Some(BASS_GAINS),
        EqPreset::Custom => {
            let mut gains = [0.0; EQ_BANDS];
            for (g, c) in gains.iter_mut().zip(custom) {
                *g = *c;
            }
            Some(gains)
        }
    }
}

/// Run the band cascade on every channel. Flat bands and bands at or above
/// Nyquist are skipped.
pub fn apply_eq(buffer: &SampleBuffer, gains: &[f32; EQ_BANDS]) -> Result<SampleBuffer> {
    let nyquist = buffer.sample_rate() as f32 / 2.0;
    let filters: Vec<Biquad> = BAND_FREQUENCIES
        .iter()
        .zip(gains)
        .filter(|(freq, gain)| **freq < nyquist && gain.abs() > f32::EPSILON)
        .map(|(freq, gain)| Biquad::peaking(*freq, BAND_Q, *gain, buffer.sample_rate()))
        .collect();

    log::debug!("EQ: {} active bands", filters.len());

    let channels = buffer
        .channels()
        .iter()
        .map(|ch| {
            filters
                .iter()
                .fold(ch.clone(), |samples, f| f.filter(&samples))
        })
        .collect();
    buffer.with_channels(channels)
}

/// Mid/side widening on a stereo pair; other layouts pass through.
pub fn widen_stereo(buffer: &SampleBuffer) -> Result<SampleBuffer> {
    let [left, right] = buffer.channels() else {
        log::debug!(
            "Stereo enhancement skipped for {} channels",
            buffer.channel_count()
        );
        return Ok(buffer.clone());
    };

    let (l, r): (Vec<f32>, Vec<f32>) = left
        .iter()
        .zip(right)
        .map(|(&l, &r)| {
            let mid = (l + r) * 0.5;
            let side = (l - r) * 0.5 * STEREO_WIDTH;
            (mid + side, mid - side)
        })
        .unzip();
    buffer.with_channels(vec![l, r])
}
