//! Stateless per-sample stages, applied in the fixed order
//! denoise → normalize → declip.

use super::options::ProcessingOptions;

/// Samples quieter than this are gated to silence
pub const NOISE_GATE: f32 = 0.01;
/// Peak level after normalization
pub const NORMALIZE_TARGET: f32 = 0.9;
/// Soft clipping starts above this magnitude
pub const CLIP_THRESHOLD: f32 = 0.8;

pub fn denoise(x: f32) -> f32 {
    if x.abs() < NOISE_GATE {
        0.0
    } else {
        x
    }
}

/// `sign(x)·(t + tanh(|x| − t))` above the threshold; bounded by `t + 1`.
pub fn declip(x: f32) -> f32 {
    let magnitude = x.abs();
    if magnitude > CLIP_THRESHOLD {
        x.signum() * (CLIP_THRESHOLD + (magnitude - CLIP_THRESHOLD).tanh())
    } else {
        x
    }
}

/// The enabled stages for one `process` call.
///
/// The normalize gain comes from the input peak, so the chain itself stays a
/// pure function of each sample and can be split across workers freely.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleChain {
    denoise: bool,
    normalize_gain: Option<f32>,
    declip: bool,
}

impl SampleChain {
    pub fn plan(options: &ProcessingOptions, input_peak: f32) -> Self {
        let normalize_gain = options.normalize.then(|| {
            if input_peak > 0.0 {
                NORMALIZE_TARGET / input_peak
            } else {
                1.0
            }
        });
        Self {
            denoise: options.denoise,
            normalize_gain,
            declip: options.remove_clipping,
        }
    }

    pub fn is_identity(&self) -> bool {
        !self.denoise && self.normalize_gain.is_none() && !self.declip
    }

    #[inline]
    pub fn apply(&self, mut x: f32) -> f32 {
        if self.denoise {
            x = denoise(x);
        }
        if let Some(gain) = self.normalize_gain {
            x *= gain;
        }
        if self.declip {
            x = declip(x);
        }
        x
    }

    pub fn apply_slice(&self, samples: &[f32]) -> Vec<f32> {
        samples.iter().map(|&x| self.apply(x)).collect()
    }
}
