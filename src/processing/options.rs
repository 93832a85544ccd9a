use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::immersive::ImmersiveOptions;

pub const EQ_BANDS: usize = 8;
const EQ_LIMIT_DB: f32 = 12.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqPreset {
    #[default]
    None,
    Voice,
    Music,
    Bass,
    Custom,
}

/// Signal chain switches. Every field has a default so partial TOML works.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub denoise: bool,
    pub normalize: bool,
    pub remove_clipping: bool,
    pub enhance_stereo: bool,
    pub pitch_correction: bool,
    /// Playback-rate multiplier
    pub tempo_adjustment: f32,
    /// 0-100
    pub reverb_amount: f32,
    pub eq_preset: EqPreset,
    /// Per-band gain in dB, used with `EqPreset::Custom`
    pub custom_eq: Vec<f32>,
    pub immersive: Option<ImmersiveOptions>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            denoise: false,
            normalize: false,
            remove_clipping: false,
            enhance_stereo: false,
            pitch_correction: false,
            tempo_adjustment: 1.0,
            reverb_amount: 0.0,
            eq_preset: EqPreset::None,
            custom_eq: vec![0.0; EQ_BANDS],
            immersive: None,
        }
    }
}

impl ProcessingOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.tempo_adjustment.is_finite() || self.tempo_adjustment <= 0.0 {
            return Err(Error::invalid(format!(
                "tempo adjustment must be positive, got {}",
                self.tempo_adjustment
            )));
        }
        if !(0.0..=100.0).contains(&self.reverb_amount) {
            return Err(Error::invalid(format!(
                "reverb amount must be within 0-100, got {}",
                self.reverb_amount
            )));
        }
        if self.eq_preset == EqPreset::Custom {
            if self.custom_eq.len() != EQ_BANDS {
                return Err(Error::invalid(format!(
                    "custom EQ needs {} bands, got {}",
                    EQ_BANDS,
                    self.custom_eq.len()
                )));
            }
            if let Some(gain) = self
                .custom_eq
                .iter()
                .find(|g| !(-EQ_LIMIT_DB..=EQ_LIMIT_DB).contains(*g))
            {
                return Err(Error::invalid(format!(
                    "custom EQ gain {} dB outside ±{} dB",
                    gain, EQ_LIMIT_DB
                )));
            }
        }
        Ok(())
    }

    /// True when any stage would touch the samples
    pub fn has_effects(&self) -> bool {
        self.denoise
            || self.normalize
            || self.remove_clipping
            || self.enhance_stereo
            || self.eq_preset != EqPreset::None
    }
}
