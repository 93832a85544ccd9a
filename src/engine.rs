use serde::{Deserialize, Serialize};

use crate::audio::analysis;
use crate::audio::buffer::SampleBuffer;
use crate::audio::features::AnalysisResult;
use crate::error::{Error, Result};
use crate::immersive::{self, ImmersiveOutput};
use crate::processing::eq;
use crate::processing::strategy::DIRECT_MAX_CHANNELS;
use crate::processing::{
    AcceleratedStrategy, DirectStrategy, ProcessingOptions, ProcessingStrategy, SampleChain,
    StrategyKind,
};
use crate::theory::{KeyProcessor, KeySignature, MusicTheory, ScaleTransformer};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Try the worker pool before falling back to the caller's thread
    pub accelerated: bool,
    /// Pool size override; defaults to `min(threads - 1, 4)`
    pub workers: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accelerated: true,
            workers: None,
        }
    }
}

/// Owns the execution strategy chosen at construction and the tuning
/// reference used by the theory components it hands out.
pub struct Engine {
    strategy: Box<dyn ProcessingStrategy>,
    theory: MusicTheory,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("strategy", &self.strategy.kind())
            .field("theory", &self.theory)
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), MusicTheory::default())
    }
}

impl Engine {
    /// Never fails: an accelerated pool that cannot start leaves the engine on
    /// the direct strategy for its whole lifetime.
    pub fn new(config: EngineConfig, theory: MusicTheory) -> Self {
        let strategy: Box<dyn ProcessingStrategy> = if config.accelerated {
            let workers = config
                .workers
                .unwrap_or_else(AcceleratedStrategy::default_workers);
            match AcceleratedStrategy::new(workers) {
                Ok(accelerated) => Box::new(accelerated),
                Err(e) => {
                    log::warn!("{}; using direct processing", e);
                    Box::new(DirectStrategy)
                }
            }
        } else {
            Box::new(DirectStrategy)
        };
        log::debug!("Engine strategy: {:?}", strategy.kind());
        Self { strategy, theory }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn theory(&self) -> &MusicTheory {
        &self.theory
    }

    pub fn key_processor(&self, keys: Vec<KeySignature>) -> KeyProcessor {
        KeyProcessor::new(self.theory, keys)
    }

    pub fn scale_transformer(&self) -> ScaleTransformer {
        ScaleTransformer::new(self.theory)
    }

    pub fn analyze(&self, buffer: &SampleBuffer) -> Result<AnalysisResult> {
        analysis::analyze(buffer)
    }

    /// Run the enabled stages. The output has the input's channel count,
    /// length and sample rate.
    pub fn process(
        &self,
        buffer: &SampleBuffer,
        options: &ProcessingOptions,
    ) -> Result<SampleBuffer> {
        options.validate()?;

        if buffer.channel_count() > DIRECT_MAX_CHANNELS {
            return Err(Error::UnsupportedConfiguration(format!(
                "{} channels exceed every strategy limit (max {})",
                buffer.channel_count(),
                DIRECT_MAX_CHANNELS
            )));
        }

        let chain = SampleChain::plan(options, buffer.peak());
        let mut out = if chain.is_identity() {
            buffer.clone()
        } else if self.strategy.supports(buffer) {
            self.strategy.process(buffer, &chain)?
        } else {
            log::debug!(
                "{} channels over the {:?} limit, routing to direct",
                buffer.channel_count(),
                self.strategy.kind()
            );
            DirectStrategy.process(buffer, &chain)?
        };

        if let Some(gains) = eq::preset_gains(options.eq_preset, &options.custom_eq) {
            out = eq::apply_eq(&out, &gains)?;
        }
        if options.enhance_stereo {
            out = eq::widen_stereo(&out)?;
        }
        if options.pitch_correction
            || options.reverb_amount > 0.0
            || options.tempo_adjustment != 1.0
        {
            log::debug!("Pitch correction, reverb and tempo adjustment are not rendered");
        }
        Ok(out)
    }

    pub fn process_immersive(
        &self,
        buffer: &SampleBuffer,
        options: &ProcessingOptions,
    ) -> Result<ImmersiveOutput> {
        immersive::process_immersive(buffer, options.immersive.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::EqPreset;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn sine(freq: f32, amplitude: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    fn direct() -> Engine {
        Engine::new(
            EngineConfig {
                accelerated: false,
                workers: None,
            },
            MusicTheory::default(),
        )
    }

    #[test]
    fn failed_pool_falls_back_to_direct() {
        let engine = Engine::new(
            EngineConfig {
                accelerated: true,
                workers: Some(0),
            },
            MusicTheory::default(),
        );
        assert_eq!(engine.strategy(), StrategyKind::Direct);

        let buf = SampleBuffer::mono(sine(440.0, 0.5, 4410), 44100).unwrap();
        let opts = ProcessingOptions {
            normalize: true,
            ..Default::default()
        };
        assert!(engine.process(&buf, &opts).is_ok());
    }

    #[test]
    fn accelerated_engine_starts_with_workers() {
        let engine = Engine::new(
            EngineConfig {
                accelerated: true,
                workers: Some(2),
            },
            MusicTheory::default(),
        );
        assert_eq!(engine.strategy(), StrategyKind::Accelerated);
    }

    #[test]
    fn normalizes_a_quiet_440hz_tone() {
        // One second at 48 kHz, amplitude 0.1
        let samples: Vec<f32> = (0..48000)
            .map(|i| 0.1 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin())
            .collect();
        let buf = SampleBuffer::mono(samples, 48000).unwrap();
        let opts = ProcessingOptions {
            normalize: true,
            ..Default::default()
        };
        for engine in [Engine::default(), direct()] {
            let before = engine.analyze(&buf).unwrap();
            let out = engine.process(&buf, &opts).unwrap();
            let after = engine.analyze(&out).unwrap();

            assert_eq!(out.frames(), 48000);
            assert_abs_diff_eq!(after.peak_amplitude, 0.9, epsilon = 1e-4);
            assert!(after.peak_amplitude > before.peak_amplitude);
            assert!(after.rms > before.rms);
            assert_relative_eq!(
                after.rms / before.rms,
                after.peak_amplitude / before.peak_amplitude,
                max_relative = 1e-4
            );
        }
    }

    #[test]
    fn every_option_preserves_duration() {
        let buf = SampleBuffer::new(vec![sine(220.0, 1.2, 10000), sine(330.0, 0.005, 10000)], 44100)
            .unwrap();
        let presets = [
            EqPreset::None,
            EqPreset::Voice,
            EqPreset::Music,
            EqPreset::Bass,
            EqPreset::Custom,
        ];
        let engine = Engine::default();
        for preset in presets {
            for flags in 0..16u8 {
                let opts = ProcessingOptions {
                    denoise: flags & 1 != 0,
                    normalize: flags & 2 != 0,
                    remove_clipping: flags & 4 != 0,
                    enhance_stereo: flags & 8 != 0,
                    eq_preset: preset,
                    custom_eq: vec![3.0, -3.0, 0.0, 0.0, 6.0, 0.0, 0.0, -6.0],
                    ..Default::default()
                };
                let out = engine.process(&buf, &opts).unwrap();
                assert_eq!(out.frames(), buf.frames());
                assert_eq!(out.channel_count(), buf.channel_count());
                assert_eq!(out.sample_rate(), buf.sample_rate());
            }
        }
    }

    #[test]
    fn wide_buffers_route_to_direct_then_fail() {
        let engine = Engine::default();
        let opts = ProcessingOptions {
            denoise: true,
            ..Default::default()
        };
        let wide = SampleBuffer::silence(48, 64, 48000).unwrap();
        assert_eq!(engine.process(&wide, &opts).unwrap().channel_count(), 48);

        let too_wide = SampleBuffer::silence(65, 64, 48000).unwrap();
        assert!(matches!(
            engine.process(&too_wide, &opts),
            Err(Error::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn invalid_options_are_rejected_before_processing() {
        let buf = SampleBuffer::mono(vec![0.1; 16], 48000).unwrap();
        let opts = ProcessingOptions {
            reverb_amount: 500.0,
            ..Default::default()
        };
        assert!(matches!(direct().process(&buf, &opts), Err(Error::InvalidInput(_))));
    }
}
