use serde::{Deserialize, Serialize};

use super::tables::{Mode, MusicTheory, PitchClass, Scale};
use super::timeline::{Timed, Timeline};
use crate::audio::buffer::SampleBuffer;
use crate::error::{Error, Result};

pub const DEFAULT_TRANSITION: f64 = 0.5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeySignature {
    #[serde(default)]
    pub root_note: PitchClass,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub start_time: f64,
}

impl KeySignature {
    pub fn new(root_note: PitchClass, scale: Scale, mode: Mode, start_time: f64) -> Self {
        Self {
            root_note,
            scale,
            mode,
            start_time,
        }
    }
}

impl Timed for KeySignature {
    fn start_time(&self) -> f64 {
        self.start_time
    }
}

/// Key lookup and key-change crossfades over a fixed signature list.
#[derive(Clone, Debug, Default)]
pub struct KeyProcessor {
    theory: MusicTheory,
    keys: Timeline<KeySignature>,
}

impl KeyProcessor {
    pub fn new(theory: MusicTheory, keys: Vec<KeySignature>) -> Self {
        Self {
            theory,
            keys: Timeline::new(keys),
        }
    }

    pub fn add_key(&mut self, key: KeySignature) {
        self.keys.insert(key);
    }

    pub fn keys(&self) -> &[KeySignature] {
        self.keys.entries()
    }

    /// Active key at `time`, C major / ionian when none has started.
    pub fn key_signature_at_time(&self, time: f64) -> KeySignature {
        self.keys.resolve(time)
    }

    /// Consecutive `(from, to)` pairs across the timeline.
    pub fn key_changes(&self) -> Vec<(&KeySignature, &KeySignature)> {
        self.keys
            .entries()
            .windows(2)
            .map(|w| (&w[0], &w[1]))
            .collect()
    }

    /// Scale samples by the root-frequency ratio of `from` → `to`,
    /// raised-cosine blended over `transition` seconds from `to.start_time`.
    pub fn process_key_change(
        &self,
        buffer: &SampleBuffer,
        from: &KeySignature,
        to: &KeySignature,
        transition: f64,
    ) -> Result<SampleBuffer> {
        if !transition.is_finite() || transition <= 0.0 {
            return Err(Error::invalid(format!(
                "transition duration must be positive, got {}",
                transition
            )));
        }

        let from_freq = self.theory.note_frequency(from.root_note, 4);
        let to_freq = self.theory.note_frequency(to.root_note, 4);
        let ratio = to_freq / from_freq;
        let start = to.start_time;
        let sr = buffer.sample_rate() as f64;

        log::debug!(
            "Key change {} -> {} at {:.2}s (ratio {:.4}, {:.2}s transition)",
            from.root_note, to.root_note, start, ratio, transition
        );

        let channels = buffer
            .channels()
            .iter()
            .map(|ch| {
                ch.iter()
                    .enumerate()
                    .map(|(i, &s)| {
                        let t = i as f64 / sr;
                        let gain = if t < start {
                            1.0
                        } else if t > start + transition {
                            ratio
                        } else {
                            let u = (t - start) / transition;
                            let smooth = (1.0 - (std::f64::consts::PI * u).cos()) / 2.0;
                            1.0 + (ratio - 1.0) * smooth
                        };
                        (s as f64 * gain) as f32
                    })
                    .collect()
            })
            .collect();

        buffer.with_channels(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c_major() -> KeySignature {
        KeySignature::new(PitchClass::C, Scale::Major, Mode::Ionian, 0.0)
    }

    fn g_major_at_3() -> KeySignature {
        KeySignature::new(PitchClass::G, Scale::Major, Mode::Ionian, 3.0)
    }

    #[test]
    fn empty_list_defaults_to_c_major() {
        let kp = KeyProcessor::default();
        assert_eq!(kp.key_signature_at_time(10.0), c_major());
    }

    #[test]
    fn later_key_takes_over() {
        let mut kp = KeyProcessor::new(MusicTheory::default(), vec![c_major()]);
        assert_eq!(kp.key_signature_at_time(5.0).root_note, PitchClass::C);

        kp.add_key(g_major_at_3());
        assert_eq!(kp.key_signature_at_time(5.0).root_note, PitchClass::G);
        assert_eq!(kp.key_signature_at_time(1.0).root_note, PitchClass::C);
    }

    #[test]
    fn key_changes_pairs_neighbours() {
        let kp = KeyProcessor::new(MusicTheory::default(), vec![g_major_at_3(), c_major()]);
        let changes = kp.key_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0.root_note, PitchClass::C);
        assert_eq!(changes[0].1.root_note, PitchClass::G);
    }

    #[test]
    fn crossfade_regions() {
        let kp = KeyProcessor::default();
        let to = KeySignature::new(PitchClass::G, Scale::Major, Mode::Ionian, 0.5);
        // 10 Hz sample rate keeps indices readable: t = i / 10
        let buf = SampleBuffer::mono(vec![1.0; 20], 10).unwrap();
        let out = kp.process_key_change(&buf, &c_major(), &to, 0.5).unwrap();
        let ch = out.channel(0).unwrap();
        let ratio = 2f64.powf(7.0 / 12.0) as f32;

        // Before the change
        assert_eq!(ch[4], 1.0);
        // Start of the window: smoothT = 0
        assert_relative_eq!(ch[5], 1.0);
        // Inside the window: u = 0.4
        let smooth = (1.0 - (0.4 * std::f64::consts::PI).cos()) / 2.0;
        assert_relative_eq!(
            ch[7] as f64,
            1.0 + (ratio as f64 - 1.0) * smooth,
            max_relative = 1e-5
        );
        // Past the window
        assert_relative_eq!(ch[11], ratio, max_relative = 1e-5);
        assert_eq!(out.frames(), buf.frames());
    }

    #[test]
    fn rejects_non_positive_transition() {
        let kp = KeyProcessor::default();
        let buf = SampleBuffer::mono(vec![0.0; 4], 10).unwrap();
        assert!(kp.process_key_change(&buf, &c_major(), &g_major_at_3(), 0.0).is_err());
    }

    #[test]
    fn deserializes_from_toml() {
        let key: KeySignature = toml::from_str(
            r#"
            root_note = "F#"
            scale = "harmonic_minor"
            mode = "dorian"
            start_time = 12.5
            "#,
        )
        .unwrap();
        assert_eq!(key.root_note, PitchClass::FSharp);
        assert_eq!(key.scale, Scale::HarmonicMinor);
        assert_eq!(key.mode, Mode::Dorian);
        assert_eq!(key.start_time, 12.5);
    }
}
