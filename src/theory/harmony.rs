use serde::{Deserialize, Serialize};

use super::key::KeySignature;
use super::tables::mode_intervals;
use crate::error::{Error, Result};

pub const MAX_VOICES: usize = 8;
/// Notes per held/moving block in oblique motion
const OBLIQUE_BLOCK: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonyType {
    #[default]
    Parallel,
    Oblique,
    Contrary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarmonySettings {
    #[serde(default, rename = "type")]
    pub harmony_type: HarmonyType,
    #[serde(default = "default_voice_count")]
    pub voice_count: usize,
}

impl Default for HarmonySettings {
    fn default() -> Self {
        Self {
            harmony_type: HarmonyType::default(),
            voice_count: default_voice_count(),
        }
    }
}

fn default_voice_count() -> usize { 2 }

/// Interval families cycled by voice index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Interval {
    Third,
    Fifth,
    Seventh,
}

impl Interval {
    fn for_voice(voice: usize) -> Self {
        match (voice - 1) % 3 {
            0 => Interval::Third,
            1 => Interval::Fifth,
            _ => Interval::Seventh,
        }
    }

    /// Scale steps above the root
    fn steps(self) -> usize {
        match self {
            Interval::Third => 2,
            Interval::Fifth => 4,
            Interval::Seventh => 6,
        }
    }
}

/// Semitone offset for `voice` (>= 1) in `key`: the accumulated scale
/// intervals of its family plus one octave per completed cycle.
pub fn voice_offset(voice: usize, key: &KeySignature) -> i32 {
    let steps = mode_intervals(key.scale, key.mode);
    let span: i32 = steps
        .iter()
        .cycle()
        .take(Interval::for_voice(voice).steps())
        .sum();
    span + 12 * ((voice - 1) / 3) as i32
}

fn shift(freq: f64, semitones: i32) -> f64 {
    if freq <= 0.0 {
        return freq;
    }
    freq * 2f64.powf(semitones as f64 / 12.0)
}

/// Builds harmony voices around a melody.
#[derive(Clone, Copy, Debug, Default)]
pub struct HarmonyGenerator;

impl HarmonyGenerator {
    /// Returns exactly `settings.voice_count` sequences; voice 0 is the melody.
    pub fn generate(
        &self,
        melody: &[f64],
        settings: &HarmonySettings,
        key: &KeySignature,
    ) -> Result<Vec<Vec<f64>>> {
        if settings.voice_count == 0 || settings.voice_count > MAX_VOICES {
            return Err(Error::invalid(format!(
                "voice count must be between 1 and {}, got {}",
                MAX_VOICES, settings.voice_count
            )));
        }

        let mut voices = Vec::with_capacity(settings.voice_count);
        voices.push(melody.to_vec());

        for voice in 1..settings.voice_count {
            let offset = voice_offset(voice, key);
            let line = match settings.harmony_type {
                HarmonyType::Parallel => parallel(melody, offset),
                HarmonyType::Oblique => oblique(melody, offset),
                HarmonyType::Contrary => contrary(melody, offset),
            };
            voices.push(line);
        }

        log::debug!(
            "Generated {} {:?} voices over {} notes",
            voices.len(),
            settings.harmony_type,
            melody.len()
        );
        Ok(voices)
    }
}

fn parallel(melody: &[f64], offset: i32) -> Vec<f64> {
    melody.iter().map(|&f| shift(f, offset)).collect()
}

/// Even blocks hold the block's first harmonized note, odd blocks move.
fn oblique(melody: &[f64], offset: i32) -> Vec<f64> {
    melody
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            let block = i / OBLIQUE_BLOCK;
            if block % 2 == 0 && f > 0.0 {
                let anchor = melody[block * OBLIQUE_BLOCK];
                if anchor > 0.0 {
                    return shift(anchor, offset);
                }
            }
            shift(f, offset)
        })
        .collect()
}

/// Harmony sits below a rising melody and above a falling one.
fn contrary(melody: &[f64], offset: i32) -> Vec<f64> {
    let mut above = true;
    let mut prev: Option<f64> = None;
    melody
        .iter()
        .map(|&f| {
            if f <= 0.0 {
                return f;
            }
            if let Some(p) = prev {
                if f > p {
                    above = false;
                } else if f < p {
                    above = true;
                }
            }
            prev = Some(f);
            shift(f, if above { offset } else { -offset })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::tables::{Mode, PitchClass, Scale};
    use approx::assert_relative_eq;

    const MELODY: [f64; 3] = [261.6, 293.7, 329.6];

    fn c_major() -> KeySignature {
        KeySignature::default()
    }

    fn settings(harmony_type: HarmonyType, voice_count: usize) -> HarmonySettings {
        HarmonySettings {
            harmony_type,
            voice_count,
        }
    }

    #[test]
    fn parallel_two_voices() {
        let voices = HarmonyGenerator
            .generate(&MELODY, &settings(HarmonyType::Parallel, 2), &c_major())
            .unwrap();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0], MELODY.to_vec());

        let ratios: Vec<f64> = voices[1].iter().zip(&MELODY).map(|(h, m)| h / m).collect();
        for r in &ratios {
            assert_relative_eq!(*r, ratios[0], max_relative = 1e-12);
        }
        // A major third in C major is 2 + 2 semitones
        assert_relative_eq!(ratios[0], 2f64.powf(4.0 / 12.0), max_relative = 1e-12);
    }

    #[test]
    fn voice_offsets_cycle_thirds_fifths_sevenths() {
        let key = c_major();
        assert_eq!(voice_offset(1, &key), 4);
        assert_eq!(voice_offset(2, &key), 7);
        assert_eq!(voice_offset(3, &key), 11);
        assert_eq!(voice_offset(4, &key), 16);

        let minor = KeySignature::new(PitchClass::A, Scale::Minor, Mode::Ionian, 0.0);
        assert_eq!(voice_offset(1, &minor), 3);
    }

    #[test]
    fn oblique_alternates_held_and_moving() {
        let melody: Vec<f64> = (0..8).map(|i| 200.0 + 10.0 * i as f64).collect();
        let voices = HarmonyGenerator
            .generate(&melody, &settings(HarmonyType::Oblique, 2), &c_major())
            .unwrap();
        let ratio = 2f64.powf(4.0 / 12.0);
        let line = &voices[1];
        for v in &line[0..4] {
            assert_relative_eq!(*v, 200.0 * ratio, max_relative = 1e-12);
        }
        for (i, v) in line[4..8].iter().enumerate() {
            assert_relative_eq!(*v, melody[4 + i] * ratio, max_relative = 1e-12);
        }
    }

    #[test]
    fn contrary_flips_with_direction() {
        let melody = [300.0, 320.0, 310.0, 310.0];
        let voices = HarmonyGenerator
            .generate(&melody, &settings(HarmonyType::Contrary, 2), &c_major())
            .unwrap();
        let line = &voices[1];
        assert!(line[0] > melody[0]);
        assert!(line[1] < melody[1]);
        assert!(line[2] > melody[2]);
        // Repeated note keeps the previous direction
        assert!(line[3] > melody[3]);
    }

    #[test]
    fn rests_stay_silent() {
        let voices = HarmonyGenerator
            .generate(&[0.0, 440.0], &settings(HarmonyType::Parallel, 3), &c_major())
            .unwrap();
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[2][0], 0.0);
    }

    #[test]
    fn voice_count_bounds() {
        let harmony = HarmonyGenerator;
        let run = |count| {
            harmony.generate(&MELODY, &settings(HarmonyType::Parallel, count), &c_major())
        };
        assert!(run(0).is_err());
        assert!(run(9).is_err());
        assert_eq!(run(1).unwrap().len(), 1);
    }
}
