//! Scale, mode and pitch-class tables plus note-frequency math.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

pub const DEFAULT_TUNING: f64 = 440.0;
/// Index of A within the octave
const A_INDEX: i32 = 9;

/// One of the twelve pitch classes, C = 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PitchClass {
    #[default]
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parse `C`, `F#`, `Bb`, `c#` etc.
    pub fn parse(name: &str) -> Result<Self> {
        let mut chars = name.trim().chars();
        let letter = chars
            .next()
            .ok_or_else(|| Error::invalid("empty note name"))?
            .to_ascii_uppercase();
        let natural = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(Error::invalid(format!("unknown note name '{}'", name))),
        };
        let offset: i32 = match chars.as_str() {
            "" => 0,
            "#" | "♯" => 1,
            "b" | "♭" => -1,
            _ => return Err(Error::invalid(format!("unknown note name '{}'", name))),
        };
        Ok(Self::from_index(natural + offset))
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for PitchClass {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PitchClass> for String {
    fn from(value: PitchClass) -> Self {
        value.name().to_string()
    }
}

/// Named interval tables. Unknown names resolve to `Major`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Scale {
    #[default]
    Major,
    Minor,
    HarmonicMinor,
    MelodicMinor,
    PentatonicMajor,
    PentatonicMinor,
    Blues,
    Chromatic,
    WholeTone,
    Diminished,
    Augmented,
    HungarianMinor,
}

impl Scale {
    pub fn intervals(self) -> &'static [i32] {
        match self {
            Scale::Major => &[2, 2, 1, 2, 2, 2, 1],
            Scale::Minor => &[2, 1, 2, 2, 1, 2, 2],
            Scale::HarmonicMinor => &[2, 1, 2, 2, 1, 3, 1],
            Scale::MelodicMinor => &[2, 1, 2, 2, 2, 2, 1],
            Scale::PentatonicMajor => &[2, 2, 3, 2, 3],
            Scale::PentatonicMinor => &[3, 2, 2, 3, 2],
            Scale::Blues => &[3, 2, 1, 1, 3, 2],
            Scale::Chromatic => &[1; 12],
            Scale::WholeTone => &[2; 6],
            Scale::Diminished => &[2, 1, 2, 1, 2, 1, 2, 1],
            Scale::Augmented => &[3, 1, 3, 1, 3, 1],
            Scale::HungarianMinor => &[2, 1, 3, 1, 1, 3, 1],
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "major" => Scale::Major,
            "minor" | "natural_minor" => Scale::Minor,
            "harmonic_minor" => Scale::HarmonicMinor,
            "melodic_minor" => Scale::MelodicMinor,
            "pentatonic_major" | "major_pentatonic" => Scale::PentatonicMajor,
            "pentatonic_minor" | "minor_pentatonic" => Scale::PentatonicMinor,
            "blues" => Scale::Blues,
            "chromatic" => Scale::Chromatic,
            "whole_tone" => Scale::WholeTone,
            "diminished" => Scale::Diminished,
            "augmented" => Scale::Augmented,
            "hungarian_minor" => Scale::HungarianMinor,
            other => {
                log::warn!("Unknown scale '{}', using major", other);
                Scale::Major
            }
        }
    }
}

impl From<String> for Scale {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

/// Church modes as rotations of a scale. Unknown names resolve to `Ionian`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Mode {
    #[default]
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
}

impl Mode {
    pub fn rotation(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "ionian" => Mode::Ionian,
            "dorian" => Mode::Dorian,
            "phrygian" => Mode::Phrygian,
            "lydian" => Mode::Lydian,
            "mixolydian" => Mode::Mixolydian,
            "aeolian" => Mode::Aeolian,
            "locrian" => Mode::Locrian,
            other => {
                log::warn!("Unknown mode '{}', using ionian", other);
                Mode::Ionian
            }
        }
    }
}

impl From<String> for Mode {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

/// Semitone steps of `scale` rotated into `mode`.
pub fn mode_intervals(scale: Scale, mode: Mode) -> Vec<i32> {
    let base = scale.intervals();
    let mut steps = base.to_vec();
    steps.rotate_left(mode.rotation() % base.len());
    steps
}

/// Cumulative semitone offsets of each degree from the root, starting at 0.
pub fn degree_offsets(scale: Scale, mode: Mode) -> Vec<i32> {
    let steps = mode_intervals(scale, mode);
    let mut offsets = Vec::with_capacity(steps.len());
    let mut acc = 0;
    for step in &steps {
        offsets.push(acc);
        acc += step;
    }
    offsets
}

/// Tuning-aware note math
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MusicTheory {
    base_frequency: f64,
}

impl Default for MusicTheory {
    fn default() -> Self {
        Self {
            base_frequency: DEFAULT_TUNING,
        }
    }
}

impl MusicTheory {
    /// `base_frequency` is the A4 reference, usually 440 or 432 Hz.
    pub fn new(base_frequency: f64) -> Result<Self> {
        if !base_frequency.is_finite() || base_frequency <= 0.0 {
            return Err(Error::invalid(format!(
                "tuning reference must be positive, got {}",
                base_frequency
            )));
        }
        Ok(Self { base_frequency })
    }

    pub fn base_frequency(&self) -> f64 {
        self.base_frequency
    }

    pub fn note_frequency(&self, note: PitchClass, octave: i32) -> f64 {
        let semitones = note.index() - A_INDEX + (octave - 4) * 12;
        self.base_frequency * 2f64.powf(semitones as f64 / 12.0)
    }

    /// Frequency by note name, e.g. `("Eb", 3)`.
    pub fn frequency_of(&self, name: &str, octave: i32) -> Result<f64> {
        Ok(self.note_frequency(PitchClass::parse(name)?, octave))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn twelve_scales_seven_modes() {
        let scales = [
            "major", "minor", "harmonic_minor", "melodic_minor", "pentatonic_major",
            "pentatonic_minor", "blues", "chromatic", "whole_tone", "diminished",
            "augmented", "hungarian_minor",
        ];
        for name in scales {
            let scale = Scale::from_name(name);
            assert_eq!(scale.intervals().iter().sum::<i32>(), 12, "{}", name);
        }
        assert_eq!(Scale::from_name("hungarian_minor"), Scale::HungarianMinor);
        assert_eq!(Mode::from_name("Locrian").rotation(), 6);
    }

    #[test]
    fn unknown_names_fall_back() {
        assert_eq!(Scale::from_name("bebop"), Scale::Major);
        assert_eq!(Mode::from_name("hypolydian"), Mode::Ionian);
    }

    #[test]
    fn modes_rotate_major() {
        assert_eq!(mode_intervals(Scale::Major, Mode::Ionian), vec![2, 2, 1, 2, 2, 2, 1]);
        assert_eq!(mode_intervals(Scale::Major, Mode::Dorian), vec![2, 1, 2, 2, 2, 1, 2]);
        assert_eq!(
            mode_intervals(Scale::Major, Mode::Aeolian),
            Scale::Minor.intervals().to_vec()
        );
        assert_eq!(degree_offsets(Scale::Major, Mode::Ionian), vec![0, 2, 4, 5, 7, 9, 11]);
    }

    #[test]
    fn short_scales_wrap_mode_rotation() {
        // Locrian on a 5-note scale rotates by 6 mod 5 = 1
        assert_eq!(mode_intervals(Scale::PentatonicMajor, Mode::Locrian), vec![2, 3, 2, 3, 2]);
    }

    #[test]
    fn note_frequencies() {
        let theory = MusicTheory::default();
        assert_relative_eq!(theory.note_frequency(PitchClass::A, 4), 440.0);
        assert_relative_eq!(theory.note_frequency(PitchClass::A, 5), 880.0);
        assert_relative_eq!(theory.note_frequency(PitchClass::C, 4), 261.6256, max_relative = 1e-6);

        let verdi = MusicTheory::new(432.0).unwrap();
        assert_relative_eq!(verdi.note_frequency(PitchClass::A, 3), 216.0);
    }

    #[test]
    fn parses_sharps_and_flats() {
        assert_eq!(PitchClass::parse("C#").unwrap(), PitchClass::CSharp);
        assert_eq!(PitchClass::parse("db").unwrap(), PitchClass::CSharp);
        assert_eq!(PitchClass::parse("Cb").unwrap(), PitchClass::B);
        assert!(PitchClass::parse("H").is_err());
        assert!(PitchClass::parse("C##").is_err());
    }

    #[test]
    fn rejects_bad_tuning() {
        assert!(MusicTheory::new(0.0).is_err());
        assert!(MusicTheory::new(f64::NAN).is_err());
    }
}
