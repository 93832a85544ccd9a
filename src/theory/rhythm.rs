use serde::{Deserialize, Serialize};

use super::timeline::{Timed, Timeline};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
    #[serde(default)]
    pub start_time: f64,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
            start_time: 0.0,
        }
    }
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32, start_time: f64) -> Self {
        Self {
            numerator,
            denominator,
            start_time,
        }
    }
}

impl Timed for TimeSignature {
    fn start_time(&self) -> f64 {
        self.start_time
    }
}

/// Quantization grid as a fraction of one beat
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grid {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
}

impl Grid {
    pub fn size(self) -> f64 {
        match self {
            Grid::Whole => 1.0,
            Grid::Half => 0.5,
            Grid::Quarter => 0.25,
            Grid::Eighth => 0.125,
        }
    }
}

/// Position within the bar structure. `bar` and `beat` count from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BeatPosition {
    pub bar: u64,
    pub beat: u32,
    /// Sixteenth note within the beat, from 0
    pub subdivision: u32,
}

#[derive(Clone, Debug, Default)]
pub struct RhythmProcessor {
    signatures: Timeline<TimeSignature>,
}

fn check_tempo(tempo: f64) -> Result<()> {
    if !tempo.is_finite() || tempo <= 0.0 {
        return Err(Error::invalid(format!("tempo must be positive, got {}", tempo)));
    }
    Ok(())
}

fn check_time(time: f64) -> Result<()> {
    if !time.is_finite() || time < 0.0 {
        return Err(Error::invalid(format!("time must be non-negative, got {}", time)));
    }
    Ok(())
}

fn check_signature(ts: &TimeSignature) -> Result<()> {
    if ts.numerator == 0 || ts.denominator == 0 {
        return Err(Error::invalid(format!(
            "time signature {}/{} is not playable",
            ts.numerator, ts.denominator
        )));
    }
    Ok(())
}

impl RhythmProcessor {
    pub fn new(signatures: Vec<TimeSignature>) -> Self {
        Self {
            signatures: Timeline::new(signatures),
        }
    }

    pub fn add_time_signature(&mut self, signature: TimeSignature) {
        self.signatures.insert(signature);
    }

    pub fn signatures(&self) -> &[TimeSignature] {
        self.signatures.entries()
    }

    /// Active signature at `time`, 4/4 when none has started.
    pub fn time_signature_at_time(&self, time: f64) -> TimeSignature {
        self.signatures.resolve(time)
    }

    /// Seconds per beat, where the beat is the signature's denominator note.
    pub fn beat_duration(&self, tempo: f64, signature: &TimeSignature) -> Result<f64> {
        check_tempo(tempo)?;
        check_signature(signature)?;
        Ok((60.0 / tempo) * (4.0 / signature.denominator as f64))
    }

    pub fn beat_position(&self, time: f64, tempo: f64) -> Result<BeatPosition> {
        check_time(time)?;
        let signature = self.time_signature_at_time(time);
        let beat_duration = self.beat_duration(tempo, &signature)?;

        let elapsed = (time - signature.start_time).max(0.0);
        let total_beats = elapsed / beat_duration;
        let whole_beats = total_beats.floor();
        let fraction = total_beats - whole_beats;
        let numerator = signature.numerator as u64;
        let whole = whole_beats as u64;

        let sixteenths_per_beat = 16 / signature.denominator;
        let subdivision = (fraction * sixteenths_per_beat as f64).floor() as u32;

        Ok(BeatPosition {
            bar: whole / numerator + 1,
            beat: (whole % numerator) as u32 + 1,
            subdivision: subdivision.min(sixteenths_per_beat.saturating_sub(1)),
        })
    }

    /// Round `time` to the nearest multiple of `beat_duration * grid`.
    pub fn quantize_time(&self, time: f64, tempo: f64, grid: Grid) -> Result<f64> {
        check_time(time)?;
        let signature = self.time_signature_at_time(time);
        let step = self.beat_duration(tempo, &signature)? * grid.size();
        Ok((time / step).round() * step)
    }
}
