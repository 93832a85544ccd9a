//! Collaborator seams for the separation pipeline.
//!
//! The engine never isolates stems itself; these traits are implemented by
//! whatever backend does (see [`HttpStemService`](super::http::HttpStemService)).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::audio::buffer::SampleBuffer;
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stem {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl Stem {
    pub const ALL: [Stem; 4] = [Stem::Vocals, Stem::Drums, Stem::Bass, Stem::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Stem::Vocals => "vocals",
            Stem::Drums => "drums",
            Stem::Bass => "bass",
            Stem::Other => "other",
        }
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lead line plus backing voices pulled from a vocal stem
#[derive(Clone, Debug, PartialEq)]
pub struct VocalLayers {
    pub lead: SampleBuffer,
    pub harmonies: Vec<SampleBuffer>,
}

/// Symbolic transcription of one instrument track
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notation {
    /// e.g. `audio/midi` or `application/vnd.recordare.musicxml`
    pub format: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Stem separation backend
pub trait StemSeparator: Send + Sync {
    fn separate(&self, buffer: &SampleBuffer, stem: Stem) -> Result<SampleBuffer>;

    /// Every detected instrument with its isolated track
    fn separate_instruments(&self, buffer: &SampleBuffer) -> Result<Vec<(String, SampleBuffer)>>;

    /// For logging
    fn name(&self) -> &'static str;
}

/// Splits a vocal stem into lead and harmony voices
pub trait HarmonyExtractor: Send + Sync {
    fn extract(&self, vocals: &SampleBuffer, max_voices: usize) -> Result<VocalLayers>;

    fn name(&self) -> &'static str;
}

/// Audio to notes
pub trait NotationGenerator: Send + Sync {
    fn transcribe(&self, buffer: &SampleBuffer, instrument: &str) -> Result<Notation>;

    fn name(&self) -> &'static str;
}
