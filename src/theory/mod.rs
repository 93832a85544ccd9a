//! Music theory: interval tables, key/time signature timelines and the
//! transforms built on them.

pub mod harmony;
pub mod key;
pub mod rhythm;
pub mod scale;
pub mod tables;
pub mod timeline;

pub use harmony::{HarmonyGenerator, HarmonySettings, HarmonyType};
pub use key::{KeyProcessor, KeySignature, DEFAULT_TRANSITION};
pub use rhythm::{BeatPosition, Grid, RhythmProcessor, TimeSignature};
pub use scale::ScaleTransformer;
pub use tables::{Mode, MusicTheory, PitchClass, Scale};
pub use timeline::{Timed, Timeline};
