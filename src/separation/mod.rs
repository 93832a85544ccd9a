//! Stem separation into named sub-tracks and multi-track immersive mixes.

pub mod capability;
pub mod drums;
pub mod http;
pub mod orchestrator;

pub use capability::{
    HarmonyExtractor, Notation, NotationGenerator, Stem, StemSeparator, VocalLayers,
};
pub use http::{HttpStemService, ServiceConfig};
pub use orchestrator::{
    create_immersive_mix, SeparatedTrackSet, SeparationConfig, StageFailure, TrackSeparator,
};
