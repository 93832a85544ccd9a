//! Audio analysis and transformation engine.
//!
//! Decoded samples go in as a [`SampleBuffer`]; the [`Engine`] extracts
//! features and runs the signal chain, the [`theory`] module retargets pitch
//! and rhythm against key and time signature timelines, [`immersive`] renders
//! into speaker, ambisonic or binaural layouts and [`separation`] drives an
//! external stem service into named sub-tracks.

pub mod audio;
pub mod engine;
pub mod error;
pub mod immersive;
pub mod processing;
pub mod separation;
pub mod theory;

pub use audio::{AnalysisResult, SampleBuffer};
pub use engine::{Engine, EngineConfig};
pub use error::{Error, Result};
pub use immersive::{ImmersiveFormat, ImmersiveOptions, ImmersiveOutput};
pub use processing::ProcessingOptions;
