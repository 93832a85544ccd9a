pub mod chain;
pub mod eq;
pub mod options;
pub mod strategy;

pub use chain::SampleChain;
pub use options::{EqPreset, ProcessingOptions, EQ_BANDS};
pub use strategy::{AcceleratedStrategy, DirectStrategy, ProcessingStrategy, StrategyKind};
