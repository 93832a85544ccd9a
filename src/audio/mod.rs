pub mod analysis;
pub mod buffer;
pub mod decode;
pub mod encode;
pub mod features;

pub use buffer::SampleBuffer;
pub use features::AnalysisResult;
