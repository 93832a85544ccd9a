use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::chain::SampleChain;
use crate::audio::buffer::SampleBuffer;
use crate::error::{Error, Result};

/// 1 MiB of f32 samples per accelerated work item
pub const CHUNK_SAMPLES: usize = (1 << 20) / std::mem::size_of::<f32>();
pub const ACCELERATED_MAX_CHANNELS: usize = 32;
pub const DIRECT_MAX_CHANNELS: usize = 64;
const MAX_WORKERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Accelerated,
    Direct,
}

/// One execution path for the per-sample chain.
///
/// Implementations must return a buffer with the input's shape and sample rate.
pub trait ProcessingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn max_channels(&self) -> usize;

    fn process(&self, buffer: &SampleBuffer, chain: &SampleChain) -> Result<SampleBuffer>;

    fn supports(&self, buffer: &SampleBuffer) -> bool {
        buffer.channel_count() <= self.max_channels()
    }
}

/// Sample-by-sample on the caller's thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectStrategy;

impl ProcessingStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    fn max_channels(&self) -> usize {
        DIRECT_MAX_CHANNELS
    }

    fn process(&self, buffer: &SampleBuffer, chain: &SampleChain) -> Result<SampleBuffer> {
        if !self.supports(buffer) {
            return Err(Error::UnsupportedConfiguration(format!(
                "{} channels exceed the direct strategy limit of {}",
                buffer.channel_count(),
                DIRECT_MAX_CHANNELS
            )));
        }
        let channels = buffer
            .channels()
            .iter()
            .map(|ch| chain.apply_slice(ch))
            .collect();
        buffer.with_channels(channels)
    }
}

/// Chunked processing on a private, bounded rayon pool.
pub struct AcceleratedStrategy {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl std::fmt::Debug for AcceleratedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratedStrategy")
            .field("workers", &self.workers)
            .finish()
    }
}

impl AcceleratedStrategy {
    /// `min(hardware threads - 1, 4)`, leaving one core for the caller.
    pub fn default_workers() -> usize {
        let threads = std::thread::available_parallelism().map_or(1, |n| n.get());
        threads.saturating_sub(1).min(MAX_WORKERS)
    }

    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::StrategyInitializationFailure(
                "no worker threads available".into(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("cadenza-worker-{}", i))
            .build()
            .map_err(|e| Error::StrategyInitializationFailure(e.to_string()))?;
        log::info!("Accelerated strategy ready with {} workers", workers);
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl ProcessingStrategy for AcceleratedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Accelerated
    }

    fn max_channels(&self) -> usize {
        ACCELERATED_MAX_CHANNELS
    }

    fn process(&self, buffer: &SampleBuffer, chain: &SampleChain) -> Result<SampleBuffer> {
        if !self.supports(buffer) {
            return Err(Error::UnsupportedConfiguration(format!(
                "{} channels exceed the accelerated strategy limit of {}",
                buffer.channel_count(),
                ACCELERATED_MAX_CHANNELS
            )));
        }

        let channels: Vec<Vec<f32>> = self.pool.install(|| {
            buffer
                .channels()
                .iter()
                .map(|ch| {
                    // Indexed collect keeps chunks in offset order
                    let chunks: Vec<Vec<f32>> = ch
                        .par_chunks(CHUNK_SAMPLES)
                        .map(|chunk| chain.apply_slice(chunk))
                        .collect();
                    chunks.concat()
                })
                .collect()
        });

        log::debug!(
            "Accelerated pass: {} ch x {} samples in {}-sample chunks",
            buffer.channel_count(),
            buffer.frames(),
            CHUNK_SAMPLES
        );
        buffer.with_channels(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::options::ProcessingOptions;

    fn ramp(frames: usize) -> Vec<f32> {
        (0..frames).map(|i| ((i % 2000) as f32 / 1000.0) - 1.0).collect()
    }

    fn full_chain(peak: f32) -> SampleChain {
        let opts = ProcessingOptions {
            denoise: true,
            normalize: true,
            remove_clipping: true,
            ..Default::default()
        };
        SampleChain::plan(&opts, peak)
    }

    #[test]
    fn chunk_is_one_mebibyte() {
        assert_eq!(CHUNK_SAMPLES * 4, 1 << 20);
    }

    #[test]
    fn strategies_agree_across_chunk_boundaries() {
        // Longer than two chunks so reassembly order matters
        let frames = CHUNK_SAMPLES * 2 + 1234;
        let buf = SampleBuffer::new(vec![ramp(frames), ramp(frames)], 48000).unwrap();
        let chain = full_chain(buf.peak());

        let direct = DirectStrategy.process(&buf, &chain).unwrap();
        let accelerated = AcceleratedStrategy::new(2).unwrap().process(&buf, &chain).unwrap();

        assert_eq!(direct, accelerated);
        assert_eq!(accelerated.frames(), frames);
        assert_eq!(accelerated.channel_count(), 2);
        assert_eq!(accelerated.sample_rate(), 48000);
    }

    #[test]
    fn zero_workers_fail_to_initialize() {
        assert!(matches!(
            AcceleratedStrategy::new(0),
            Err(Error::StrategyInitializationFailure(_))
        ));
    }

    #[test]
    fn default_worker_count_is_bounded() {
        assert!(AcceleratedStrategy::default_workers() <= MAX_WORKERS);
    }

    #[test]
    fn channel_limits() {
        let wide = SampleBuffer::silence(ACCELERATED_MAX_CHANNELS + 1, 16, 48000).unwrap();
        let chain = full_chain(1.0);
        let accelerated = AcceleratedStrategy::new(1).unwrap();
        assert!(!accelerated.supports(&wide));
        assert!(matches!(
            accelerated.process(&wide, &chain),
            Err(Error::UnsupportedConfiguration(_))
        ));
        assert!(DirectStrategy.process(&wide, &chain).is_ok());

        let too_wide = SampleBuffer::silence(DIRECT_MAX_CHANNELS + 1, 16, 48000).unwrap();
        assert!(DirectStrategy.process(&too_wide, &chain).is_err());
    }
}
