use crate::error::{Error, Result};

/// Owned multi-channel audio, stored one `Vec` per channel.
///
/// Construction enforces the invariants every component relies on: at least
/// one channel, equal channel lengths and a non-zero sample rate. Transforms
/// never mutate a buffer they were handed; they build a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::invalid("sample rate must be greater than zero"));
        }
        let Some(first) = channels.first() else {
            return Err(Error::invalid("buffer must have at least one channel"));
        };
        let len = first.len();
        if let Some((idx, ch)) = channels.iter().enumerate().find(|(_, ch)| ch.len() != len) {
            return Err(Error::invalid(format!(
                "channel {} has {} samples, expected {}",
                idx,
                ch.len(),
                len
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Deinterleave `L R L R ...` style frames.
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if channel_count == 0 {
            return Err(Error::invalid("channel count must be greater than zero"));
        }
        if samples.len() % channel_count != 0 {
            return Err(Error::invalid(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                channel_count
            )));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Silent buffer with the given shape.
    pub fn silence(channel_count: usize, frames: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; frames]; channel_count], sample_rate)
    }

    /// Build a buffer with the same sample rate and new channel data.
    pub fn with_channels(&self, channels: Vec<Vec<f32>>) -> Result<Self> {
        Self::new(channels, self.sample_rate)
    }

    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * self.channel_count());
        for i in 0..self.frames() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Largest magnitude across every channel
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|s| s.abs())
            .fold(0.0f32, f32::max)
    }

    /// Average all channels into one
    pub fn downmix(&self) -> Vec<f32> {
        let n = self.channel_count() as f32;
        (0..self.frames())
            .map(|i| self.channels.iter().map(|ch| ch[i]).sum::<f32>() / n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_channels() {
        let err = SampleBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn rejects_zero_sample_rate_and_no_channels() {
        assert!(SampleBuffer::mono(vec![0.0], 0).is_err());
        assert!(SampleBuffer::new(Vec::new(), 48000).is_err());
    }

    #[test]
    fn interleave_round_trip() {
        let interleaved = [0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buf = SampleBuffer::from_interleaved(&interleaved, 2, 48000).unwrap();
        assert_eq!(buf.channel_count(), 2);
        assert_eq!(buf.frames(), 3);
        assert_eq!(buf.channel(1).unwrap(), &[-0.1, -0.2, -0.3]);
        assert_eq!(buf.interleaved(), interleaved.to_vec());
    }

    #[test]
    fn interleaved_length_must_divide() {
        assert!(SampleBuffer::from_interleaved(&[0.0; 5], 2, 48000).is_err());
    }

    #[test]
    fn duration_peak_and_downmix() {
        let buf = SampleBuffer::new(vec![vec![0.5; 24000], vec![-0.9; 24000]], 48000).unwrap();
        assert_eq!(buf.duration(), 0.5);
        assert_eq!(buf.peak(), 0.9);
        assert!((buf.downmix()[0] + 0.2).abs() < 1e-6);
    }
}
