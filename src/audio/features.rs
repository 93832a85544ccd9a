use serde::Serialize;

use super::analysis::FFT_SIZE;

/// Whole-buffer analysis, produced once per `analyze` call
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Seconds
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: usize,
    /// RMS energy of channel 0 (linear)
    pub rms: f32,
    /// Largest magnitude in channel 0
    pub peak_amplitude: f32,
    /// Sign changes between consecutive samples of channel 0
    pub zero_crossings: usize,
    /// Amplitude-weighted mean FFT bin index
    pub spectral_centroid: f32,
    /// Autocorrelation tempo estimate in BPM, 0 when no periodicity was found
    pub tempo: f32,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl AnalysisResult {
    /// Spectral centroid converted from bin index to Hz
    pub fn spectral_centroid_hz(&self) -> f32 {
        self.spectral_centroid * self.sample_rate as f32 / FFT_SIZE as f32
    }
}
