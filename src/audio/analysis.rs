use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::time::{SystemTime, UNIX_EPOCH};

use super::buffer::SampleBuffer;
use super::features::AnalysisResult;
use crate::error::{Error, Result};

pub const FFT_SIZE: usize = 2048;
/// Autocorrelation window and maximum lag for tempo estimation
const TEMPO_WINDOW: usize = 2048;
/// Spectrum floor in dB; bins at or below it carry no weight
const MIN_DECIBELS: f32 = -100.0;

pub fn analyze(buffer: &SampleBuffer) -> Result<AnalysisResult> {
    if buffer.is_empty() {
        return Err(Error::invalid("cannot analyze an empty buffer"));
    }

    let sr = buffer.sample_rate();
    let samples = buffer.channel(0).unwrap_or_default();

    let rms = rms(samples);
    let peak_amplitude = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    let zero_crossings = zero_crossings(samples);
    let spectral_centroid = spectral_centroid(samples);
    let tempo = estimate_tempo(samples, sr);

    log::debug!(
        "Analysis: rms={:.4}, peak={:.4}, zc={}, centroid_bin={:.1}, tempo={:.0} BPM",
        rms, peak_amplitude, zero_crossings, spectral_centroid, tempo
    );

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Ok(AnalysisResult {
        duration: buffer.duration(),
        sample_rate: sr,
        channels: buffer.channel_count(),
        rms,
        peak_amplitude,
        zero_crossings,
        spectral_centroid,
        tempo,
        timestamp,
    })
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn zero_crossings(samples: &[f32]) -> usize {
    samples
        .windows(2)
        .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
        .count()
}

/// Centroid of the first FFT frame, in bin units.
fn spectral_centroid(samples: &[f32]) -> f32 {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let hann = hann_window(FFT_SIZE);

    let mut frame = vec![Complex::new(0.0f32, 0.0); FFT_SIZE];
    for (i, &s) in samples.iter().take(FFT_SIZE).enumerate() {
        frame[i] = Complex::new(s * hann[i], 0.0);
    }
    fft.process(&mut frame);

    let (weighted, total) = frame[..FFT_SIZE / 2]
        .iter()
        .enumerate()
        .map(|(i, c)| (i, bin_amplitude(c.norm() / FFT_SIZE as f32)))
        .fold((0.0f32, 0.0f32), |(w, t), (i, a)| (w + a * i as f32, t + a));

    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

/// Round-trip a magnitude through the dB scale, dropping bins at the floor.
fn bin_amplitude(magnitude: f32) -> f32 {
    let db = 20.0 * magnitude.max(f32::MIN_POSITIVE).log10();
    if db <= MIN_DECIBELS {
        0.0
    } else {
        10f32.powf(db / 20.0)
    }
}

/// Median BPM over the autocorrelation peaks of the first window.
///
/// Returns 0.0 when the window has no local maxima (silence, DC, too short).
fn estimate_tempo(samples: &[f32], sample_rate: u32) -> f32 {
    let window = &samples[..samples.len().min(TEMPO_WINDOW)];
    let n = window.len();
    if n < 3 {
        return 0.0;
    }

    let correlation: Vec<f32> = (0..n)
        .into_par_iter()
        .map(|lag| {
            window[..n - lag]
                .iter()
                .zip(&window[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect();

    let mut candidates: Vec<f32> = (1..n - 1)
        .filter(|&lag| {
            correlation[lag] > correlation[lag - 1] && correlation[lag] > correlation[lag + 1]
        })
        .map(|lag| 60.0 * sample_rate as f32 / lag as f32)
        .collect();

    if candidates.is_empty() {
        return 0.0;
    }

    candidates.sort_by(|a, b| a.total_cmp(b));
    let mid = candidates.len() / 2;
    let median = if candidates.len() % 2 == 0 {
        (candidates[mid - 1] + candidates[mid]) / 2.0
    } else {
        candidates[mid]
    };
    median.round()
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
