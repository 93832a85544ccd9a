use std::f32::consts::{FRAC_PI_2, PI};

use super::layout::{Layout, Speaker};
use crate::audio::buffer::SampleBuffer;
use crate::error::Result;

/// LFE feed relative to the downmix
const LFE_GAIN_DB: f32 = -10.0;
/// Sharpens the cosine lobe so a source favours its nearest speakers
const PAN_FOCUS: i32 = 2;
const STEREO_SPREAD: f32 = 30.0;
const HEAD_RADIUS: f32 = 0.0875;
const SPEED_OF_SOUND: f32 = 343.0;
const MAX_ILD_DB: f32 = 10.0;

/// Azimuths for `count` input channels across the front arc.
pub fn source_azimuths(count: usize) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![0.0],
        2 => vec![STEREO_SPREAD, -STEREO_SPREAD],
        n => (0..n)
            .map(|i| 90.0 - 180.0 * i as f32 / (n - 1) as f32)
            .collect(),
    }
}

fn direction(azimuth: f32, elevation: f32) -> [f32; 3] {
    let (az, el) = (azimuth.to_radians(), elevation.to_radians());
    [az.cos() * el.cos(), az.sin() * el.cos(), el.sin()]
}

/// Constant-power gains for a source at `azimuth` on the listener plane.
/// LFE speakers get 0.
pub fn pan_gains(azimuth: f32, speakers: &[Speaker]) -> Vec<f32> {
    let src = direction(azimuth, 0.0);
    let raw: Vec<f32> = speakers
        .iter()
        .map(|s| {
            if s.lfe {
                return 0.0;
            }
            let d = direction(s.azimuth, s.elevation);
            let cos = src[0] * d[0] + src[1] * d[1] + src[2] * d[2];
            cos.max(0.0).powi(PAN_FOCUS)
        })
        .collect();

    let power: f32 = raw.iter().map(|g| g * g).sum();
    if power <= f32::EPSILON {
        return raw;
    }
    let norm = power.sqrt();
    raw.into_iter().map(|g| g / norm).collect()
}

pub fn render(buffer: &SampleBuffer, layout: &Layout) -> Result<SampleBuffer> {
    match layout {
        Layout::Speakers(_, speakers) => render_speakers(buffer, speakers),
        Layout::FirstOrderAmbisonics => encode_foa(buffer),
        Layout::Binaural => render_binaural(buffer),
    }
}

fn render_speakers(buffer: &SampleBuffer, speakers: &[Speaker]) -> Result<SampleBuffer> {
    let frames = buffer.frames();
    let mut out = vec![vec![0.0f32; frames]; speakers.len()];

    for (source, azimuth) in buffer.channels().iter().zip(source_azimuths(buffer.channel_count())) {
        let gains = pan_gains(azimuth, speakers);
        for (channel, gain) in out.iter_mut().zip(&gains) {
            if *gain == 0.0 {
                continue;
            }
            for (o, s) in channel.iter_mut().zip(source) {
                *o += s * gain;
            }
        }
    }

    let lfe_gain = 10f32.powf(LFE_GAIN_DB / 20.0);
    if let Some(lfe) = speakers.iter().position(|s| s.lfe) {
        out[lfe] = buffer.downmix().into_iter().map(|x| x * lfe_gain).collect();
    }

    SampleBuffer::new(out, buffer.sample_rate())
}

/// First-order AmbiX: W = s, Y = s·sin(az), Z = 0, X = s·cos(az) for sources
/// on the listener plane.
fn encode_foa(buffer: &SampleBuffer) -> Result<SampleBuffer> {
    let frames = buffer.frames();
    let mut out = vec![vec![0.0f32; frames]; 4];

    for (source, azimuth) in buffer.channels().iter().zip(source_azimuths(buffer.channel_count())) {
        let [x, y, z] = direction(azimuth, 0.0);
        for (channel, gain) in out.iter_mut().zip([1.0, y, z, x]) {
            for (o, s) in channel.iter_mut().zip(source) {
                *o += s * gain;
            }
        }
    }

    SampleBuffer::new(out, buffer.sample_rate())
}

/// Woodworth ITD in seconds for a lateral angle in radians.
pub fn interaural_delay(azimuth_rad: f32) -> f32 {
    let theta = azimuth_rad.abs().min(FRAC_PI_2);
    HEAD_RADIUS / SPEED_OF_SOUND * (theta + theta.sin())
}

/// Near/far ear gains, constant power.
fn ear_gains(azimuth_rad: f32) -> (f32, f32) {
    let lateral = azimuth_rad.abs().min(FRAC_PI_2);
    let ild_db = lateral / FRAC_PI_2 * MAX_ILD_DB;
    let far = 10f32.powf(-ild_db / 20.0);
    let norm = (1.0 + far * far).sqrt();
    (1.0 / norm, far / norm)
}

/// ITD/ILD head model. The far ear is delayed within the buffer, so the
/// first `delay` samples of that ear see silence from the source.
fn render_binaural(buffer: &SampleBuffer) -> Result<SampleBuffer> {
    let frames = buffer.frames();
    let sample_rate = buffer.sample_rate() as f32;
    let mut left = vec![0.0f32; frames];
    let mut right = vec![0.0f32; frames];

    for (source, azimuth) in buffer.channels().iter().zip(source_azimuths(buffer.channel_count())) {
        let theta = azimuth.to_radians();
        let delay = (interaural_delay(theta) * sample_rate).round() as usize;
        let (near, far) = ear_gains(theta);

        // Positive azimuth is to the left
        let (near_ear, far_ear) = if theta >= 0.0 {
            (&mut left, &mut right)
        } else {
            (&mut right, &mut left)
        };
        for (o, s) in near_ear.iter_mut().zip(source) {
            *o += s * near;
        }
        for (o, s) in far_ear.iter_mut().skip(delay).zip(source) {
            *o += s * far;
        }
    }

    log::debug!(
        "Binaural render at {} Hz, max ITD {:.2} ms",
        sample_rate,
        interaural_delay(PI / 2.0) * 1000.0
    );
    SampleBuffer::new(vec![left, right], buffer.sample_rate())
}
