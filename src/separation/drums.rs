use crate::audio::buffer::SampleBuffer;
use crate::error::Result;
use crate::processing::eq::Biquad;

const KICK_CUTOFF: f32 = 150.0;
const SNARE_CENTRE: f32 = 1000.0;
const HIHAT_CUTOFF: f32 = 7000.0;
const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;
const SNARE_Q: f32 = 1.0;

/// Band-split a drum stem into `(name, part)` pairs: kick, snare, hihat.
pub fn split_drums(drums: &SampleBuffer) -> Result<Vec<(&'static str, SampleBuffer)>> {
    let rate = drums.sample_rate();
    let nyquist = rate as f32 / 2.0;
    let parts = [
        ("drum_kick", Biquad::lowpass(KICK_CUTOFF, BUTTERWORTH_Q, rate)),
        ("drum_snare", Biquad::bandpass(SNARE_CENTRE, SNARE_Q, rate)),
        ("drum_hihat", Biquad::highpass(HIHAT_CUTOFF.min(nyquist * 0.9), BUTTERWORTH_Q, rate)),
    ];

    parts
        .into_iter()
        .map(|(name, filter)| {
            let channels = drums.channels().iter().map(|ch| filter.filter(ch)).collect();
            Ok((name, drums.with_channels(channels)?))
        })
        .collect()
}
