//! Canonical interchange container: 32-bit float WAV via hound.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use super::buffer::SampleBuffer;
use crate::error::{Error, Result};

const BITS_PER_SAMPLE: u16 = 32;

/// Widest buffer the WAV container round-trips through the decoder: one
/// channel per speaker position the extensible channel mask can name.
pub const MAX_WAV_CHANNELS: u16 = 26;

fn wav_spec(buffer: &SampleBuffer) -> Result<WavSpec> {
    let channels = u16::try_from(buffer.channel_count())
        .ok()
        .filter(|&n| n <= MAX_WAV_CHANNELS)
        .ok_or_else(|| {
            Error::Encode(format!(
                "{} channels exceed the WAV limit of {}",
                buffer.channel_count(),
                MAX_WAV_CHANNELS
            ))
        })?;
    Ok(WavSpec {
        channels,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Float,
    })
}

fn write_samples<W: Write + Seek>(writer: &mut WavWriter<W>, buffer: &SampleBuffer) -> Result<()> {
    for i in 0..buffer.frames() {
        for ch in buffer.channels() {
            writer.write_sample(ch[i])?;
        }
    }
    Ok(())
}

/// Write the buffer to a WAV file.
pub fn write_wav(path: &Path, buffer: &SampleBuffer) -> Result<()> {
    let mut writer = WavWriter::create(path, wav_spec(buffer)?)?;
    write_samples(&mut writer, buffer)?;
    writer.finalize()?;

    log::info!(
        "Wrote {}: {} ch, {}Hz, {:.1}s",
        path.display(),
        buffer.channel_count(),
        buffer.sample_rate(),
        buffer.duration()
    );
    Ok(())
}

/// Encode the buffer into WAV bytes.
pub fn encode_wav(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), wav_spec(buffer)?)?;
        write_samples(&mut writer, buffer)?;
        writer.finalize()?;
    }
    Ok(bytes)
}
