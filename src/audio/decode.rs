use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer as DecodeBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::buffer::SampleBuffer;
use crate::error::{Error, Result};

/// Decode an audio file, keeping every channel.
pub fn decode_file(path: &Path) -> Result<SampleBuffer> {
    let file = std::fs::File::open(path)?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let buffer = decode_source(Box::new(file), hint)?;
    log::info!(
        "Decoded {}: {} ch, {} samples, {}Hz, {:.1}s",
        path.display(),
        buffer.channel_count(),
        buffer.frames(),
        buffer.sample_rate(),
        buffer.duration()
    );
    Ok(buffer)
}

/// Decode an in-memory container (the engine's own WAV output included).
pub fn decode_bytes(bytes: Vec<u8>) -> Result<SampleBuffer> {
    let mut hint = Hint::new();
    hint.with_extension("wav");
    decode_source(Box::new(Cursor::new(bytes)), hint)
}

fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<SampleBuffer> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("no audio tracks found".into()))?;

    let track_id = track.id;
    let mut channel_count = track.codec_params.channels.map_or(0, |c| c.count());
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping corrupt packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        // Codec params may omit these until the first packet
        channel_count = spec.channels.count();
        sample_rate = spec.rate;

        let mut sample_buf = DecodeBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    if channel_count == 0 || sample_rate == 0 {
        return Err(Error::Decode("stream has no channel or sample rate information".into()));
    }

    SampleBuffer::from_interleaved(&interleaved, channel_count, sample_rate)
}
