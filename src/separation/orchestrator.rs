use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capability::{HarmonyExtractor, Notation, NotationGenerator, Stem, StemSeparator};
use super::drums::split_drums;
use crate::audio::buffer::SampleBuffer;
use crate::error::{Error, Result};
use crate::immersive::{render_format, ImmersiveFormat, ImmersiveOutput};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    /// Upper bound passed to the harmony extractor
    pub harmony_voices: usize,
    pub generate_notation: bool,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            harmony_voices: 3,
            generate_notation: false,
        }
    }
}

/// A pipeline stage that did not produce its tracks
#[derive(Debug)]
pub struct StageFailure {
    pub stage: String,
    /// Always [`Error::ExternalCapabilityFailure`]
    pub error: Error,
}

/// Named tracks plus what went wrong getting them.
#[derive(Debug, Default)]
pub struct SeparatedTrackSet {
    pub tracks: BTreeMap<String, SampleBuffer>,
    pub failures: Vec<StageFailure>,
    /// Keyed by track name
    pub notation: BTreeMap<String, Notation>,
}

impl SeparatedTrackSet {
    /// True when every stage succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn track(&self, name: &str) -> Option<&SampleBuffer> {
        self.tracks.get(name)
    }

    pub fn track_names(&self) -> Vec<&str> {
        self.tracks.keys().map(String::as_str).collect()
    }

    pub fn immersive_mix(&self, format: &ImmersiveFormat) -> Result<ImmersiveOutput> {
        create_immersive_mix(&self.tracks, format)
    }

    fn record(&mut self, stage: impl Into<String>, capability: &str, error: Error) {
        let stage = stage.into();
        let error = match error {
            e @ Error::ExternalCapabilityFailure { .. } => e,
            other => Error::capability(capability, other),
        };
        log::warn!("Separation stage '{}' failed: {}", stage, error);
        self.failures.push(StageFailure { stage, error });
    }
}

/// Drives the collaborators and names their output.
pub struct TrackSeparator {
    separator: Arc<dyn StemSeparator>,
    harmony: Arc<dyn HarmonyExtractor>,
    notation: Option<Arc<dyn NotationGenerator>>,
    config: SeparationConfig,
}

fn instrument_track_name(instrument: &str) -> String {
    let slug: String = instrument
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("instrument_{}", slug)
}

/// `base`, or `base_2`, `base_3`, ... when that key is already taken.
fn unique_track_name(base: String, tracks: &BTreeMap<String, SampleBuffer>) -> String {
    if !tracks.contains_key(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !tracks.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl TrackSeparator {
    pub fn new(
        separator: Arc<dyn StemSeparator>,
        harmony: Arc<dyn HarmonyExtractor>,
        notation: Option<Arc<dyn NotationGenerator>>,
        config: SeparationConfig,
    ) -> Self {
        Self {
            separator,
            harmony,
            notation,
            config,
        }
    }

    /// Every stage runs even if an earlier one failed. Only a run that yields
    /// no track at all is an error.
    pub fn separate_tracks(&self, buffer: &SampleBuffer) -> Result<SeparatedTrackSet> {
        if buffer.is_empty() {
            return Err(Error::invalid("cannot separate an empty buffer"));
        }
        let mut set = SeparatedTrackSet::default();

        self.vocals(buffer, &mut set);
        self.drums(buffer, &mut set);
        for stem in [Stem::Bass, Stem::Other] {
            match self.separator.separate(buffer, stem) {
                Ok(track) => {
                    set.tracks.insert(stem.to_string(), track);
                }
                Err(e) => set.record(stem.as_str(), self.separator.name(), e),
            }
        }
        self.instruments(buffer, &mut set);

        if set.tracks.is_empty() {
            let reasons: Vec<String> = set
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.stage, f.error))
                .collect();
            return Err(Error::capability(self.separator.name(), reasons.join("; ")));
        }

        log::info!(
            "Separated {} tracks ({} stage failures)",
            set.tracks.len(),
            set.failures.len()
        );
        Ok(set)
    }

    fn vocals(&self, buffer: &SampleBuffer, set: &mut SeparatedTrackSet) {
        let vocals = match self.separator.separate(buffer, Stem::Vocals) {
            Ok(v) => v,
            Err(e) => return set.record("vocals", self.separator.name(), e),
        };
        match self.harmony.extract(&vocals, self.config.harmony_voices) {
            Ok(layers) => {
                set.tracks.insert("lead_vocal".into(), layers.lead);
                for (i, voice) in layers
                    .harmonies
                    .into_iter()
                    .take(self.config.harmony_voices)
                    .enumerate()
                {
                    set.tracks.insert(format!("harmony_{}", i + 1), voice);
                }
            }
            Err(e) => {
                set.record("harmony_extraction", self.harmony.name(), e);
                set.tracks.insert("vocals".into(), vocals);
            }
        }
    }

    fn drums(&self, buffer: &SampleBuffer, set: &mut SeparatedTrackSet) {
        let drums = match self.separator.separate(buffer, Stem::Drums) {
            Ok(d) => d,
            Err(e) => return set.record("drums", self.separator.name(), e),
        };
        match split_drums(&drums) {
            Ok(parts) => {
                for (name, part) in parts {
                    set.tracks.insert(name.into(), part);
                }
            }
            Err(e) => set.record("drum_split", "drum_split", e),
        }
        set.tracks.insert("drums".into(), drums);
    }

    fn instruments(&self, buffer: &SampleBuffer, set: &mut SeparatedTrackSet) {
        let instruments = match self.separator.separate_instruments(buffer) {
            Ok(list) => list,
            Err(e) => return set.record("instruments", self.separator.name(), e),
        };
        let notation = self.notation.as_ref().filter(|_| self.config.generate_notation);

        for (instrument, track) in instruments {
            let name = unique_track_name(instrument_track_name(&instrument), &set.tracks);
            if let Some(generator) = notation {
                match generator.transcribe(&track, &instrument) {
                    Ok(n) => {
                        set.notation.insert(name.clone(), n);
                    }
                    Err(e) => set.record(format!("notation:{}", instrument), generator.name(), e),
                }
            }
            set.tracks.insert(name, track);
        }
    }
}

/// Render every track into `format` and sum them.
///
/// Tracks are visited in name order. The mix is as long as the longest
/// track and is scaled down if its peak exceeds 1.0.
pub fn create_immersive_mix(
    tracks: &BTreeMap<String, SampleBuffer>,
    format: &ImmersiveFormat,
) -> Result<ImmersiveOutput> {
    let mut iter = tracks.values();
    let Some(first) = iter.next() else {
        return Err(Error::invalid("no tracks to mix"));
    };
    let sample_rate = first.sample_rate();
    if let Some(other) = iter.find(|t| t.sample_rate() != sample_rate) {
        return Err(Error::invalid(format!(
            "cannot mix tracks at {} Hz and {} Hz",
            sample_rate,
            other.sample_rate()
        )));
    }

    let mut mix: Vec<Vec<f32>> = Vec::new();
    let mut metadata = None;
    for (name, track) in tracks {
        let rendered = render_format(track, format, false)?;
        log::debug!("Mixing '{}' ({} ch)", name, rendered.buffer.channel_count());
        if metadata.is_none() {
            metadata = rendered.metadata;
        }

        let channels = rendered.buffer.channels();
        if mix.len() < channels.len() {
            mix.resize(channels.len(), Vec::new());
        }
        for (acc, ch) in mix.iter_mut().zip(channels) {
            if acc.len() < ch.len() {
                acc.resize(ch.len(), 0.0);
            }
            for (a, s) in acc.iter_mut().zip(ch) {
                *a += s;
            }
        }
    }

    let frames = mix.iter().map(Vec::len).max().unwrap_or(0);
    for ch in &mut mix {
        ch.resize(frames, 0.0);
    }

    let mut buffer = SampleBuffer::new(mix, sample_rate)?;
    let peak = buffer.peak();
    if peak > 1.0 {
        let channels = buffer
            .channels()
            .iter()
            .map(|ch| ch.iter().map(|s| s / peak).collect())
            .collect();
        buffer = buffer.with_channels(channels)?;
    }

    Ok(ImmersiveOutput { buffer, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immersive::FormatType;
    use crate::separation::capability::VocalLayers;

    fn tone(frames: usize, level: f32) -> SampleBuffer {
        SampleBuffer::mono(vec![level; frames], 44100).unwrap()
    }

    struct FakeSeparator {
        fail_instruments: bool,
        fail_all: bool,
        instruments: &'static [&'static str],
    }

    impl StemSeparator for FakeSeparator {
        fn separate(&self, buffer: &SampleBuffer, stem: Stem) -> Result<SampleBuffer> {
            if self.fail_all {
                return Err(Error::capability("fake", format!("{} unavailable", stem)));
            }
            Ok(tone(buffer.frames(), 0.1))
        }

        fn separate_instruments(
            &self,
            buffer: &SampleBuffer,
        ) -> Result<Vec<(String, SampleBuffer)>> {
            if self.fail_instruments || self.fail_all {
                return Err(Error::capability("fake", "timeout"));
            }
            Ok(self
                .instruments
                .iter()
                .map(|name| (name.to_string(), tone(buffer.frames(), 0.2)))
                .collect())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    struct FakeHarmony {
        fail: bool,
    }

    impl HarmonyExtractor for FakeHarmony {
        fn extract(&self, vocals: &SampleBuffer, max_voices: usize) -> Result<VocalLayers> {
            if self.fail {
                return Err(Error::invalid("no pitch track"));
            }
            Ok(VocalLayers {
                lead: vocals.clone(),
                harmonies: vec![vocals.clone(); max_voices + 2],
            })
        }

        fn name(&self) -> &'static str {
            "fake_harmony"
        }
    }

    struct FakeNotation;

    impl NotationGenerator for FakeNotation {
        fn transcribe(&self, _buffer: &SampleBuffer, instrument: &str) -> Result<Notation> {
            if instrument.eq_ignore_ascii_case("piano") {
                Ok(Notation {
                    format: "audio/midi".into(),
                    bytes: b"MThd".to_vec(),
                })
            } else {
                Err(Error::capability("fake_notation", "unsupported instrument"))
            }
        }

        fn name(&self) -> &'static str {
            "fake_notation"
        }
    }

    fn separator(fail_instruments: bool, fail_all: bool, harmony_fails: bool) -> TrackSeparator {
        with_instruments(fail_instruments, fail_all, harmony_fails, &["Piano", "electric guitar"])
    }

    fn with_instruments(
        fail_instruments: bool,
        fail_all: bool,
        harmony_fails: bool,
        instruments: &'static [&'static str],
    ) -> TrackSeparator {
        TrackSeparator::new(
            Arc::new(FakeSeparator {
                fail_instruments,
                fail_all,
                instruments,
            }),
            Arc::new(FakeHarmony { fail: harmony_fails }),
            Some(Arc::new(FakeNotation)),
            SeparationConfig {
                harmony_voices: 2,
                generate_notation: true,
            },
        )
    }

    #[test]
    fn full_run_names_every_track() {
        let set = separator(false, false, false).separate_tracks(&tone(4410, 0.5)).unwrap();
        assert_eq!(
            set.track_names(),
            vec![
                "bass",
                "drum_hihat",
                "drum_kick",
                "drum_snare",
                "drums",
                "harmony_1",
                "harmony_2",
                "instrument_electric_guitar",
                "instrument_piano",
                "lead_vocal",
                "other",
            ]
        );
        assert_eq!(set.notation["instrument_piano"].format, "audio/midi");
        // Guitar notation failed but its track is still there
        assert_eq!(set.failures.len(), 1);
        assert_eq!(set.failures[0].stage, "notation:electric guitar");
    }

    #[test]
    fn colliding_instrument_names_get_distinct_tracks() {
        let set = with_instruments(false, false, false, &["Piano", "piano", "e-guitar", "e guitar"])
            .separate_tracks(&tone(4410, 0.5))
            .unwrap();
        let instruments: Vec<&str> = set
            .track_names()
            .into_iter()
            .filter(|n| n.starts_with("instrument_"))
            .collect();
        assert_eq!(
            instruments,
            vec![
                "instrument_e_guitar",
                "instrument_e_guitar_2",
                "instrument_piano",
                "instrument_piano_2",
            ]
        );
        // Notation follows the same keys
        assert!(set.notation.contains_key("instrument_piano"));
        assert!(set.notation.contains_key("instrument_piano_2"));
    }

    #[test]
    fn instrument_failure_keeps_vocals_and_drums() {
        let set = separator(true, false, false).separate_tracks(&tone(4410, 0.5)).unwrap();
        assert!(!set.is_complete());
        assert!(set.track("lead_vocal").is_some());
        assert!(set.track("drum_kick").is_some());
        assert!(set.track("drums").is_some());
        assert!(set.tracks.keys().all(|k| !k.starts_with("instrument_")));
        assert_eq!(set.failures.len(), 1);
        assert!(matches!(
            set.failures[0].error,
            Error::ExternalCapabilityFailure { .. }
        ));
    }

    #[test]
    fn failed_harmony_keeps_raw_vocals() {
        let set = separator(false, false, true).separate_tracks(&tone(4410, 0.5)).unwrap();
        assert!(set.track("vocals").is_some());
        assert!(set.track("lead_vocal").is_none());
        let failure = set.failures.iter().find(|f| f.stage == "harmony_extraction").unwrap();
        // Non-capability errors are wrapped
        match &failure.error {
            Error::ExternalCapabilityFailure { capability, .. } => {
                assert_eq!(capability, "fake_harmony")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nothing_separated_is_an_error() {
        let result = separator(false, true, false).separate_tracks(&tone(4410, 0.5));
        assert!(matches!(result, Err(Error::ExternalCapabilityFailure { .. })));
        assert!(separator(false, false, false)
            .separate_tracks(&tone(0, 0.0))
            .is_err());
    }

    #[test]
    fn mix_sums_and_limits() {
        let mut tracks = BTreeMap::new();
        tracks.insert("a".to_string(), tone(100, 0.8));
        tracks.insert("b".to_string(), tone(50, 0.8));
        let format = ImmersiveFormat::new(FormatType::Binaural);
        let out = create_immersive_mix(&tracks, &format).unwrap();
        assert_eq!(out.buffer.frames(), 100);
        assert_eq!(out.buffer.channel_count(), 2);
        assert!(out.buffer.peak() <= 1.0 + 1e-6);
        assert_eq!(out.metadata.unwrap().format_type, "binaural");
    }

    #[test]
    fn mix_rejects_empty_and_mismatched_rates() {
        let format = ImmersiveFormat::new(FormatType::DolbyAtmos);
        assert!(matches!(
            create_immersive_mix(&BTreeMap::new(), &format),
            Err(Error::InvalidInput(_))
        ));

        let mut tracks = BTreeMap::new();
        tracks.insert("a".to_string(), tone(10, 0.1));
        tracks.insert("b".to_string(), SampleBuffer::mono(vec![0.1; 10], 48000).unwrap());
        assert!(matches!(
            create_immersive_mix(&tracks, &format),
            Err(Error::InvalidInput(_))
        ));
    }
}
