//! Immersive format routing: picks a channel-layout profile for the requested
//! format, renders the input into it and tags the result.

pub mod layout;
pub mod render;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::audio::buffer::SampleBuffer;
use crate::error::{Error, Result};
pub use layout::{Layout, Profile, RenderMode};

const DEFAULT_BINAURAL_MODEL: &str = "itd_ild";

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatType {
    #[default]
    DolbyAtmos,
    SpatialAudio,
    Sony360,
    Ambisonics,
    Binaural,
    Auro3d,
    DtsX,
    /// Anything else; passed through unrendered
    Other(String),
}

impl FormatType {
    pub const KNOWN: [FormatType; 7] = [
        FormatType::DolbyAtmos,
        FormatType::SpatialAudio,
        FormatType::Sony360,
        FormatType::Ambisonics,
        FormatType::Binaural,
        FormatType::Auro3d,
        FormatType::DtsX,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            FormatType::DolbyAtmos => "dolby_atmos",
            FormatType::SpatialAudio => "spatial_audio",
            FormatType::Sony360 => "sony_360",
            FormatType::Ambisonics => "ambisonics",
            FormatType::Binaural => "binaural",
            FormatType::Auro3d => "auro3d",
            FormatType::DtsX => "dts_x",
            FormatType::Other(name) => name,
        }
    }
}

impl From<&str> for FormatType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "dolby_atmos" => FormatType::DolbyAtmos,
            "spatial_audio" => FormatType::SpatialAudio,
            "sony_360" => FormatType::Sony360,
            "ambisonics" => FormatType::Ambisonics,
            "binaural" => FormatType::Binaural,
            "auro3d" => FormatType::Auro3d,
            "dts_x" => FormatType::DtsX,
            _ => FormatType::Other(s.to_string()),
        }
    }
}

impl From<String> for FormatType {
    fn from(s: String) -> Self {
        FormatType::from(s.as_str())
    }
}

impl From<FormatType> for String {
    fn from(f: FormatType) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target format descriptor
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImmersiveFormat {
    #[serde(rename = "type")]
    pub format_type: FormatType,
    #[serde(default)]
    pub channel_layout: Option<String>,
    /// Overrides the profile's render mode
    #[serde(default)]
    pub render_mode: Option<RenderMode>,
    #[serde(default)]
    pub binaural_mode: Option<String>,
}

impl ImmersiveFormat {
    pub fn new(format_type: FormatType) -> Self {
        Self {
            format_type,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImmersiveOptions {
    pub enabled: bool,
    /// Unknown formats fail instead of passing through
    pub strict: bool,
    pub format: ImmersiveFormat,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImmersiveMetadata {
    pub format_type: String,
    pub channel_layout: String,
    pub render_mode: RenderMode,
    pub target_loudness_lufs: f32,
    pub channel_labels: Vec<String>,
    pub binaural: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImmersiveOutput {
    pub buffer: SampleBuffer,
    /// `None` when the buffer passed through untouched
    pub metadata: Option<ImmersiveMetadata>,
}

impl ImmersiveOutput {
    fn passthrough(buffer: &SampleBuffer) -> Self {
        Self {
            buffer: buffer.clone(),
            metadata: None,
        }
    }
}

/// Route `buffer` according to `options`. Absent or disabled options return
/// the input unchanged.
pub fn process_immersive(
    buffer: &SampleBuffer,
    options: Option<&ImmersiveOptions>,
) -> Result<ImmersiveOutput> {
    match options {
        Some(opts) if opts.enabled => render_format(buffer, &opts.format, opts.strict),
        _ => Ok(ImmersiveOutput::passthrough(buffer)),
    }
}

pub fn render_format(
    buffer: &SampleBuffer,
    format: &ImmersiveFormat,
    strict: bool,
) -> Result<ImmersiveOutput> {
    let Some(profile) = layout::profile(&format.format_type) else {
        if strict {
            return Err(Error::UnsupportedConfiguration(format!(
                "unknown immersive format '{}'",
                format.format_type
            )));
        }
        log::warn!(
            "Unknown immersive format '{}', passing audio through",
            format.format_type
        );
        return Ok(ImmersiveOutput::passthrough(buffer));
    };

    let layout = profile.resolve_layout(&format.format_type, format.channel_layout.as_deref());
    let rendered = render::render(buffer, &layout)?;

    let binaural = match format.format_type {
        FormatType::Binaural => Some(
            format
                .binaural_mode
                .clone()
                .unwrap_or_else(|| DEFAULT_BINAURAL_MODEL.to_string()),
        ),
        _ => format.binaural_mode.clone(),
    };
    let metadata = ImmersiveMetadata {
        format_type: format.format_type.to_string(),
        channel_layout: layout.name().to_string(),
        render_mode: format.render_mode.unwrap_or(profile.render_mode),
        target_loudness_lufs: profile.loudness_lufs,
        channel_labels: layout.channel_labels(),
        binaural,
    };

    log::info!(
        "Rendered {} ch into {} {} ({} ch, {})",
        buffer.channel_count(),
        metadata.format_type,
        metadata.channel_layout,
        rendered.channel_count(),
        metadata.render_mode.as_str()
    );

    Ok(ImmersiveOutput {
        buffer: rendered,
        metadata: Some(metadata),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo() -> SampleBuffer {
        SampleBuffer::new(vec![vec![0.25; 480], vec![-0.25; 480]], 48000).unwrap()
    }

    fn enabled(format: ImmersiveFormat) -> ImmersiveOptions {
        ImmersiveOptions {
            enabled: true,
            strict: false,
            format,
        }
    }

    #[test]
    fn disabled_or_absent_is_a_no_op() {
        let buf = stereo();
        let out = process_immersive(&buf, None).unwrap();
        assert_eq!(out.buffer, buf);
        assert!(out.metadata.is_none());

        let off = ImmersiveOptions {
            enabled: false,
            ..enabled(ImmersiveFormat::new(FormatType::DolbyAtmos))
        };
        let out = process_immersive(&buf, Some(&off)).unwrap();
        assert_eq!(out.buffer, buf);
        assert!(out.metadata.is_none());
    }

    #[test]
    fn atmos_renders_seven_one_four() {
        let opts = enabled(ImmersiveFormat::new(FormatType::DolbyAtmos));
        let out = process_immersive(&stereo(), Some(&opts)).unwrap();
        let meta = out.metadata.unwrap();
        assert_eq!(out.buffer.channel_count(), 12);
        assert_eq!(out.buffer.frames(), 480);
        assert_eq!(meta.channel_layout, "7.1.4");
        assert_eq!(meta.render_mode, RenderMode::Objects);
        assert_eq!(meta.target_loudness_lufs, -18.0);
        assert_eq!(meta.channel_labels.len(), 12);
        assert!(meta.binaural.is_none());
    }

    #[test]
    fn render_mode_override_and_layout_choice() {
        let format = ImmersiveFormat {
            format_type: FormatType::DolbyAtmos,
            channel_layout: Some("5.1.2".into()),
            render_mode: Some(RenderMode::Channels),
            binaural_mode: None,
        };
        let out = render_format(&stereo(), &format, false).unwrap();
        let meta = out.metadata.unwrap();
        assert_eq!(meta.channel_layout, "5.1.2");
        assert_eq!(meta.render_mode, RenderMode::Channels);
        assert_eq!(out.buffer.channel_count(), 8);
    }

    #[test]
    fn binaural_and_ambisonics_shapes() {
        let out =
            render_format(&stereo(), &ImmersiveFormat::new(FormatType::Binaural), false).unwrap();
        assert_eq!(out.buffer.channel_count(), 2);
        assert_eq!(out.metadata.unwrap().binaural.as_deref(), Some("itd_ild"));

        let out =
            render_format(&stereo(), &ImmersiveFormat::new(FormatType::Ambisonics), false).unwrap();
        let meta = out.metadata.unwrap();
        assert_eq!(meta.channel_labels, vec!["W", "Y", "Z", "X"]);
        assert_eq!(meta.target_loudness_lufs, -23.0);
    }

    #[test]
    fn unknown_format_passes_through_unless_strict() {
        let format = ImmersiveFormat::new(FormatType::from("mpeg_h"));
        let buf = stereo();
        let out = render_format(&buf, &format, false).unwrap();
        assert_eq!(out.buffer, buf);
        assert!(out.metadata.is_none());

        assert!(matches!(
            render_format(&buf, &format, true),
            Err(Error::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn format_parses_from_toml() {
        let opts: ImmersiveOptions = toml::from_str(
            r#"
            enabled = true
            [format]
            type = "dts_x"
            channel_layout = "11.1"
            render_mode = "hybrid"
            "#,
        )
        .unwrap();
        assert_eq!(opts.format.format_type, FormatType::DtsX);
        assert_eq!(opts.format.render_mode, Some(RenderMode::Hybrid));
        assert!(!opts.strict);
        assert_eq!(FormatType::from("Sony_360"), FormatType::Sony360);
    }
}
