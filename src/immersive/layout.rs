//! Format profiles and speaker tables.
//!
//! Azimuth is in degrees, positive to the left, 0 straight ahead. Elevation is
//! in degrees above the listener plane.

use serde::{Deserialize, Serialize};

use super::FormatType;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Channels,
    Objects,
    Hybrid,
}

impl RenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Channels => "channels",
            RenderMode::Objects => "objects",
            RenderMode::Hybrid => "hybrid",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Speaker {
    pub label: &'static str,
    pub azimuth: f32,
    pub elevation: f32,
    pub lfe: bool,
}

const fn sp(label: &'static str, azimuth: f32, elevation: f32) -> Speaker {
    Speaker {
        label,
        azimuth,
        elevation,
        lfe: false,
    }
}

const LFE: Speaker = Speaker {
    label: "LFE",
    azimuth: 0.0,
    elevation: 0.0,
    lfe: true,
};

const STEREO: &[Speaker] = &[sp("L", 30.0, 0.0), sp("R", -30.0, 0.0)];

const SURROUND_5_1_2: &[Speaker] = &[
    sp("L", 30.0, 0.0),
    sp("R", -30.0, 0.0),
    sp("C", 0.0, 0.0),
    LFE,
    sp("Ls", 110.0, 0.0),
    sp("Rs", -110.0, 0.0),
    sp("Ltm", 90.0, 45.0),
    sp("Rtm", -90.0, 45.0),
];

const SURROUND_7_1_4: &[Speaker] = &[
    sp("L", 30.0, 0.0),
    sp("R", -30.0, 0.0),
    sp("C", 0.0, 0.0),
    LFE,
    sp("Lss", 90.0, 0.0),
    sp("Rss", -90.0, 0.0),
    sp("Lrs", 150.0, 0.0),
    sp("Rrs", -150.0, 0.0),
    sp("Ltf", 45.0, 45.0),
    sp("Rtf", -45.0, 45.0),
    sp("Ltr", 135.0, 45.0),
    sp("Rtr", -135.0, 45.0),
];

const SURROUND_9_1_6: &[Speaker] = &[
    sp("L", 30.0, 0.0),
    sp("R", -30.0, 0.0),
    sp("C", 0.0, 0.0),
    LFE,
    sp("Lw", 60.0, 0.0),
    sp("Rw", -60.0, 0.0),
    sp("Lss", 90.0, 0.0),
    sp("Rss", -90.0, 0.0),
    sp("Lrs", 150.0, 0.0),
    sp("Rrs", -150.0, 0.0),
    sp("Ltf", 45.0, 45.0),
    sp("Rtf", -45.0, 45.0),
    sp("Ltm", 90.0, 45.0),
    sp("Rtm", -90.0, 45.0),
    sp("Ltr", 135.0, 45.0),
    sp("Rtr", -135.0, 45.0),
];

// 360 Reality Audio style: 7 ear-level, 4 top, 2 bottom
const SONY_13_0: &[Speaker] = &[
    sp("L", 30.0, 0.0),
    sp("R", -30.0, 0.0),
    sp("C", 0.0, 0.0),
    sp("Ls", 110.0, 0.0),
    sp("Rs", -110.0, 0.0),
    sp("Lb", 150.0, 0.0),
    sp("Rb", -150.0, 0.0),
    sp("TpL", 45.0, 45.0),
    sp("TpR", -45.0, 45.0),
    sp("TpLb", 135.0, 45.0),
    sp("TpRb", -135.0, 45.0),
    sp("BtL", 30.0, -30.0),
    sp("BtR", -30.0, -30.0),
];

const AURO_9_1: &[Speaker] = &[
    sp("L", 30.0, 0.0),
    sp("R", -30.0, 0.0),
    sp("C", 0.0, 0.0),
    LFE,
    sp("Ls", 110.0, 0.0),
    sp("Rs", -110.0, 0.0),
    sp("HL", 30.0, 30.0),
    sp("HR", -30.0, 30.0),
    sp("HLs", 110.0, 30.0),
    sp("HRs", -110.0, 30.0),
];

const AURO_13_1: &[Speaker] = &[
    sp("L", 30.0, 0.0),
    sp("R", -30.0, 0.0),
    sp("C", 0.0, 0.0),
    LFE,
    sp("Lss", 90.0, 0.0),
    sp("Rss", -90.0, 0.0),
    sp("Lrs", 150.0, 0.0),
    sp("Rrs", -150.0, 0.0),
    sp("HL", 30.0, 30.0),
    sp("HR", -30.0, 30.0),
    sp("HC", 0.0, 30.0),
    sp("HLs", 110.0, 30.0),
    sp("HRs", -110.0, 30.0),
    sp("T", 0.0, 90.0),
];

const DTS_11_1: &[Speaker] = &[
    sp("L", 30.0, 0.0),
    sp("R", -30.0, 0.0),
    sp("C", 0.0, 0.0),
    LFE,
    sp("Lw", 60.0, 0.0),
    sp("Rw", -60.0, 0.0),
    sp("Lss", 90.0, 0.0),
    sp("Rss", -90.0, 0.0),
    sp("Lrs", 150.0, 0.0),
    sp("Rrs", -150.0, 0.0),
    sp("Lh", 30.0, 45.0),
    sp("Rh", -30.0, 45.0),
];

/// ACN channel order, SN3D normalization
pub const FOA_LABELS: [&str; 4] = ["W", "Y", "Z", "X"];

/// How a layout is produced from the input sources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Layout {
    Speakers(&'static str, &'static [Speaker]),
    FirstOrderAmbisonics,
    Binaural,
}

impl Layout {
    pub fn name(&self) -> &'static str {
        match self {
            Layout::Speakers(name, _) => name,
            Layout::FirstOrderAmbisonics => "foa",
            Layout::Binaural => "stereo",
        }
    }

    pub fn channel_labels(&self) -> Vec<String> {
        match self {
            Layout::Speakers(_, speakers) => speakers.iter().map(|s| s.label.to_string()).collect(),
            Layout::FirstOrderAmbisonics => FOA_LABELS.iter().map(|l| l.to_string()).collect(),
            Layout::Binaural => vec!["L".into(), "R".into()],
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            Layout::Speakers(_, speakers) => speakers.len(),
            Layout::FirstOrderAmbisonics => FOA_LABELS.len(),
            Layout::Binaural => 2,
        }
    }
}

fn speakers(name: &str) -> Option<Layout> {
    let table = match name {
        "stereo" => ("stereo", STEREO),
        "5.1.2" => ("5.1.2", SURROUND_5_1_2),
        "7.1.4" => ("7.1.4", SURROUND_7_1_4),
        "9.1.6" => ("9.1.6", SURROUND_9_1_6),
        "13.0" => ("13.0", SONY_13_0),
        "9.1" => ("9.1", AURO_9_1),
        "13.1" => ("13.1", AURO_13_1),
        "11.1" => ("11.1", DTS_11_1),
        _ => return None,
    };
    Some(Layout::Speakers(table.0, table.1))
}

/// Per-format rendering defaults
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Profile {
    /// Supported layouts, default first
    pub layouts: &'static [&'static str],
    pub render_mode: RenderMode,
    pub loudness_lufs: f32,
}

impl Profile {
    pub fn default_layout(&self) -> &'static str {
        self.layouts[0]
    }

    /// The requested layout if this profile supports it, else the default.
    pub fn resolve_layout(&self, format: &FormatType, requested: Option<&str>) -> Layout {
        let name = match requested {
            Some(name) if self.layouts.iter().any(|l| *l == name) => name,
            Some(name) => {
                log::warn!(
                    "Layout '{}' not supported for {}, using {}",
                    name,
                    format,
                    self.default_layout()
                );
                self.default_layout()
            }
            None => self.default_layout(),
        };
        match format {
            FormatType::Ambisonics => Layout::FirstOrderAmbisonics,
            FormatType::Binaural => Layout::Binaural,
            // Every profile layout has a speaker table
            _ => speakers(name).unwrap_or(Layout::Speakers("stereo", STEREO)),
        }
    }
}

pub fn profile(format: &FormatType) -> Option<Profile> {
    let (layouts, render_mode, loudness_lufs): (&'static [&'static str], _, _) = match format {
        FormatType::DolbyAtmos => (&["7.1.4", "9.1.6", "5.1.2"], RenderMode::Objects, -18.0),
        FormatType::SpatialAudio => (&["7.1.4"], RenderMode::Hybrid, -16.0),
        FormatType::Sony360 => (&["13.0"], RenderMode::Objects, -14.0),
        FormatType::Ambisonics => (&["foa"], RenderMode::Channels, -23.0),
        FormatType::Binaural => (&["stereo"], RenderMode::Channels, -16.0),
        FormatType::Auro3d => (&["9.1", "13.1"], RenderMode::Channels, -23.0),
        FormatType::DtsX => (&["7.1.4", "11.1"], RenderMode::Objects, -18.0),
        FormatType::Other(_) => return None,
    };
    Some(Profile {
        layouts,
        render_mode,
        loudness_lufs,
    })
}
