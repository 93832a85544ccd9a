use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use cadenza::processing::EqPreset;
use cadenza::theory::{Grid, HarmonyType};

#[derive(Parser, Debug)]
#[command(name = "cadenza", version, about = "Audio analysis, processing and music-theory toolkit")]
pub struct Cli {
    /// Config file (defaults to ./cadenza.toml or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Process on the calling thread instead of the worker pool
    #[arg(long, global = true)]
    pub direct: bool,

    /// Tuning reference for A4 in Hz
    #[arg(long, global = true)]
    pub tuning: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print acoustic features as JSON
    Analyze {
        /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
        input: PathBuf,
    },

    /// Run the signal chain and write a float WAV
    Process {
        input: PathBuf,

        #[arg(short, long, default_value = "processed.wav")]
        output: PathBuf,

        #[arg(long)]
        denoise: bool,

        #[arg(long)]
        normalize: bool,

        /// Soft-clip peaks above 0.8
        #[arg(long)]
        declip: bool,

        /// Mid/side widening for stereo input
        #[arg(long)]
        stereo: bool,

        #[arg(long, value_enum)]
        eq: Option<EqArg>,

        /// Custom EQ gains in dB, 8 comma-separated bands
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        custom_eq: Vec<f32>,

        #[command(flatten)]
        immersive: ImmersiveArgs,
    },

    /// Crossfade the gain of a key change into the audio
    Retune {
        input: PathBuf,

        #[arg(short, long, default_value = "retuned.wav")]
        output: PathBuf,

        /// Source key root, e.g. C or F#
        #[arg(long, default_value = "C")]
        from: String,

        /// Destination key root
        #[arg(long)]
        to: String,

        /// Seconds into the audio where the new key starts
        #[arg(long, default_value_t = 0.0)]
        at: f64,

        /// Crossfade length in seconds
        #[arg(long, default_value_t = cadenza::theory::DEFAULT_TRANSITION)]
        transition: f64,
    },

    /// Generate harmony voices for a melody given as frequencies
    Harmonize {
        /// Melody in Hz, comma-separated (0 for rests)
        #[arg(long, value_delimiter = ',', required = true)]
        notes: Vec<f64>,

        #[arg(long, value_enum, default_value_t = HarmonyArg::Parallel)]
        style: HarmonyArg,

        #[arg(long, default_value_t = 3)]
        voices: usize,

        /// Key root
        #[arg(long, default_value = "C")]
        key: String,

        #[arg(long, default_value = "major")]
        scale: String,

        #[arg(long, default_value = "ionian")]
        mode: String,
    },

    /// Map melody frequencies from one key into another
    Transpose {
        #[arg(long, value_delimiter = ',', required = true)]
        notes: Vec<f64>,

        #[arg(long, default_value = "C")]
        from: String,

        #[arg(long, default_value = "major")]
        from_scale: String,

        #[arg(long)]
        to: String,

        #[arg(long, default_value = "major")]
        to_scale: String,
    },

    /// Locate a timestamp in the bar structure
    Beat {
        /// Seconds
        time: f64,

        /// BPM; falls back to the config tempo
        #[arg(long)]
        tempo: Option<f64>,

        #[arg(long, value_enum, default_value_t = GridArg::Quarter)]
        grid: GridArg,
    },

    /// Split into named stems through the separation service
    Separate {
        input: PathBuf,

        /// Directory for the track WAVs
        #[arg(short, long, default_value = "stems")]
        out_dir: PathBuf,

        /// Separation service base URL
        #[arg(long)]
        service: Option<String>,

        /// Request notation for each instrument track
        #[arg(long)]
        notation: bool,

        #[command(flatten)]
        immersive: ImmersiveArgs,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ImmersiveArgs {
    /// Render into an immersive format (dolby_atmos, binaural, ambisonics, ...)
    #[arg(long)]
    pub format: Option<String>,

    /// Channel layout within the format, e.g. 9.1.6
    #[arg(long)]
    pub layout: Option<String>,

    /// Fail on unknown formats instead of passing audio through
    #[arg(long)]
    pub strict: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EqArg {
    None,
    Voice,
    Music,
    Bass,
    Custom,
}

impl From<EqArg> for EqPreset {
    fn from(arg: EqArg) -> Self {
        match arg {
            EqArg::None => EqPreset::None,
            EqArg::Voice => EqPreset::Voice,
            EqArg::Music => EqPreset::Music,
            EqArg::Bass => EqPreset::Bass,
            EqArg::Custom => EqPreset::Custom,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum HarmonyArg {
    Parallel,
    Oblique,
    Contrary,
}

impl From<HarmonyArg> for HarmonyType {
    fn from(arg: HarmonyArg) -> Self {
        match arg {
            HarmonyArg::Parallel => HarmonyType::Parallel,
            HarmonyArg::Oblique => HarmonyType::Oblique,
            HarmonyArg::Contrary => HarmonyType::Contrary,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GridArg {
    Whole,
    Half,
    Quarter,
    Eighth,
}

impl From<GridArg> for Grid {
    fn from(arg: GridArg) -> Self {
        match arg {
            GridArg::Whole => Grid::Whole,
            GridArg::Half => Grid::Half,
            GridArg::Quarter => Grid::Quarter,
            GridArg::Eighth => Grid::Eighth,
        }
    }
}
