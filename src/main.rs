mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cadenza::audio::decode::decode_file;
use cadenza::audio::encode::write_wav;
use cadenza::immersive::{FormatType, ImmersiveFormat, ImmersiveMetadata, ImmersiveOptions};
use cadenza::separation::{HttpStemService, NotationGenerator, TrackSeparator};
use cadenza::theory::{
    HarmonyGenerator, HarmonySettings, KeySignature, Mode, MusicTheory, PitchClass, RhythmProcessor,
    Scale,
};
use cadenza::{Engine, ProcessingOptions, SampleBuffer};
use cli::{Cli, Command, ImmersiveArgs};
use config::Config;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };
    // CLI flags override the file
    if cli.direct {
        cfg.engine.accelerated = false;
    }
    if let Some(tuning) = cli.tuning {
        cfg.theory.tuning = tuning;
    }

    let theory = MusicTheory::new(cfg.theory.tuning).context("Invalid tuning reference")?;
    let engine = Engine::new(cfg.engine.clone(), theory);

    match cli.command {
        Command::Analyze { input } => {
            let buffer = load(&input)?;
            let result = engine.analyze(&buffer)?;
            log::info!(
                "Spectral centroid: {:.0} Hz, tempo: {:.0} BPM",
                result.spectral_centroid_hz(),
                result.tempo
            );
            print_json(&result)?;
        }

        Command::Process {
            input,
            output,
            denoise,
            normalize,
            declip,
            stereo,
            eq,
            custom_eq,
            immersive,
        } => {
            let mut options = cfg.processing.clone();
            options.denoise |= denoise;
            options.normalize |= normalize;
            options.remove_clipping |= declip;
            options.enhance_stereo |= stereo;
            if let Some(eq) = eq {
                options.eq_preset = eq.into();
            }
            if !custom_eq.is_empty() {
                options.custom_eq = custom_eq;
            }
            if let Some(imm) = immersive_options(&immersive) {
                options.immersive = Some(imm);
            }
            run_process(&engine, &input, &output, &options)?;
        }

        Command::Retune {
            input,
            output,
            from,
            to,
            at,
            transition,
        } => {
            let buffer = load(&input)?;
            let from =
                KeySignature::new(PitchClass::parse(&from)?, Scale::Major, Mode::Ionian, 0.0);
            let to = KeySignature::new(PitchClass::parse(&to)?, Scale::Major, Mode::Ionian, at);
            let keys = engine.key_processor(vec![from.clone(), to.clone()]);
            let retuned = keys.process_key_change(&buffer, &from, &to, transition)?;
            write_wav(&output, &retuned)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            log::info!("Done! Output: {}", output.display());
        }

        Command::Harmonize {
            notes,
            style,
            voices,
            key,
            scale,
            mode,
        } => {
            let key = KeySignature::new(
                PitchClass::parse(&key)?,
                Scale::from_name(&scale),
                Mode::from_name(&mode),
                0.0,
            );
            let settings = HarmonySettings {
                harmony_type: style.into(),
                voice_count: voices,
            };
            let generated = HarmonyGenerator.generate(&notes, &settings, &key)?;
            print_json(&generated)?;
        }

        Command::Transpose {
            notes,
            from,
            from_scale,
            to,
            to_scale,
        } => {
            let from = KeySignature::new(
                PitchClass::parse(&from)?,
                Scale::from_name(&from_scale),
                Mode::Ionian,
                0.0,
            );
            let to = KeySignature::new(
                PitchClass::parse(&to)?,
                Scale::from_name(&to_scale),
                Mode::Ionian,
                0.0,
            );
            print_json(&engine.scale_transformer().transform(&notes, &from, &to))?;
        }

        Command::Beat { time, tempo, grid } => {
            let tempo = tempo.unwrap_or(cfg.theory.tempo);
            let rhythm = RhythmProcessor::new(cfg.theory.time_signatures.clone());
            let keys = engine.key_processor(cfg.theory.keys.clone());
            print_json(&BeatReport {
                time,
                tempo,
                time_signature: format_signature(&rhythm, time),
                key: keys.key_signature_at_time(time),
                position: rhythm.beat_position(time, tempo)?,
                quantized: rhythm.quantize_time(time, tempo, grid.into())?,
            })?;
        }

        Command::Separate {
            input,
            out_dir,
            service,
            notation,
            immersive,
        } => {
            if let Some(url) = service {
                cfg.service.base_url = url;
            }
            cfg.separation.generate_notation |= notation;
            run_separate(&cfg, &input, &out_dir, &immersive)?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BeatReport {
    time: f64,
    tempo: f64,
    time_signature: String,
    key: KeySignature,
    position: cadenza::theory::BeatPosition,
    quantized: f64,
}

fn format_signature(rhythm: &RhythmProcessor, time: f64) -> String {
    let ts = rhythm.time_signature_at_time(time);
    format!("{}/{}", ts.numerator, ts.denominator)
}

fn load(input: &Path) -> Result<SampleBuffer> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    log::info!("Decoding audio...");
    decode_file(input).with_context(|| format!("Failed to decode {}", input.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn immersive_options(args: &ImmersiveArgs) -> Option<ImmersiveOptions> {
    let format = args.format.as_deref()?;
    Some(ImmersiveOptions {
        enabled: true,
        strict: args.strict,
        format: ImmersiveFormat {
            format_type: FormatType::from(format),
            channel_layout: args.layout.clone(),
            ..Default::default()
        },
    })
}

/// `<output>.json` next to the rendered audio
fn write_metadata(output: &Path, metadata: &ImmersiveMetadata) -> Result<()> {
    let path = output.with_extension("json");
    std::fs::write(&path, serde_json::to_string_pretty(metadata)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Metadata: {}", path.display());
    Ok(())
}

fn run_process(
    engine: &Engine,
    input: &Path,
    output: &Path,
    options: &ProcessingOptions,
) -> Result<()> {
    let buffer = load(input)?;
    log::info!("Processing with {:?} strategy...", engine.strategy());
    let processed = engine.process(&buffer, options)?;
    let rendered = engine.process_immersive(&processed, options)?;

    write_wav(output, &rendered.buffer)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    if let Some(metadata) = &rendered.metadata {
        write_metadata(output, metadata)?;
    }
    log::info!("Done! Output: {}", output.display());
    Ok(())
}

fn notation_extension(format: &str) -> &'static str {
    match format {
        "audio/midi" | "audio/x-midi" => "mid",
        f if f.contains("musicxml") => "musicxml",
        _ => "bin",
    }
}

fn run_separate(
    cfg: &Config,
    input: &Path,
    out_dir: &Path,
    immersive: &ImmersiveArgs,
) -> Result<()> {
    let buffer = load(input)?;
    let service = Arc::new(HttpStemService::new(&cfg.service)?);
    let separator = TrackSeparator::new(
        service.clone(),
        service.clone(),
        Some(service as Arc<dyn NotationGenerator>),
        cfg.separation.clone(),
    );

    log::info!("Separating via {}...", cfg.service.base_url);
    let set = separator.separate_tracks(&buffer)?;
    for failure in &set.failures {
        log::warn!("  {}: {}", failure.stage, failure.error);
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let pb = ProgressBar::new(set.tracks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tracks {msg}")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );
    for (name, track) in &set.tracks {
        pb.set_message(name.clone());
        let path: PathBuf = out_dir.join(format!("{}.wav", name));
        write_wav(&path, track).with_context(|| format!("Failed to write {}", path.display()))?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    for (name, notation) in &set.notation {
        let path = out_dir.join(format!("{}.{}", name, notation_extension(&notation.format)));
        std::fs::write(&path, &notation.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if let Some(opts) = immersive_options(immersive) {
        log::info!("Mixing {} tracks into {}...", set.tracks.len(), opts.format.format_type);
        let mix = set.immersive_mix(&opts.format)?;
        let path = out_dir.join("immersive_mix.wav");
        write_wav(&path, &mix.buffer)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if let Some(metadata) = &mix.metadata {
            write_metadata(&path, metadata)?;
        }
    }

    let status = if set.is_complete() { "complete" } else { "partial" };
    log::info!(
        "Done! {} tracks ({}) in {}",
        set.tracks.len(),
        status,
        out_dir.display()
    );
    Ok(())
}
