use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use cadenza::engine::EngineConfig;
use cadenza::processing::ProcessingOptions;
use cadenza::separation::{SeparationConfig, ServiceConfig};
use cadenza::theory::{KeySignature, TimeSignature};

const FILE_NAME: &str = "cadenza.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub processing: ProcessingOptions,
    #[serde(default)]
    pub theory: TheoryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub separation: SeparationConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Deserialize)]
pub struct TheoryConfig {
    #[serde(default = "default_tuning")]
    pub tuning: f64,
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    #[serde(default)]
    pub keys: Vec<KeySignature>,
    #[serde(default)]
    pub time_signatures: Vec<TimeSignature>,
}

impl Default for TheoryConfig {
    fn default() -> Self {
        Self {
            tuning: default_tuning(),
            tempo: default_tempo(),
            keys: Vec::new(),
            time_signatures: Vec::new(),
        }
    }
}

fn default_tuning() -> f64 { cadenza::theory::tables::DEFAULT_TUNING }
fn default_tempo() -> f64 { 120.0 }

/// Explicit path, else `./cadenza.toml`, `~/.config/cadenza/config.toml`,
/// then the platform config dir.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("cadenza").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("cadenza").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config {}", path.display()))
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza::processing::EqPreset;
    use cadenza::theory::{PitchClass, Scale};

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.theory.tuning, 440.0);
        assert_eq!(cfg.theory.tempo, 120.0);
        assert!(cfg.engine.accelerated);
        assert_eq!(cfg.processing, ProcessingOptions::default());
        assert_eq!(cfg.service.timeout_secs, 120);
    }

    #[test]
    fn reads_every_section() {
        let cfg = parse_config(
            r#"
            [processing]
            normalize = true
            eq_preset = "bass"

            [processing.immersive]
            enabled = true
            format = { type = "binaural" }

            [theory]
            tuning = 432.0
            tempo = 96.0

            [[theory.keys]]
            root_note = "C"

            [[theory.keys]]
            root_note = "G"
            scale = "minor"
            start_time = 30.0

            [[theory.time_signatures]]
            numerator = 3
            denominator = 4

            [engine]
            accelerated = false

            [separation]
            harmony_voices = 2
            generate_notation = true

            [service]
            base_url = "http://stems.local:8000"
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert!(cfg.processing.normalize);
        assert_eq!(cfg.processing.eq_preset, EqPreset::Bass);
        assert!(cfg.processing.immersive.unwrap().enabled);
        assert_eq!(cfg.theory.tuning, 432.0);
        assert_eq!(cfg.theory.keys.len(), 2);
        assert_eq!(cfg.theory.keys[1].root_note, PitchClass::G);
        assert_eq!(cfg.theory.keys[1].scale, Scale::Minor);
        assert_eq!(cfg.theory.time_signatures[0].numerator, 3);
        assert!(!cfg.engine.accelerated);
        assert_eq!(cfg.separation.harmony_voices, 2);
        assert_eq!(cfg.service.timeout_secs, 30);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_config("[theory]\ntuning = \"high\"").is_err());
        assert!(load_config(Path::new("/nonexistent/cadenza.toml")).is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let p = PathBuf::from("/tmp/elsewhere.toml");
        assert_eq!(find_config(Some(&p)), Some(p));
    }
}
