//! Blocking HTTP adapter for a remote separation service. Audio travels as
//! 32-bit float WAV in both directions.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::capability::{
    HarmonyExtractor, Notation, NotationGenerator, Stem, StemSeparator, VocalLayers,
};
use crate::audio::buffer::SampleBuffer;
use crate::audio::decode::decode_bytes;
use crate::audio::encode::encode_wav;
use crate::error::{Error, Result};

const WAV_MIME: &str = "audio/wav";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8750".to_string(),
            timeout_secs: 120,
        }
    }
}

pub struct HttpStemService {
    client: Client,
    base_url: Url,
}

impl HttpStemService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| {
                Error::invalid(format!("invalid service URL '{}': {}", config.base_url, e))
            })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::invalid(format!("'{}' cannot be a base URL", config.base_url)));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("cadenza/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn post(&self, segments: &[&str], buffer: &SampleBuffer) -> Result<Response> {
        let url = self.endpoint(segments);
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, WAV_MIME)
            .body(encode_wav(buffer)?)
            .send()?;
        Ok(response)
    }

    fn post_for_audio(&self, segments: &[&str], buffer: &SampleBuffer) -> Result<SampleBuffer> {
        let response = self.post(segments, buffer)?.error_for_status()?;
        decode_response(response)
    }
}

fn decode_response(response: Response) -> Result<SampleBuffer> {
    let bytes = response.bytes()?;
    decode_bytes(bytes.to_vec())
}

impl StemSeparator for HttpStemService {
    fn separate(&self, buffer: &SampleBuffer, stem: Stem) -> Result<SampleBuffer> {
        self.post_for_audio(&["stems", stem.as_str()], buffer)
    }

    fn separate_instruments(&self, buffer: &SampleBuffer) -> Result<Vec<(String, SampleBuffer)>> {
        let names: Vec<String> = self.post(&["instruments"], buffer)?.error_for_status()?.json()?;
        log::info!("Service detected {} instruments", names.len());
        names
            .into_iter()
            .map(|name| {
                let track = self.post_for_audio(&["instruments", &name], buffer)?;
                Ok((name, track))
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "http_stems"
    }
}

impl HarmonyExtractor for HttpStemService {
    fn extract(&self, vocals: &SampleBuffer, max_voices: usize) -> Result<VocalLayers> {
        let lead = self.post_for_audio(&["vocals", "lead"], vocals)?;
        let mut harmonies = Vec::new();
        for n in 1..=max_voices {
            let index = n.to_string();
            let response = self.post(&["vocals", "harmony", &index], vocals)?;
            if response.status() == StatusCode::NOT_FOUND {
                break;
            }
            harmonies.push(decode_response(response.error_for_status()?)?);
        }
        Ok(VocalLayers { lead, harmonies })
    }

    fn name(&self) -> &'static str {
        "http_harmony"
    }
}

impl NotationGenerator for HttpStemService {
    fn transcribe(&self, buffer: &SampleBuffer, instrument: &str) -> Result<Notation> {
        let response = self.post(&["notation", instrument], buffer)?.error_for_status()?;
        let format = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes()?.to_vec();
        Ok(Notation { format, bytes })
    }

    fn name(&self) -> &'static str {
        "http_notation"
    }
}
