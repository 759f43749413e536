/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Text-to-speech client for a VOICEVOX-compatible engine.
//!
//! Synthesis is two HTTP calls:
//!
//! ```text
//! POST /audio_query?text=…&speaker=N                      → JSON query descriptor
//! POST /synthesis?speaker=N&enable_interrogative_upspeak  (body: descriptor) → WAV bytes
//! ```
//!
//! The descriptor is treated as opaque JSON and passed back unchanged.  Each
//! call carries its own timeout so a stalled engine cannot hang the
//! announcer.

pub mod error;

pub use error::{TtsError, TtsStage};

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::TtsSettings;

/// Anything that can turn announcement text into playable audio bytes.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str) -> impl Future<Output = Result<Vec<u8>, TtsError>> + Send;
}

/// HTTP client for a VOICEVOX engine.
#[derive(Debug, Clone)]
pub struct VoicevoxClient {
    http: reqwest::Client,
    base_url: String,
    speaker: u32,
    query_timeout: Duration,
    synthesis_timeout: Duration,
}

impl VoicevoxClient {
    pub fn new(settings: &TtsSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            speaker: settings.speaker,
            query_timeout: settings.query_timeout(),
            synthesis_timeout: settings.synthesis_timeout(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn speaker(&self) -> u32 {
        self.speaker
    }

    /// Step 1: ask the engine to build a query descriptor for `text`.
    pub async fn audio_query(&self, text: &str) -> Result<serde_json::Value, TtsError> {
        let response = self
            .http
            .post(format!("{}/audio_query", self.base_url))
            .query(&[("text", text)])
            .query(&[("speaker", self.speaker)])
            .timeout(self.query_timeout)
            .send()
            .await
            .map_err(TtsError::Query)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::Status {
                stage: TtsStage::AudioQuery,
                status,
            });
        }

        response.json().await.map_err(TtsError::Query)
    }

    /// Step 2: render a query descriptor into audio bytes.
    pub async fn synthesis(&self, query: &serde_json::Value) -> Result<Vec<u8>, TtsError> {
        let response = self
            .http
            .post(format!("{}/synthesis", self.base_url))
            .query(&[("speaker", self.speaker)])
            .query(&[("enable_interrogative_upspeak", true)])
            .json(query)
            .timeout(self.synthesis_timeout)
            .send()
            .await
            .map_err(TtsError::Synthesis)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::Status {
                stage: TtsStage::Synthesis,
                status,
            });
        }

        let audio = response.bytes().await.map_err(TtsError::Synthesis)?;
        if audio.is_empty() {
            return Err(TtsError::EmptyAudio);
        }
        Ok(audio.to_vec())
    }
}

impl SpeechSynthesizer for VoicevoxClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        debug!(speaker = self.speaker, chars = text.chars().count(), "requesting audio query");
        let query = self.audio_query(text).await?;
        let audio = self.synthesis(&query).await?;
        debug!(bytes = audio.len(), "synthesis complete");
        Ok(audio)
    }
}
