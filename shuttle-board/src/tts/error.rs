/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Errors raised while talking to the text-to-speech engine.
//!
//! None of these are fatal: the announcer logs them and skips the current
//! cycle.  The next cycle is the retry.

use thiserror::Error;

/// The two HTTP calls that make up one synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsStage {
    /// `POST /audio_query` – text → query descriptor.
    AudioQuery,
    /// `POST /synthesis` – query descriptor → audio bytes.
    Synthesis,
}

impl std::fmt::Display for TtsStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TtsStage::AudioQuery => write!(f, "audio_query"),
            TtsStage::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Failure of one synthesis attempt.
#[derive(Debug, Error)]
pub enum TtsError {
    /// Transport error or timeout on the `audio_query` call, or its body was
    /// not JSON.
    #[error("audio_query request failed: {0}")]
    Query(reqwest::Error),

    /// Transport error or timeout on the `synthesis` call.
    #[error("synthesis request failed: {0}")]
    Synthesis(reqwest::Error),

    /// The engine answered with a non-success HTTP status.
    #[error("{stage} returned HTTP {status}")]
    Status {
        stage: TtsStage,
        status: reqwest::StatusCode,
    },

    /// The engine answered `synthesis` successfully but with an empty body.
    #[error("synthesis returned no audio data")]
    EmptyAudio,
}

impl TtsError {
    /// `true` when the request was abandoned because its timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            TtsError::Query(e) | TtsError::Synthesis(e) => e.is_timeout(),
            TtsError::Status { .. } | TtsError::EmptyAudio => false,
        }
    }

    /// Which of the two calls failed.
    pub fn stage(&self) -> TtsStage {
        match self {
            TtsError::Query(_) => TtsStage::AudioQuery,
            TtsError::Synthesis(_) | TtsError::EmptyAudio => TtsStage::Synthesis,
            TtsError::Status { stage, .. } => *stage,
        }
    }
}
