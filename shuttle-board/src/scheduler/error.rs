/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Error type for a single announcement attempt.
//!
//! [`AnnounceError`] wraps the two collaborator failures that can cut an
//! announcement short.  It never leaves the scheduler: the cycle logs it,
//! reports a [`CycleOutcome`](super::CycleOutcome) and carries on.
//!
//! A failed chime is deliberately absent here; it degrades to a pause and
//! the announcement continues.

use thiserror::Error;

use crate::audio::PlaybackError;
use crate::tts::TtsError;

#[derive(Debug, Error)]
pub enum AnnounceError {
    /// The TTS engine could not produce audio; nothing was played.
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] TtsError),

    /// Audio was synthesized but the voice could not be played.
    #[error("voice playback failed: {0}")]
    Playback(#[from] PlaybackError),
}
