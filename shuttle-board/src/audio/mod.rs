/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Audio playback.
//!
//! [`DevicePlayer`] decodes WAV audio and plays it on the default output
//! device with `rodio`.  [`CommandPlayer`] hands the audio to an external
//! program instead.  Both resolve only after the clip has finished, so the
//! announcer hears the chime out before the voice starts.

use std::fs::File;
use std::future::Future;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use rodio::decoder::DecoderError;
use rodio::{Decoder, OutputStream, PlayError, Sink, StreamError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::PlayerSettings;

/// Why a clip was not played.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no audio data to play")]
    Empty,

    #[error("audio file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("no audio player command configured")]
    NoCommand,

    #[error("failed to start audio player '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stream audio to the player: {0}")]
    Stream(std::io::Error),

    #[error("audio player exited with {0}")]
    Exit(ExitStatus),

    #[error("cannot decode audio: {0}")]
    Decode(#[from] DecoderError),

    #[error("no audio output device: {0}")]
    Device(#[from] StreamError),

    #[error("cannot open audio output: {0}")]
    Output(#[from] PlayError),

    #[error("playback task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Something that plays audio to completion.
pub trait AudioPlayer: Send + Sync {
    /// Play in-memory audio (WAV bytes from the TTS engine).
    fn play_bytes(&self, audio: &[u8]) -> impl Future<Output = Result<(), PlaybackError>> + Send;

    /// Play an audio file from disk (the chime).
    fn play_file(&self, path: &Path) -> impl Future<Output = Result<(), PlaybackError>> + Send;
}

// ── DevicePlayer ──────────────────────────────────────────────────────────────

/// Plays audio in-process on the default output device.
///
/// The output stream is opened per clip on a blocking thread and dropped
/// once the sink has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DevicePlayer;

fn decode<R>(source: R) -> Result<Decoder<R>, PlaybackError>
where
    R: Read + Seek + Send + Sync + 'static,
{
    Ok(Decoder::new(source)?)
}

fn play_to_end<R>(clip: Decoder<R>) -> Result<(), PlaybackError>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let (_stream, handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&handle)?;
    sink.append(clip);
    sink.sleep_until_end();
    Ok(())
}

impl AudioPlayer for DevicePlayer {
    async fn play_bytes(&self, audio: &[u8]) -> Result<(), PlaybackError> {
        if audio.is_empty() {
            return Err(PlaybackError::Empty);
        }
        debug!(bytes = audio.len(), "playing audio");

        let audio = audio.to_vec();
        tokio::task::spawn_blocking(move || play_to_end(decode(Cursor::new(audio))?)).await?
    }

    async fn play_file(&self, path: &Path) -> Result<(), PlaybackError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(PlaybackError::MissingFile(path.to_path_buf()));
        }
        debug!(file = %path.display(), "playing audio file");

        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let file = File::open(&path).map_err(PlaybackError::Stream)?;
            play_to_end(decode(BufReader::new(file))?)
        })
        .await?
    }
}

// ── CommandPlayer ─────────────────────────────────────────────────────────────

/// Plays audio by running an external program.
///
/// In-memory audio is piped on stdin with a trailing `-` argument; files are
/// passed by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new("aplay", ["-q"])
    }
}

impl CommandPlayer {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from a full command line (`["aplay", "-q"]`).
    ///
    /// # Errors
    /// [`PlaybackError::NoCommand`] when `command` is empty.
    pub fn from_command_line(command: &[String]) -> Result<Self, PlaybackError> {
        let (program, args) = command.split_first().ok_or(PlaybackError::NoCommand)?;
        Ok(Self::new(program.clone(), args.iter().cloned()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> PlaybackError {
        PlaybackError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

fn check_exit(status: ExitStatus) -> Result<(), PlaybackError> {
    if status.success() {
        Ok(())
    } else {
        Err(PlaybackError::Exit(status))
    }
}

impl AudioPlayer for CommandPlayer {
    async fn play_bytes(&self, audio: &[u8]) -> Result<(), PlaybackError> {
        if audio.is_empty() {
            return Err(PlaybackError::Empty);
        }
        debug!(program = %self.program, bytes = audio.len(), "playing audio");

        let mut child = self
            .command()
            .arg("-")
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(audio).await.map_err(PlaybackError::Stream)?;
            // closing stdin tells the player the clip is complete
            drop(stdin);
        }

        let status = child.wait().await.map_err(|e| self.spawn_error(e))?;
        check_exit(status)
    }

    async fn play_file(&self, path: &Path) -> Result<(), PlaybackError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(PlaybackError::MissingFile(path.to_path_buf()));
        }
        debug!(program = %self.program, file = %path.display(), "playing audio file");

        let status = self
            .command()
            .arg(path)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;
        check_exit(status)
    }
}

// ── Player ────────────────────────────────────────────────────────────────────

/// The player selected by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Player {
    Device(DevicePlayer),
    Command(CommandPlayer),
}

impl Default for Player {
    fn default() -> Self {
        Player::Device(DevicePlayer)
    }
}

impl Player {
    /// Device playback unless an external command is configured.
    ///
    /// # Errors
    /// [`PlaybackError::NoCommand`] when the configured command is empty.
    pub fn from_settings(settings: &PlayerSettings) -> Result<Self, PlaybackError> {
        match &settings.command {
            None => Ok(Player::Device(DevicePlayer)),
            Some(command) => Ok(Player::Command(CommandPlayer::from_command_line(command)?)),
        }
    }

    /// Short name for log lines.
    pub fn describe(&self) -> &str {
        match self {
            Player::Device(_) => "output device",
            Player::Command(cmd) => cmd.program(),
        }
    }
}

impl AudioPlayer for Player {
    async fn play_bytes(&self, audio: &[u8]) -> Result<(), PlaybackError> {
        match self {
            Player::Device(p) => p.play_bytes(audio).await,
            Player::Command(p) => p.play_bytes(audio).await,
        }
    }

    async fn play_file(&self, path: &Path) -> Result<(), PlaybackError> {
        match self {
            Player::Device(p) => p.play_file(path).await,
            Player::Command(p) => p.play_file(path).await,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
