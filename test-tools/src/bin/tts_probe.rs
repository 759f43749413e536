// SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
// SPDX-License-Identifier: MIT

//! tts-probe – checks the VOICEVOX engine end to end.
//!
//! Synthesizes one phrase, writes the audio to a WAV file and optionally
//! plays it back with the same player the board uses.
//!
//! Usage:
//!   tts-probe --url http://localhost:50121 --speaker 10006 --play
//!   tts-probe --text "次のバスは8時30分発です" --output next.wav

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use shuttle_board::audio::{AudioPlayer, Player};
use shuttle_board::config::{PlayerSettings, TtsSettings};
use shuttle_board::tts::{SpeechSynthesizer, VoicevoxClient};

#[derive(Parser, Debug)]
#[command(name = "tts-probe", about = "Synthesize a test phrase through the VOICEVOX engine")]
struct Args {
    /// Base URL of the VOICEVOX engine.
    #[arg(long, default_value = "http://localhost:50121")]
    url: String,

    /// Speaker (voice) id.
    #[arg(long, default_value_t = 10006)]
    speaker: u32,

    /// Text to synthesize.
    #[arg(long, default_value = "これはテスト出力です")]
    text: String,

    /// Where to write the synthesized audio.
    #[arg(long, default_value = "test.wav")]
    output: PathBuf,

    /// Play the result after writing it.
    #[arg(long)]
    play: bool,

    /// External player command line, e.g. `--player paplay`.  Without it
    /// the clip plays on the default output device.
    #[arg(long, num_args = 1..)]
    player: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let args = Args::parse();

    let settings = TtsSettings {
        base_url: args.url.clone(),
        speaker: args.speaker,
        ..Default::default()
    };
    let client = VoicevoxClient::new(&settings);

    info!(url = %client.base_url(), speaker = client.speaker(), text = %args.text, "Synthesizing");
    let audio = client
        .synthesize(&args.text)
        .await
        .context("TTS engine did not produce audio")?;

    tokio::fs::write(&args.output, &audio)
        .await
        .with_context(|| format!("Cannot write {}", args.output.display()))?;
    info!(bytes = audio.len(), file = %args.output.display(), "Audio written");

    if args.play {
        play(args.player, &args.output).await?;
    }
    Ok(())
}

async fn play(command: Option<Vec<String>>, file: &Path) -> Result<()> {
    let player = Player::from_settings(&PlayerSettings { command })?;
    info!(player = %player.describe(), "Playing");
    player
        .play_file(file)
        .await
        .with_context(|| format!("Cannot play {}", file.display()))
}
