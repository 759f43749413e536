/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use shuttle_board::audio::Player;
use shuttle_board::board;
use shuttle_board::config::BoardConfig;
use shuttle_board::scheduler::Announcer;
use shuttle_board::selection::SharedSelection;
use shuttle_board::timetable::Timetable;
use shuttle_board::tts::VoicevoxClient;

/// How long to wait for the announcer to notice shutdown before exiting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ── CLI argument definition ───────────────────────────────────────────────────

/// Shuttle-bus departure board with voice announcements.
///
/// Example:
///   shuttle-board -c demos/board.yaml
///   shuttle-board -t demos/timetable.csv --tts-url http://localhost:50121
#[derive(Debug, Parser)]
#[command(
    name = "shuttle-board",
    about = "Shuttle-bus departure board with voice announcements",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML board configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Timetable CSV file (overrides the configuration file).
    #[arg(short = 't', long = "timetable")]
    timetable: Option<PathBuf>,

    /// Base URL of the VOICEVOX engine (overrides the configuration file).
    #[arg(long = "tts-url")]
    tts_url: Option<String>,

    /// VOICEVOX speaker id (overrides the configuration file).
    #[arg(long = "speaker")]
    speaker: Option<u32>,

    /// Run the board without voice announcements.
    #[arg(long = "no-voice", default_value_t = false)]
    no_voice: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut BoardConfig) {
        if let Some(path) = &self.timetable {
            config.timetable = path.clone();
        }
        if let Some(url) = &self.tts_url {
            config.tts.base_url = url.clone();
        }
        if let Some(speaker) = self.speaker {
            config.tts.speaker = speaker;
        }
        if self.no_voice {
            config.announcer.enabled = false;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    // Logs go to stderr; stdout belongs to the board.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Shuttle board starting up...");

    let cli = Cli::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => match BoardConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load board configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No configuration file provided, using default settings");
            BoardConfig::default()
        }
    };
    cli.apply_overrides(&mut config);

    info!(
        timetable = %config.timetable.display(),
        tts_url   = %config.tts.base_url,
        speaker   = config.tts.speaker,
        voice     = config.announcer.enabled,
        "Configuration"
    );

    // ── Timetable ─────────────────────────────────────────────────────────────
    let timetable = match Timetable::load_from_file(&config.timetable) {
        Ok(tt) => Arc::new(tt),
        Err(e) => {
            error!("Failed to load timetable: {:#}", e);
            process::exit(1);
        }
    };
    if timetable.is_empty() {
        warn!("Timetable has no valid departures");
    }

    let selection = SharedSelection::new();
    selection.select(&timetable, chrono::Local::now().time());

    // ── Announcer ─────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let announcer_task = if config.announcer.enabled {
        let player = match Player::from_settings(&config.player) {
            Ok(player) => player,
            Err(e) => {
                warn!("{}, playing on the output device instead", e);
                Player::default()
            }
        };
        info!(player = %player.describe(), "Audio output");
        let announcer = Announcer::new(
            selection.clone(),
            VoicevoxClient::new(&config.tts),
            player,
            &config.announcer,
        );
        Some(tokio::spawn(announcer.run(shutdown_rx)))
    } else {
        info!("Voice announcements disabled");
        None
    };

    // ── Render loop ───────────────────────────────────────────────────────────
    let result = board::run_display_loop(Arc::clone(&timetable), selection, &config.display).await;

    let _ = shutdown_tx.send(true);
    if let Some(task) = announcer_task {
        if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
            warn!("Announcer still speaking, abandoning it");
        }
    }

    if let Err(e) = result {
        error!("Board stopped: {:#}", e);
        process::exit(1);
    }
    info!("Shuttle board stopped");
}
