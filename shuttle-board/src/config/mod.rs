//! Board configuration loading.
//!
//! Every field is optional; anything absent from the YAML file keeps its
//! default.  The expected YAML structure is:
//! ```yaml
//! timetable: timetable.csv
//! tts:
//!   base_url: "http://localhost:50121"
//!   speaker: 10006
//!   query_timeout_ms: 10000
//!   synthesis_timeout_ms: 30000
//! announcer:
//!   enabled: true
//!   interval_secs: 60
//!   chime: sounds/4point_chime.wav
//! display:
//!   poll_interval_secs: 10
//!   frame_interval_ms: 100
//!   ticker_width: 60
//!   ticker_speed: 1
//!   ticker_wait: 8
//! player:
//!   # omit to play on the default output device
//!   command: ["aplay", "-q"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

// ── Sections ──────────────────────────────────────────────────────────────────

/// Text-to-speech engine connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    pub base_url: String,
    /// VOICEVOX speaker (voice) id.
    pub speaker: u32,
    /// Timeout of the `audio_query` call.
    pub query_timeout_ms: u64,
    /// Timeout of the `synthesis` call; synthesis is the slow one.
    pub synthesis_timeout_ms: u64,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:50121"),
            speaker: 10006,
            query_timeout_ms: 10_000,
            synthesis_timeout_ms: 30_000,
        }
    }
}

impl TtsSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_millis(self.synthesis_timeout_ms)
    }
}

/// Background announcement scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnnouncerSettings {
    /// `false` runs the board silently.
    pub enabled: bool,
    /// Pause between two announcement cycles.
    pub interval_secs: u64,
    /// Chime played before every announcement.  `None` disables it.
    pub chime: Option<PathBuf>,
}

impl Default for AnnouncerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            chime: Some(PathBuf::from("sounds/4point_chime.wav")),
        }
    }
}

impl AnnouncerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Render loop and stop-information ticker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// How often the next departures are re-evaluated.
    pub poll_interval_secs: u64,
    /// Redraw cadence.
    pub frame_interval_ms: u64,
    /// Visible width of the ticker, in characters.
    pub ticker_width: usize,
    /// Characters the ticker moves per frame.
    pub ticker_speed: usize,
    /// Blank characters after the text has scrolled out before it restarts.
    pub ticker_wait: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            frame_interval_ms: 100,
            ticker_width: 60,
            ticker_speed: 1,
            ticker_wait: 8,
        }
    }
}

impl DisplaySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Audio output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// External player program followed by its arguments.  `None` plays on
    /// the default output device.
    pub command: Option<Vec<String>>,
}

// ── BoardConfig ───────────────────────────────────────────────────────────────

/// Complete board configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Timetable CSV file.
    pub timetable: PathBuf,
    pub tts: TtsSettings,
    pub announcer: AnnouncerSettings,
    pub display: DisplaySettings,
    pub player: PlayerSettings,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            timetable: PathBuf::from("timetable.csv"),
            tts: TtsSettings::default(),
            announcer: AnnouncerSettings::default(),
            display: DisplaySettings::default(),
            player: PlayerSettings::default(),
        }
    }
}

impl BoardConfig {
    /// Parses the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading board configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        debug!(?config, "Board configuration");
        Ok(config)
    }

    /// Parses configuration from a YAML string.  An empty document yields
    /// the defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
