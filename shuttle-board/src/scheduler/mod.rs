//! Background announcement scheduler.
//!
//! [`Announcer`] runs as its own task.  Each cycle it takes a copy of the
//! current announcement target from [`SharedSelection`], speaks it, and then
//! sleeps for the configured interval.  It never calls into the render loop;
//! the shared selection is its only input.
//!
//! # State machine
//!
//! ```text
//!   ANNOUNCING ──── no target: speak end message once ───► ENDED
//!   (speak target       ▲                                  (idle while
//!    every cycle)       └──────── target appears ────────   no target)
//! ```
//!
//! A cycle is: compose → synthesize → chime → voice → sleep.  Synthesis
//! failure skips the chime and voice; chime failure is replaced by a
//! one-second pause.  Nothing is retried inside a cycle.

pub mod error;

pub use error::AnnounceError;

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::announcement::{self, END_OF_SERVICE_ANNOUNCEMENT};
use crate::audio::AudioPlayer;
use crate::config::AnnouncerSettings;
use crate::selection::SharedSelection;
use crate::tts::SpeechSynthesizer;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Silence substituted for a chime that could not be played.
pub const CHIME_FALLBACK_PAUSE: Duration = Duration::from_secs(1);

/// Characters of announcement text included in log lines.
const LOG_PREVIEW_CHARS: usize = 30;

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncerState {
    /// There is a departure to announce.
    Announcing,
    /// Service has ended for the day.
    Ended,
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The departure at `etd` was announced.
    Announced { etd: NaiveTime },
    /// The end-of-service message was spoken.
    EndOfService,
    /// Service already ended and the message was already spoken.
    Idle,
    /// The TTS engine failed; nothing was played this cycle.
    SynthesisFailed,
    /// Audio was synthesized but could not be played.
    PlaybackFailed,
}

// ── Announcer ─────────────────────────────────────────────────────────────────

pub struct Announcer<S, P> {
    selection: SharedSelection,
    synthesizer: S,
    player: P,
    chime: Option<PathBuf>,
    interval: Duration,
    state: AnnouncerState,
    end_message_played: bool,
}

impl<S, P> Announcer<S, P>
where
    S: SpeechSynthesizer,
    P: AudioPlayer,
{
    /// Create an announcer reading targets from `selection`.
    pub fn new(
        selection: SharedSelection,
        synthesizer: S,
        player: P,
        settings: &AnnouncerSettings,
    ) -> Self {
        Self {
            selection,
            synthesizer,
            player,
            chime: settings.chime.clone(),
            interval: settings.interval(),
            state: AnnouncerState::Announcing,
            end_message_played: false,
        }
    }

    pub fn state(&self) -> AnnouncerState {
        self.state
    }

    pub fn end_message_played(&self) -> bool {
        self.end_message_played
    }

    /// Run cycles until `shutdown` turns `true` or its sender is dropped.
    ///
    /// Shutdown is observed between cycles: a cycle already speaking is
    /// finished first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            chime = ?self.chime,
            "Announcement scheduler started"
        );

        while !*shutdown.borrow() {
            let outcome = self.run_cycle().await;
            debug!(?outcome, state = ?self.state, "announcement cycle finished");

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    // sender dropped
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Announcement scheduler stopped");
    }

    /// Execute exactly one cycle, without the trailing sleep.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        // Copy taken under the lock; the lock is released before any I/O.
        let target = self.selection.announced();

        match target {
            Some(record) => {
                self.state = AnnouncerState::Announcing;
                let etd = record.etd;
                info!(etd = %record.etd_label(), "Announcing next departure");

                let text = announcement::compose(Some(&record));
                let outcome = match self.announce(&text).await {
                    Ok(()) => CycleOutcome::Announced { etd },
                    Err(e) => Self::report(e),
                };
                self.end_message_played = false;
                outcome
            }
            None if !self.end_message_played => {
                self.state = AnnouncerState::Ended;
                info!("No departures left, announcing end of service");

                let outcome = match self.announce(END_OF_SERVICE_ANNOUNCEMENT).await {
                    Ok(()) => CycleOutcome::EndOfService,
                    Err(e) => Self::report(e),
                };
                self.end_message_played = true;
                outcome
            }
            None => {
                self.state = AnnouncerState::Ended;
                CycleOutcome::Idle
            }
        }
    }

    /// Synthesize `text`, then play the chime and the voice.
    async fn announce(&self, text: &str) -> Result<(), AnnounceError> {
        let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        debug!(text = %preview, "synthesizing announcement");

        let audio = self.synthesizer.synthesize(text).await?;

        self.play_chime().await;
        self.player.play_bytes(&audio).await?;

        info!(bytes = audio.len(), "Announcement played");
        Ok(())
    }

    async fn play_chime(&self) {
        let Some(chime) = &self.chime else {
            return;
        };
        if let Err(e) = self.player.play_file(chime).await {
            warn!(chime = %chime.display(), "Chime not played, pausing instead: {}", e);
            tokio::time::sleep(CHIME_FALLBACK_PAUSE).await;
        }
    }

    fn report(error: AnnounceError) -> CycleOutcome {
        match &error {
            AnnounceError::Synthesis(e) => {
                warn!(stage = %e.stage(), timeout = e.is_timeout(), "Announcement skipped: {}", error);
                CycleOutcome::SynthesisFailed
            }
            AnnounceError::Playback(_) => {
                warn!("Announcement not heard: {}", error);
                CycleOutcome::PlaybackFailed
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PlaybackError;
    use crate::timetable::{DepartureRecord, Destination, Timetable};
    use crate::tts::{TtsError, TtsStage};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    // ── Test doubles ──────────────────────────────────────────────────────────

    /// Records every text it is asked to speak.
    #[derive(Clone, Default)]
    struct FakeSynth {
        texts: Arc<Mutex<Vec<String>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl FakeSynth {
        fn spoken(&self) -> Vec<String> {
            self.texts.lock().unwrap().clone()
        }

        fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }
    }

    impl SpeechSynthesizer for FakeSynth {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
            self.texts.lock().unwrap().push(text.to_string());
            if *self.fail.lock().unwrap() {
                return Err(TtsError::Status {
                    stage: TtsStage::Synthesis,
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                });
            }
            Ok(format!("wav:{text}").into_bytes())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Played {
        File(PathBuf),
        Bytes(usize),
    }

    #[derive(Clone, Default)]
    struct FakePlayer {
        played: Arc<Mutex<Vec<Played>>>,
        fail_files: bool,
        fail_bytes: bool,
    }

    impl FakePlayer {
        fn played(&self) -> Vec<Played> {
            self.played.lock().unwrap().clone()
        }
    }

    impl AudioPlayer for FakePlayer {
        async fn play_bytes(&self, audio: &[u8]) -> Result<(), PlaybackError> {
            if self.fail_bytes {
                return Err(PlaybackError::Empty);
            }
            self.played.lock().unwrap().push(Played::Bytes(audio.len()));
            Ok(())
        }

        async fn play_file(&self, path: &Path) -> Result<(), PlaybackError> {
            if self.fail_files {
                return Err(PlaybackError::MissingFile(path.to_path_buf()));
            }
            self.played.lock().unwrap().push(Played::File(path.to_path_buf()));
            Ok(())
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn timetable() -> Timetable {
        Timetable::from_records(vec![
            DepartureRecord::new(hm(8, 0), Destination::TakefuStation),
            DepartureRecord::new(hm(8, 30), Destination::TakefuStation),
            DepartureRecord::new(hm(9, 0), Destination::JinaiUniversity),
        ])
    }

    fn settings(chime: Option<&str>) -> AnnouncerSettings {
        AnnouncerSettings {
            enabled: true,
            interval_secs: 60,
            chime: chime.map(PathBuf::from),
        }
    }

    fn announcer(
        selection: &SharedSelection,
        synth: &FakeSynth,
        player: &FakePlayer,
    ) -> Announcer<FakeSynth, FakePlayer> {
        Announcer::new(
            selection.clone(),
            synth.clone(),
            player.clone(),
            &settings(Some("chime.wav")),
        )
    }

    // ── ANNOUNCING ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn announces_next_departure_after_chime() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(8, 15));

        let synth = FakeSynth::default();
        let player = FakePlayer::default();
        let mut a = announcer(&selection, &synth, &player);

        assert_eq!(a.run_cycle().await, CycleOutcome::Announced { etd: hm(8, 30) });
        assert_eq!(a.state(), AnnouncerState::Announcing);

        let spoken = synth.spoken();
        assert_eq!(spoken.len(), 1);
        assert!(spoken[0].contains("8時30分"));

        let played = player.played();
        assert_eq!(played.len(), 2);
        assert_eq!(played[0], Played::File(PathBuf::from("chime.wav")));
        assert!(matches!(played[1], Played::Bytes(n) if n > 0));
    }

    #[tokio::test]
    async fn same_target_is_announced_every_cycle() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(8, 15));

        let synth = FakeSynth::default();
        let player = FakePlayer::default();
        let mut a = announcer(&selection, &synth, &player);

        for _ in 0..3 {
            assert_eq!(a.run_cycle().await, CycleOutcome::Announced { etd: hm(8, 30) });
        }
        assert_eq!(synth.spoken().len(), 3);
    }

    #[tokio::test]
    async fn synthesis_failure_skips_cycle_and_keeps_state() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(8, 15));

        let synth = FakeSynth::default();
        synth.set_failing(true);
        let player = FakePlayer::default();
        let mut a = announcer(&selection, &synth, &player);

        assert_eq!(a.run_cycle().await, CycleOutcome::SynthesisFailed);
        assert_eq!(a.state(), AnnouncerState::Announcing);
        assert!(player.played().is_empty(), "no chime or voice without audio");
        assert_eq!(selection.announced().map(|r| r.etd), Some(hm(8, 30)));

        // next cycle is the retry
        synth.set_failing(false);
        assert_eq!(a.run_cycle().await, CycleOutcome::Announced { etd: hm(8, 30) });
    }

    #[tokio::test]
    async fn chime_failure_degrades_to_pause() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(8, 15));

        let synth = FakeSynth::default();
        let player = FakePlayer {
            fail_files: true,
            ..Default::default()
        };
        let mut a = announcer(&selection, &synth, &player);

        let started = std::time::Instant::now();
        assert_eq!(a.run_cycle().await, CycleOutcome::Announced { etd: hm(8, 30) });
        assert!(started.elapsed() >= CHIME_FALLBACK_PAUSE);
        assert_eq!(player.played().len(), 1, "voice still played");
    }

    #[tokio::test]
    async fn no_chime_configured_plays_voice_only() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(8, 15));

        let synth = FakeSynth::default();
        let player = FakePlayer::default();
        let mut a = Announcer::new(selection.clone(), synth.clone(), player.clone(), &settings(None));

        a.run_cycle().await;
        assert_eq!(player.played().len(), 1);
        assert!(matches!(player.played()[0], Played::Bytes(_)));
    }

    #[tokio::test]
    async fn playback_failure_is_reported_without_state_change() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(8, 15));

        let synth = FakeSynth::default();
        let player = FakePlayer {
            fail_bytes: true,
            ..Default::default()
        };
        let mut a = announcer(&selection, &synth, &player);

        assert_eq!(a.run_cycle().await, CycleOutcome::PlaybackFailed);
        assert_eq!(a.state(), AnnouncerState::Announcing);
        assert!(!a.end_message_played());
    }

    // ── ENDED ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn end_of_service_is_spoken_exactly_once() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(23, 0));
        assert!(selection.displayed().is_empty());

        let synth = FakeSynth::default();
        let player = FakePlayer::default();
        let mut a = announcer(&selection, &synth, &player);

        assert_eq!(a.run_cycle().await, CycleOutcome::EndOfService);
        assert_eq!(a.state(), AnnouncerState::Ended);
        assert!(a.end_message_played());

        for _ in 0..5 {
            assert_eq!(a.run_cycle().await, CycleOutcome::Idle);
        }
        assert_eq!(synth.spoken(), vec![END_OF_SERVICE_ANNOUNCEMENT.to_string()]);
    }

    #[tokio::test]
    async fn new_target_after_end_rearms_end_message() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(23, 0));

        let synth = FakeSynth::default();
        let player = FakePlayer::default();
        let mut a = announcer(&selection, &synth, &player);

        assert_eq!(a.run_cycle().await, CycleOutcome::EndOfService);

        // e.g. the board was left running past midnight
        selection.select(&tt, hm(7, 0));
        assert_eq!(a.run_cycle().await, CycleOutcome::Announced { etd: hm(8, 0) });
        assert!(!a.end_message_played());

        selection.select(&tt, hm(23, 30));
        assert_eq!(a.run_cycle().await, CycleOutcome::EndOfService);
    }

    // ── run loop ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let tt = timetable();
        let selection = SharedSelection::new();
        selection.select(&tt, hm(8, 15));

        let synth = FakeSynth::default();
        let player = FakePlayer::default();
        let a = Announcer::new(
            selection.clone(),
            synth.clone(),
            player.clone(),
            &AnnouncerSettings {
                enabled: true,
                interval_secs: 3_600,
                chime: None,
            },
        );

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(a.run(rx));

        // first cycle runs immediately, then the task sleeps for an hour
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("announcer should stop promptly")
            .unwrap();
        assert_eq!(synth.spoken().len(), 1);
    }

    #[tokio::test]
    async fn run_does_not_start_when_already_shut_down() {
        let selection = SharedSelection::new();
        let synth = FakeSynth::default();
        let a = Announcer::new(
            selection,
            synth.clone(),
            FakePlayer::default(),
            &settings(None),
        );

        let (_tx, rx) = watch::channel(true);
        a.run(rx).await;
        assert!(synth.spoken().is_empty());
    }
}
