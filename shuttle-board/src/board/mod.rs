/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Departure board: view model, terminal rendering and the render loop.
//!
//! The render loop is the only writer of the shared selection.  It
//! re-evaluates the next departures every poll interval and redraws every
//! frame; it never waits on the announcer.

pub mod ticker;

pub use ticker::Ticker;

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::NaiveTime;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::announcement;
use crate::config::DisplaySettings;
use crate::selection::{SharedSelection, DISPLAYED_DEPARTURES};
use crate::timetable::{DepartureRecord, Timetable};

/// Shown in every column of an empty slot.
pub const NO_DEPARTURE: &str = "---";

/// Stop line of the first slot once service has ended.
pub const SERVICE_ENDED_NOTICE: &str = "本日のバスは終了しました";

const TITLE: &str = "シャトルバス発車案内（武生駅・越前たけふ駅・国高・帆山町）";
const SLOT_LABELS: [&str; DISPLAYED_DEPARTURES] = ["先発", "次発"];

// ── View model ────────────────────────────────────────────────────────────────

/// One row of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub label: &'static str,
    pub departure: String,
    pub destination: String,
    pub car: String,
    pub platform: String,
    /// Text fed to the ticker; empty for a blank line.
    pub stop_info: String,
    /// `false` for a placeholder slot (drawn dimmed).
    pub active: bool,
}

impl SlotView {
    fn from_record(label: &'static str, record: &DepartureRecord) -> Self {
        Self {
            label,
            departure: record.etd_label(),
            destination: record.destination.name().to_string(),
            car: record.car.clone().unwrap_or_else(|| NO_DEPARTURE.to_string()),
            platform: record.platform.clone().unwrap_or_else(|| NO_DEPARTURE.to_string()),
            stop_info: announcement::stop_info(record),
            active: true,
        }
    }

    fn placeholder(label: &'static str, stop_info: &str) -> Self {
        Self {
            label,
            departure: NO_DEPARTURE.to_string(),
            destination: NO_DEPARTURE.to_string(),
            car: NO_DEPARTURE.to_string(),
            platform: NO_DEPARTURE.to_string(),
            stop_info: stop_info.to_string(),
            active: false,
        }
    }
}

/// Both rows of the board for one set of displayed departures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub slots: [SlotView; DISPLAYED_DEPARTURES],
}

impl BoardView {
    pub fn from_rows(displayed: &[DepartureRecord]) -> Self {
        let first = match displayed.first() {
            Some(r) => SlotView::from_record(SLOT_LABELS[0], r),
            None => SlotView::placeholder(SLOT_LABELS[0], SERVICE_ENDED_NOTICE),
        };
        let next = match displayed.get(1) {
            Some(r) => SlotView::from_record(SLOT_LABELS[1], r),
            None => SlotView::placeholder(SLOT_LABELS[1], ""),
        };
        Self {
            slots: [first, next],
        }
    }
}

// ── Board ─────────────────────────────────────────────────────────────────────

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Frame renderer.  Owns the two tickers and resets them whenever the number
/// of displayed departures changes.
#[derive(Debug)]
pub struct Board {
    tickers: [Ticker; DISPLAYED_DEPARTURES],
    last_row_count: usize,
}

impl Board {
    pub fn new(settings: &DisplaySettings) -> Self {
        let ticker = Ticker::new(
            settings.ticker_width,
            settings.ticker_speed,
            settings.ticker_wait,
        );
        Self {
            tickers: [ticker.clone(), ticker],
            last_row_count: 0,
        }
    }

    /// Render one frame as plain text (with ANSI dimming for empty slots)
    /// and advance the tickers.
    pub fn render(&mut self, displayed: &[DepartureRecord]) -> String {
        if displayed.len() != self.last_row_count {
            info!(
                from = self.last_row_count,
                to = displayed.len(),
                "Displayed row count changed"
            );
            for t in &mut self.tickers {
                t.reset();
            }
            self.last_row_count = displayed.len();
        }

        let view = BoardView::from_rows(displayed);
        let mut out = String::new();
        out.push_str(TITLE);
        out.push('\n');
        out.push_str("発車時刻  行き先        台数  乗り場\n");

        for (slot, ticker) in view.slots.iter().zip(self.tickers.iter_mut()) {
            let (on, off) = if slot.active { ("", "") } else { (DIM, RESET) };
            out.push_str(&format!(
                "\n[{}] {on}{:<8}{:<12}{:<6}{}{off}\n",
                slot.label, slot.departure, slot.destination, slot.car, slot.platform,
            ));

            let stop_line = if slot.active {
                ticker.ensure_text(&slot.stop_info);
                ticker.advance();
                ticker.visible()
            } else {
                slot.stop_info.clone()
            };
            out.push_str(&format!("  停車駅 {on}{}{off}\n", stop_line));
        }
        out
    }
}

// ── Render loop ───────────────────────────────────────────────────────────────

/// Decides on which frames the next departures are re-evaluated.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    last: Option<Instant>,
}

impl PollSchedule {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// `true` on the first call and then once `interval` has elapsed since
    /// the last poll that was due.
    pub fn is_due(&mut self, now: Instant) -> bool {
        let due = self
            .last
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }
}

/// Per-frame work of the render loop: poll the selector when due, then draw
/// from a copy of the displayed departures.
#[derive(Debug)]
pub struct DisplayLoop {
    timetable: Arc<Timetable>,
    selection: SharedSelection,
    board: Board,
    poll: PollSchedule,
}

impl DisplayLoop {
    pub fn new(
        timetable: Arc<Timetable>,
        selection: SharedSelection,
        settings: &DisplaySettings,
    ) -> Self {
        Self {
            timetable,
            selection,
            board: Board::new(settings),
            poll: PollSchedule::new(settings.poll_interval()),
        }
    }

    /// Produce one frame.  `now` drives the poll cadence and `time_of_day`
    /// is what the selector compares departures against.
    pub fn step(&mut self, now: Instant, time_of_day: NaiveTime) -> String {
        if self.poll.is_due(now) {
            self.selection.select(&self.timetable, time_of_day);
        }
        self.board.render(&self.selection.displayed())
    }
}

/// Redraw the board until the user asks to quit (Ctrl-C).
///
/// The selection is re-evaluated against local wall-clock time every
/// `poll_interval`.
///
/// # Errors
/// Returns an error if the Ctrl-C handler cannot be installed or stdout
/// cannot be written.
pub async fn run_display_loop(
    timetable: Arc<Timetable>,
    selection: SharedSelection,
    settings: &DisplaySettings,
) -> Result<()> {
    info!(
        poll_secs = settings.poll_interval().as_secs(),
        frame_ms = settings.frame_interval().as_millis() as u64,
        "Render loop started"
    );

    let quit = async {
        tokio::signal::ctrl_c()
            .await
            .context("Cannot listen for Ctrl-C")
    };
    drive(
        DisplayLoop::new(timetable, selection, settings),
        settings.frame_interval(),
        &mut std::io::stdout(),
        || chrono::Local::now().time(),
        quit,
    )
    .await
}

/// Draw a frame every `frame_interval` into `out` until `quit` resolves.
///
/// # Errors
/// Returns the error `quit` resolves with, or a write error on `out`.
pub async fn drive<W, C, Q>(
    mut display: DisplayLoop,
    frame_interval: Duration,
    out: &mut W,
    mut clock: C,
    quit: Q,
) -> Result<()>
where
    W: Write,
    C: FnMut() -> NaiveTime,
    Q: Future<Output = Result<()>>,
{
    let mut frames = tokio::time::interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(quit);

    loop {
        tokio::select! {
            res = &mut quit => {
                res?;
                info!("Quit requested");
                return Ok(());
            }
            _ = frames.tick() => {}
        }

        let frame = display.step(Instant::now(), clock());
        write!(out, "\x1b[2J\x1b[H{}", frame).context("Cannot draw board")?;
        out.flush().context("Cannot draw board")?;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
