/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Next-departure selection and the state shared with the announcer.
//!
//! ```text
//! render loop ──select()──►  SharedSelection  ──announced()──►  Announcer
//!      ▲                    (Mutex<SelectionState>)
//!      └──────displayed()─────────┘
//! ```
//!
//! # Locking contract
//! Every accessor on [`SharedSelection`] copies or replaces the state while
//! holding the lock and releases it before returning.  No guard ever escapes
//! this module, so the lock can never be held across an HTTP call, audio
//! playback or an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveTime;
use tracing::{debug, info};

use crate::timetable::{DepartureRecord, Timetable};

/// Number of departures shown on the board.
pub const DISPLAYED_DEPARTURES: usize = 2;

/// The first [`DISPLAYED_DEPARTURES`] departures at or after `now`.
///
/// Plain time-of-day comparison: departures after midnight are not wrapped
/// into the next day.
pub fn next_departures(timetable: &Timetable, now: NaiveTime) -> Vec<DepartureRecord> {
    timetable
        .records()
        .iter()
        .filter(|r| r.etd >= now)
        .take(DISPLAYED_DEPARTURES)
        .cloned()
        .collect()
}

// ── SelectionState ────────────────────────────────────────────────────────────

/// Departures currently on the board and the current announcement target.
///
/// `announced` is `None` exactly when `displayed` is empty.  Otherwise it is
/// the record that was `displayed[0]` when the head departure time last
/// changed; it is not replaced on every poll, so a running announcement
/// cycle keeps its target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub displayed: Vec<DepartureRecord>,
    pub announced: Option<DepartureRecord>,
}

impl SelectionState {
    /// Install a freshly selected `displayed` list.
    ///
    /// Returns `true` when the announcement target changed.  Only departure
    /// times are compared, so two records with the same `etd` count as the
    /// same target.
    pub fn apply(&mut self, displayed: Vec<DepartureRecord>) -> bool {
        let changed = match (displayed.first(), &self.announced) {
            (Some(next), Some(current)) => next.etd != current.etd,
            (Some(_), None) | (None, Some(_)) => true,
            (None, None) => false,
        };

        if changed {
            self.announced = displayed.first().cloned();
        }
        self.displayed = displayed;
        changed
    }
}

// ── SharedSelection ───────────────────────────────────────────────────────────

/// Cloneable handle to the [`SelectionState`] shared by the render loop and
/// the announcer.
#[derive(Debug, Clone, Default)]
pub struct SharedSelection {
    inner: Arc<Mutex<SelectionState>>,
}

impl SharedSelection {
    /// Creates an empty selection: nothing displayed, nothing announced.
    pub fn new() -> Self {
        Self::default()
    }

    /// The state is plain data and every writer replaces it wholesale, so a
    /// poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, SelectionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-evaluate the next departures for `now` and publish them.
    ///
    /// Returns the new `displayed` list and whether the announcement target
    /// changed.  Filtering happens before the lock is taken; logging happens
    /// after it is released.
    pub fn select(&self, timetable: &Timetable, now: NaiveTime) -> (Vec<DepartureRecord>, bool) {
        let displayed = next_departures(timetable, now);

        let (changed, target) = {
            let mut state = self.lock();
            let changed = state.apply(displayed.clone());
            (changed, state.announced.as_ref().map(|r| r.etd_label()))
        };

        debug!(now = %now.format("%H:%M:%S"), shown = displayed.len(), "departures re-evaluated");
        if changed {
            match target {
                Some(etd) => info!(etd = %etd, "Announcement target changed"),
                None => info!("No more departures today"),
            }
        }

        (displayed, changed)
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> SelectionState {
        self.lock().clone()
    }

    /// Copy of the departures currently on the board.
    pub fn displayed(&self) -> Vec<DepartureRecord> {
        self.lock().displayed.clone()
    }

    /// Copy of the current announcement target.
    pub fn announced(&self) -> Option<DepartureRecord> {
        self.lock().announced.clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
