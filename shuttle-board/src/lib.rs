/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Shuttle board – departure display with voice announcements
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/        – YAML board configuration
//! ├── timetable/     – CSV timetable loading
//! ├── selection/     – next-departure selection, shared state
//! ├── announcement/  – announcement and stop-information text
//! ├── tts/           – VOICEVOX text-to-speech client
//! ├── audio/         – audio playback (output device or external player)
//! ├── scheduler/     – background announcement loop
//! └── board/         – terminal view and render loop
//! ```

pub mod announcement;
pub mod audio;
pub mod board;
pub mod config;
pub mod scheduler;
pub mod selection;
pub mod timetable;
pub mod tts;
