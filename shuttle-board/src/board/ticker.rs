/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Horizontal marquee for the stop-information line.
//!
//! Positions are measured in characters.  The text enters from the right
//! edge of the window, scrolls left, and once its last character has left
//! the window and `wait` further blank cells have passed, it re-enters from
//! the right edge.

/// Scrolling text window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    text: Option<Vec<char>>,
    width: usize,
    speed: usize,
    wait: usize,
    /// Window column of the first text character; negative once it has
    /// scrolled past the left edge.
    position: isize,
}

impl Ticker {
    pub fn new(width: usize, speed: usize, wait: usize) -> Self {
        Self {
            text: None,
            width,
            speed: speed.max(1),
            wait,
            position: width as isize,
        }
    }

    /// Scroll `text`.  The same text keeps its position; a different one
    /// replaces the current text and enters from the right edge.
    pub fn ensure_text(&mut self, text: &str) {
        let unchanged = self
            .text
            .as_ref()
            .is_some_and(|current| current.iter().copied().eq(text.chars()));
        if !unchanged {
            self.text = Some(text.chars().collect());
            self.position = self.width as isize;
        }
    }

    /// Drop the current text and move back to the right edge.
    pub fn reset(&mut self) {
        self.text = None;
        self.position = self.width as isize;
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    /// The text being scrolled, empty when none is loaded.
    pub fn text(&self) -> String {
        self.text.as_deref().unwrap_or(&[]).iter().collect()
    }

    pub fn position(&self) -> isize {
        self.position
    }

    /// Scroll one frame to the left, wrapping around after the wait gap.
    pub fn advance(&mut self) {
        let len = self.text.as_ref().map_or(0, Vec::len) as isize;
        self.position -= self.speed as isize;
        if self.position < -len - self.wait as isize {
            self.position = self.width as isize;
        }
    }

    /// The visible window, padded with spaces to `width` characters.
    pub fn visible(&self) -> String {
        let text = self.text.as_deref().unwrap_or(&[]);
        (0..self.width as isize)
            .map(|col| {
                let idx = col - self.position;
                if idx >= 0 {
                    text.get(idx as usize).copied().unwrap_or(' ')
                } else {
                    ' '
                }
            })
            .collect()
    }
}
