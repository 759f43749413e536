/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Announcement text for the voice engine and the board ticker.
//!
//! All text is Japanese; it is read aloud by the TTS engine verbatim.

use chrono::Timelike;

use crate::timetable::{DepartureRecord, Destination, StopPosition};

/// Spoken once when the last departure of the day has left.
pub const END_OF_SERVICE_ANNOUNCEMENT: &str = "本日のシャトルバスの運行は終了しました。";

/// Spoken in place of a platform number when the timetable has none.
pub const PLATFORM_UNDECIDED: &str = "未定";

const LIST_SEPARATOR: &str = "、";

/// Full announcement for `record`, or the end-of-service message when there
/// is no departure left.
pub fn compose(record: Option<&DepartureRecord>) -> String {
    let Some(record) = record else {
        return END_OF_SERVICE_ANNOUNCEMENT.to_string();
    };

    let platform = record.platform.as_deref().unwrap_or(PLATFORM_UNDECIDED);

    format!(
        "次に、仁愛大学から発車します、{time}発、無料シャトルバス、{destination}行きは、\
         {platform}番乗り場から、発車します。乗車位置で、1列に並んで、お待ちください。{stops}",
        time = spoken_time(record),
        destination = record.destination.name(),
        platform = platform,
        stops = stop_info(record),
    )
}

/// Departure time as read aloud: hours and minutes without zero padding,
/// e.g. `8時30分`.
pub fn spoken_time(record: &DepartureRecord) -> String {
    format!("{}時{}分", record.etd.hour(), record.etd.minute())
}

/// Stop information: which stops are served, the terminal, and a caution
/// naming stops the bus passes without stopping.
pub fn stop_info(record: &DepartureRecord) -> String {
    let (stops, skips) = classify_stops(record);
    let terminal = terminal_sentence(record.destination);

    if stops.is_empty() {
        return format!("{}です。", terminal);
    }

    let mut text = format!(
        "停車駅は、{}{}{}です。",
        stops.join(LIST_SEPARATOR),
        LIST_SEPARATOR,
        terminal
    );
    if !skips.is_empty() {
        text.push('\u{3000}');
        text.push_str(&skips.join(LIST_SEPARATOR));
        text.push_str("には停車しません。ご注意ください。");
    }
    text
}

fn terminal_sentence(destination: Destination) -> String {
    format!("終点：{}", destination.name())
}

/// Split the route into served stops (physical order, doubled stops may
/// repeat) and skipped stop names (deduplicated, never also served).
fn classify_stops(record: &DepartureRecord) -> (Vec<&'static str>, Vec<&'static str>) {
    let mut stops = Vec::new();
    let mut skips = Vec::new();

    for position in StopPosition::ALL {
        if record.stops.serves(position) {
            stops.push(position.station_name());
        } else {
            skips.push(position.station_name());
        }
    }
    if record.stops.bypasses_jindai() {
        skips.push(Destination::JinaiUniversity.name());
    }

    let mut unique_skips: Vec<&'static str> = Vec::with_capacity(skips.len());
    for name in skips {
        if !stops.contains(&name) && !unique_skips.contains(&name) {
            unique_skips.push(name);
        }
    }

    (stops, unique_skips)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
