/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Static shuttle timetable.
//!
//! The timetable is a CSV file with a header row.  Columns are matched by
//! name, surrounding whitespace is ignored and rows may be shorter than the
//! header:
//!
//! ```text
//! ETD,   destination, platform, car, echizen_takefu, hoyama(1), kunitaka(1), takefu, kunitaka(2), hoyama(2), jindai
//! 08:00, 1,           2,        1,   1,              1,         1,           1,      0,           0,         0
//! 08:30, 0,           1,        2,   0,              0,         0,           0,      1,           1,         1
//! ```
//!
//! Only `ETD` is mandatory.  A row whose `ETD` is missing or not `HH:MM` is
//! dropped with a warning; failing to read the file at all is an error.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Format of the `ETD` column.
const ETD_FORMAT: &str = "%H:%M";

// ── Destination ───────────────────────────────────────────────────────────────

/// Terminal a departure runs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// 仁愛大学 – destination code `0`.
    JinaiUniversity,
    /// 武生駅 – any other destination code.
    TakefuStation,
}

impl Destination {
    /// Parse the `destination` column.  Only `"0"` selects Jin-ai University.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("0") => Destination::JinaiUniversity,
            _ => Destination::TakefuStation,
        }
    }

    /// Japanese terminal name used on the board and in announcements.
    pub fn name(self) -> &'static str {
        match self {
            Destination::JinaiUniversity => "仁愛大学",
            Destination::TakefuStation => "武生駅",
        }
    }
}

// ── Stops ─────────────────────────────────────────────────────────────────────

/// Named stop positions in physical order along the route.
///
/// Hoyama-cho and Kunitaka are passed twice, once on the outbound leg and
/// once on the return leg, so they occupy two positions each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPosition {
    EchizenTakefu,
    HoyamaOutbound,
    KunitakaOutbound,
    Takefu,
    KunitakaReturn,
    HoyamaReturn,
}

impl StopPosition {
    /// All positions, in route order.
    pub const ALL: [StopPosition; 6] = [
        StopPosition::EchizenTakefu,
        StopPosition::HoyamaOutbound,
        StopPosition::KunitakaOutbound,
        StopPosition::Takefu,
        StopPosition::KunitakaReturn,
        StopPosition::HoyamaReturn,
    ];

    /// Spoken stop name.  Both legs of a doubled stop share one name.
    pub fn station_name(self) -> &'static str {
        match self {
            StopPosition::EchizenTakefu => "越前たけふ駅",
            StopPosition::HoyamaOutbound | StopPosition::HoyamaReturn => "帆山町",
            StopPosition::KunitakaOutbound | StopPosition::KunitakaReturn => "国高",
            StopPosition::Takefu => "武生駅",
        }
    }

    /// Header of the CSV column carrying this position's flag.
    pub fn column(self) -> &'static str {
        match self {
            StopPosition::EchizenTakefu => "echizen_takefu",
            StopPosition::HoyamaOutbound => "hoyama(1)",
            StopPosition::KunitakaOutbound => "kunitaka(1)",
            StopPosition::Takefu => "takefu",
            StopPosition::KunitakaReturn => "kunitaka(2)",
            StopPosition::HoyamaReturn => "hoyama(2)",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Which stop positions a departure serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopFlags {
    served: [bool; 6],
    /// Set when the `jindai` column is explicitly `0`: the bus does not run
    /// through to Jin-ai University.
    bypasses_jindai: bool,
}

impl StopFlags {
    /// Every position served, terminating normally.
    pub fn all_served() -> Self {
        Self {
            served: [true; 6],
            bypasses_jindai: false,
        }
    }

    pub fn serves(&self, position: StopPosition) -> bool {
        self.served[position.index()]
    }

    pub fn set(&mut self, position: StopPosition, served: bool) {
        self.served[position.index()] = served;
    }

    pub fn bypasses_jindai(&self) -> bool {
        self.bypasses_jindai
    }

    pub fn set_bypasses_jindai(&mut self, bypasses: bool) {
        self.bypasses_jindai = bypasses;
    }
}

// ── DepartureRecord ───────────────────────────────────────────────────────────

/// One scheduled departure.  Immutable once the timetable is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartureRecord {
    /// Scheduled departure time of day.
    pub etd: NaiveTime,
    pub destination: Destination,
    pub stops: StopFlags,
    /// Boarding platform; `None` when the column is absent or empty.
    pub platform: Option<String>,
    /// Vehicle / car identifier; `None` when the column is absent or empty.
    pub car: Option<String>,
}

impl DepartureRecord {
    /// A departure at `etd` to `destination` serving every stop.
    pub fn new(etd: NaiveTime, destination: Destination) -> Self {
        Self {
            etd,
            destination,
            stops: StopFlags::all_served(),
            platform: None,
            car: None,
        }
    }

    /// `HH:MM` as shown on the board.
    pub fn etd_label(&self) -> String {
        self.etd.format(ETD_FORMAT).to_string()
    }
}

// ── CSV row ───────────────────────────────────────────────────────────────────

/// One CSV row as it appears in the file.  Empty cells decode as `None`.
#[derive(Debug, Default, Deserialize)]
struct TimetableRow {
    #[serde(rename = "ETD")]
    etd: Option<String>,
    destination: Option<String>,
    platform: Option<String>,
    car: Option<String>,
    echizen_takefu: Option<String>,
    #[serde(rename = "hoyama(1)")]
    hoyama_1: Option<String>,
    #[serde(rename = "kunitaka(1)")]
    kunitaka_1: Option<String>,
    takefu: Option<String>,
    #[serde(rename = "kunitaka(2)")]
    kunitaka_2: Option<String>,
    #[serde(rename = "hoyama(2)")]
    hoyama_2: Option<String>,
    jindai: Option<String>,
}

/// Why a row was dropped.
#[derive(Debug, PartialEq, Eq)]
enum RowRejection {
    MissingEtd,
    MalformedEtd(String),
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowRejection::MissingEtd => write!(f, "no ETD value"),
            RowRejection::MalformedEtd(raw) => {
                write!(f, "ETD '{}' is not a valid HH:MM time", raw)
            }
        }
    }
}

impl TimetableRow {
    fn into_record(self) -> std::result::Result<DepartureRecord, RowRejection> {
        let raw_etd = self.etd.ok_or(RowRejection::MissingEtd)?;
        let etd = NaiveTime::parse_from_str(&raw_etd, ETD_FORMAT)
            .map_err(|_| RowRejection::MalformedEtd(raw_etd.clone()))?;

        let flag = |cell: &Option<String>| cell.as_deref() == Some("1");

        let mut stops = StopFlags::default();
        stops.set(StopPosition::EchizenTakefu, flag(&self.echizen_takefu));
        stops.set(StopPosition::HoyamaOutbound, flag(&self.hoyama_1));
        stops.set(StopPosition::KunitakaOutbound, flag(&self.kunitaka_1));
        stops.set(StopPosition::Takefu, flag(&self.takefu));
        stops.set(StopPosition::KunitakaReturn, flag(&self.kunitaka_2));
        stops.set(StopPosition::HoyamaReturn, flag(&self.hoyama_2));
        stops.set_bypasses_jindai(self.jindai.as_deref() == Some("0"));

        Ok(DepartureRecord {
            etd,
            destination: Destination::from_code(self.destination.as_deref()),
            stops,
            platform: self.platform,
            car: self.car,
        })
    }
}

// ── Timetable ─────────────────────────────────────────────────────────────────

/// All departures of the day, ascending by departure time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timetable {
    records: Vec<DepartureRecord>,
}

impl Timetable {
    /// Build a timetable from arbitrary records, sorting them by `etd`.
    /// Records sharing a departure time keep their relative order.
    pub fn from_records(mut records: Vec<DepartureRecord>) -> Self {
        records.sort_by_key(|r| r.etd);
        Self { records }
    }

    /// Load the timetable CSV at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.  Individual
    /// malformed rows are not errors; they are logged and skipped.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading timetable from: {}", path.display());

        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open timetable file: {}", path.display()))?;

        let timetable = Self::from_reader(file)
            .with_context(|| format!("Failed to read timetable file: {}", path.display()))?;

        info!(
            departures = timetable.len(),
            first = ?timetable.records.first().map(|r| r.etd_label()),
            last = ?timetable.records.last().map(|r| r.etd_label()),
            "Timetable loaded"
        );
        Ok(timetable)
    }

    /// Parse CSV data from any reader.
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);

        let headers = reader.headers().context("Cannot read header row")?.clone();
        let mut record = csv::StringRecord::new();
        let mut records = Vec::new();
        let mut skipped = 0usize;

        while reader
            .read_record(&mut record)
            .context("Cannot read timetable row")?
        {
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let row: TimetableRow = match record.deserialize(Some(&headers)) {
                Ok(row) => row,
                Err(e) => {
                    warn!(line, "Skipping undecodable timetable row: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            match row.into_record() {
                Ok(departure) => {
                    debug!(line, etd = %departure.etd_label(), "  departure");
                    records.push(departure);
                }
                Err(reason) => {
                    warn!(line, row = ?record, "Skipping timetable row: {}", reason);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, "Some timetable rows were skipped");
        }

        Ok(Self::from_records(records))
    }

    /// Departures in ascending time order.
    pub fn records(&self) -> &[DepartureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn csv_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const HEADER: &str = "ETD, destination, platform, car, echizen_takefu, hoyama(1), kunitaka(1), takefu, kunitaka(2), hoyama(2), jindai\n";

    #[test]
    fn load_sorts_by_departure_time() {
        let data = format!(
            "{HEADER}\
             09:00, 1, 2, 1, 1, 1, 1, 1, 0, 0, 0\n\
             08:00, 0, 1, 2, 0, 0, 0, 0, 1, 1, 1\n\
             08:30, 1, 3, 1, 1, 0, 1, 1, 0, 0, 0\n"
        );
        let f = csv_tempfile(&data);
        let tt = Timetable::load_from_file(f.path()).unwrap();

        let times: Vec<_> = tt.records().iter().map(|r| r.etd).collect();
        assert_eq!(times, vec![hm(8, 0), hm(8, 30), hm(9, 0)]);
    }

    #[test]
    fn columns_are_decoded_by_header_name() {
        let data = format!("{HEADER}08:30, 0, 1, 2, 0, 0, 0, 0, 1, 1, 1\n");
        let tt = Timetable::from_reader(data.as_bytes()).unwrap();
        let r = &tt.records()[0];

        assert_eq!(r.etd, hm(8, 30));
        assert_eq!(r.destination, Destination::JinaiUniversity);
        assert_eq!(r.platform.as_deref(), Some("1"));
        assert_eq!(r.car.as_deref(), Some("2"));
        assert!(!r.stops.serves(StopPosition::EchizenTakefu));
        assert!(!r.stops.serves(StopPosition::Takefu));
        assert!(r.stops.serves(StopPosition::KunitakaReturn));
        assert!(r.stops.serves(StopPosition::HoyamaReturn));
        assert!(!r.stops.bypasses_jindai());
    }

    #[test]
    fn jindai_zero_marks_bypass() {
        let data = format!("{HEADER}09:00, 1, 2, 1, 1, 1, 1, 1, 0, 0, 0\n");
        let tt = Timetable::from_reader(data.as_bytes()).unwrap();
        assert!(tt.records()[0].stops.bypasses_jindai());
        assert_eq!(tt.records()[0].destination, Destination::TakefuStation);
    }

    #[test]
    fn malformed_and_missing_etd_rows_are_skipped() {
        let data = format!(
            "{HEADER}\
             8h30, 1, 2, 1, 1, 1, 1, 1, 0, 0, 0\n\
             , 1, 2, 1, 1, 1, 1, 1, 0, 0, 0\n\
             25:10, 1, 2, 1, 1, 1, 1, 1, 0, 0, 0\n\
             10:15, 1, 2, 1, 1, 1, 1, 1, 0, 0, 0\n"
        );
        let tt = Timetable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(tt.len(), 1);
        assert_eq!(tt.records()[0].etd, hm(10, 15));
    }

    #[test]
    fn missing_etd_column_skips_every_row() {
        let data = "destination, platform\n0, 1\n1, 2\n";
        let tt = Timetable::from_reader(data.as_bytes()).unwrap();
        assert!(tt.is_empty());
    }

    #[test]
    fn short_rows_and_missing_columns_degrade_to_none() {
        let data = "ETD, destination, platform\n07:45, 0\n07:50\n";
        let tt = Timetable::from_reader(data.as_bytes()).unwrap();

        assert_eq!(tt.len(), 2);
        let first = &tt.records()[0];
        assert_eq!(first.destination, Destination::JinaiUniversity);
        assert_eq!(first.platform, None);
        assert_eq!(first.car, None);
        assert!(!first.stops.serves(StopPosition::Takefu));
        assert!(!first.stops.bypasses_jindai());

        // no destination column value → Takefu Station
        assert_eq!(tt.records()[1].destination, Destination::TakefuStation);
    }

    #[test]
    fn missing_file_returns_error() {
        let result = Timetable::load_from_file(Path::new("/nonexistent/timetable.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn from_records_keeps_ties_in_insertion_order() {
        let mut a = DepartureRecord::new(hm(8, 0), Destination::TakefuStation);
        a.car = Some("A".into());
        let mut b = DepartureRecord::new(hm(8, 0), Destination::JinaiUniversity);
        b.car = Some("B".into());
        let early = DepartureRecord::new(hm(7, 0), Destination::TakefuStation);

        let tt = Timetable::from_records(vec![a, b, early]);
        let cars: Vec<_> = tt.records().iter().map(|r| r.car.clone()).collect();
        assert_eq!(cars, vec![None, Some("A".into()), Some("B".into())]);
    }

    #[test]
    fn etd_label_is_zero_padded() {
        let r = DepartureRecord::new(hm(8, 5), Destination::TakefuStation);
        assert_eq!(r.etd_label(), "08:05");
    }

    #[test]
    fn stop_positions_share_names_for_doubled_stops() {
        assert_eq!(
            StopPosition::HoyamaOutbound.station_name(),
            StopPosition::HoyamaReturn.station_name()
        );
        assert_eq!(
            StopPosition::KunitakaOutbound.station_name(),
            StopPosition::KunitakaReturn.station_name()
        );
        assert_eq!(StopPosition::KunitakaReturn.column(), "kunitaka(2)");
    }

    #[test]
    fn bundled_demo_timetable_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/timetable.csv");
        let tt = Timetable::load_from_file(&path).unwrap();
        assert_eq!(tt.len(), 6);
        assert_eq!(tt.records()[0].etd, hm(8, 0));
        assert!(tt.records()[0].stops.bypasses_jindai());
        assert_eq!(tt.records()[1].destination, Destination::JinaiUniversity);
    }
}
