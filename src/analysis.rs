//! Structural verification of a generated log
//!
//! [`verify_log`] re-derives the guarantees of the simulator from a clean log
//! table alone: contiguous `idx`, increasing identifiers, field population
//! rules, LoadAL/UnloadAL bracketing of every tray, station exclusion and
//! each box's six-step itinerary. Violations are collected, never fatal.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::events::{LogTable, LOG_COLUMNS};
use crate::simulation::SimulationResult;
use crate::types::config::line;
use crate::types::{Activity, BatchPosition, BoxId, Station};

const IDX: usize = 0;
const EVENT_ID: usize = 1;
const ACTIVITY: usize = 2;
const TIMESTAMP: usize = 3;
const TIMESTAMP_VAR: usize = 4;
const BOX: usize = 5;
const BATCH_POSITION: usize = 6;
const EQUIPMENT: usize = 7;
const LOG: usize = 8;

/// Which property a violation breaks
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Header differs from the log column list
    Header,
    /// `idx` is not the row position
    Index,
    /// `eventId`/`timestampVar` malformed, mismatched or not increasing
    Counter,
    /// A cell is unparsable or populated against the activity's rules
    Field,
    /// Tray not bracketed by LoadAL/UnloadAL, wrong size or mixed equipment
    Tray,
    /// Two boxes in one station at once
    StationExclusion,
    /// A box's steps out of itinerary order or incomplete
    Itinerary,
}

impl ViolationKind {
    /// Serialized name
    pub fn name(&self) -> &'static str {
        match self {
            ViolationKind::Header => "header",
            ViolationKind::Index => "index",
            ViolationKind::Counter => "counter",
            ViolationKind::Field => "field",
            ViolationKind::Tray => "tray",
            ViolationKind::StationExclusion => "station_exclusion",
            ViolationKind::Itinerary => "itinerary",
        }
    }
}

/// A single broken property
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogViolation {
    /// Property broken
    pub kind: ViolationKind,
    /// Data row (0-based) where it was detected
    pub row: Option<usize>,
    /// Human-readable description
    pub details: String,
}

/// Outcome of verifying a log table
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LogReport {
    /// Data rows inspected
    pub rows: usize,
    /// Complete trays seen
    pub trays: usize,
    /// Distinct boxes sealed
    pub boxes: usize,
    /// Everything that was wrong
    pub violations: Vec<LogViolation>,
}

impl LogReport {
    /// Whether no violation was found
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations of one kind
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} rows, {} trays, {} boxes, {} violations",
            self.rows,
            self.trays,
            self.boxes,
            self.violations.len()
        )
    }

    fn push(&mut self, kind: ViolationKind, row: Option<usize>, details: impl Into<String>) {
        self.violations.push(LogViolation { kind, row, details: details.into() });
    }
}

/// Bookkeeping for the tray currently on the line
#[derive(Debug)]
struct OpenTray {
    start_row: usize,
    equipment: Option<u32>,
    station_events: usize,
    fill_occupant: Option<BatchPosition>,
    seal_occupant: Option<BatchPosition>,
    next_step: HashMap<BatchPosition, usize>,
    sealed: HashMap<BatchPosition, BoxId>,
}

impl OpenTray {
    fn new(start_row: usize, equipment: Option<u32>) -> Self {
        Self {
            start_row,
            equipment,
            station_events: 0,
            fill_occupant: None,
            seal_occupant: None,
            next_step: HashMap::new(),
            sealed: HashMap::new(),
        }
    }

    fn occupant(&mut self, station: Station) -> &mut Option<BatchPosition> {
        match station {
            Station::Fill => &mut self.fill_occupant,
            Station::Seal => &mut self.seal_occupant,
        }
    }
}

/// A row parsed far enough to follow trays and stations
struct ParsedRow {
    activity: Activity,
    box_id: Option<BoxId>,
    batch_position: Option<BatchPosition>,
    equipment: Option<u32>,
}

/// Verify every structural property of a clean generated log
#[instrument(skip_all, fields(rows = table.row_count()))]
pub fn verify_log(table: &LogTable) -> LogReport {
    let mut report = LogReport { rows: table.row_count(), ..Default::default() };

    if !table.has_log_header() {
        report.push(
            ViolationKind::Header,
            None,
            format!("expected [{}], found [{}]", LOG_COLUMNS.join(", "), table.header().join(", ")),
        );
        return report;
    }

    let mut last_counter = 0u64;
    let mut tray: Option<OpenTray> = None;
    let mut boxes: HashSet<BoxId> = HashSet::new();

    for (r, row) in table.rows().iter().enumerate() {
        check_index(&mut report, r, row[IDX].as_deref());
        check_counters(
            &mut report,
            r,
            row[EVENT_ID].as_deref(),
            row[TIMESTAMP_VAR].as_deref(),
            &mut last_counter,
        );

        let Some(parsed) = parse_row(&mut report, r, row) else {
            continue;
        };

        match parsed.activity {
            Activity::LoadAL => {
                if let Some(open) = &tray {
                    report.push(
                        ViolationKind::Tray,
                        Some(r),
                        format!(
                            "LoadAL while the tray loaded at row {} is still open",
                            open.start_row
                        ),
                    );
                }
                tray = Some(OpenTray::new(r, parsed.equipment));
            }
            Activity::UnloadAL => match tray.take() {
                Some(open) => {
                    if open.equipment != parsed.equipment {
                        report.push(
                            ViolationKind::Tray,
                            Some(r),
                            "UnloadAL equipment differs from LoadAL",
                        );
                    }
                    close_tray(&mut report, r, open, &mut boxes);
                }
                None => report.push(ViolationKind::Tray, Some(r), "UnloadAL without an open tray"),
            },
            activity => match tray.as_mut() {
                Some(open) => station_step(&mut report, r, open, activity, &parsed),
                None => report.push(
                    ViolationKind::Tray,
                    Some(r),
                    format!("{} outside of any tray", activity),
                ),
            },
        }
    }

    if let Some(open) = tray {
        report.push(
            ViolationKind::Tray,
            Some(open.start_row),
            "tray is never unloaded",
        );
    }

    report.boxes = boxes.len();
    debug!("Verification finished: {}", report.summary());
    report
}

fn check_index(report: &mut LogReport, r: usize, idx: Option<&str>) {
    if idx.and_then(|v| v.parse::<usize>().ok()) != Some(r) {
        report.push(
            ViolationKind::Index,
            Some(r),
            format!("idx {:?} at row {}", idx.unwrap_or(""), r),
        );
    }
}

fn check_counters(
    report: &mut LogReport,
    r: usize,
    event_id: Option<&str>,
    time_var: Option<&str>,
    last_counter: &mut u64,
) {
    let parse = |cell: Option<&str>, prefix: char| {
        cell.and_then(|v| v.strip_prefix(prefix)).and_then(|n| n.parse::<u64>().ok())
    };

    match (parse(event_id, 'e'), parse(time_var, 't')) {
        (Some(e), Some(t)) if e == t => {
            if e <= *last_counter {
                report.push(
                    ViolationKind::Counter,
                    Some(r),
                    format!("counter {} does not exceed previous {}", e, last_counter),
                );
            }
            *last_counter = e;
        }
        _ => report.push(
            ViolationKind::Counter,
            Some(r),
            format!(
                "eventId {:?} and timestampVar {:?} do not share a counter",
                event_id, time_var
            ),
        ),
    }
}

fn parse_row(report: &mut LogReport, r: usize, row: &[Option<String>]) -> Option<ParsedRow> {
    let activity = match row[ACTIVITY].as_deref().map(str::parse::<Activity>) {
        Some(Ok(activity)) => activity,
        _ => {
            report.push(ViolationKind::Field, Some(r), format!("activity {:?}", row[ACTIVITY]));
            return None;
        }
    };

    let timestamp_ok = row[TIMESTAMP]
        .as_deref()
        .is_some_and(|v| NaiveDateTime::parse_from_str(v, line::TIMESTAMP_FORMAT).is_ok());
    if !timestamp_ok {
        report.push(ViolationKind::Field, Some(r), format!("timestamp {:?}", row[TIMESTAMP]));
    }

    let equipment = row[EQUIPMENT].as_deref().and_then(|v| v.parse::<u32>().ok());
    if equipment.is_none() {
        report.push(ViolationKind::Field, Some(r), format!("equipment {:?}", row[EQUIPMENT]));
    }

    if row[LOG].is_none() {
        report.push(ViolationKind::Field, Some(r), "log tag is missing");
    }

    let box_id = row[BOX].as_deref().and_then(|v| v.parse::<BoxId>().ok());
    let batch_position =
        row[BATCH_POSITION].as_deref().and_then(|v| v.parse::<BatchPosition>().ok());

    if row[BOX].is_some() != activity.records_box_id() || row[BOX].is_some() != box_id.is_some() {
        report.push(
            ViolationKind::Field,
            Some(r),
            format!("{} with box {:?}", activity, row[BOX]),
        );
    }
    if row[BATCH_POSITION].is_some() != activity.records_batch_position()
        || row[BATCH_POSITION].is_some() != batch_position.is_some()
    {
        report.push(
            ViolationKind::Field,
            Some(r),
            format!("{} with batchPosition {:?}", activity, row[BATCH_POSITION]),
        );
    }

    Some(ParsedRow { activity, box_id, batch_position, equipment })
}

fn station_step(
    report: &mut LogReport,
    r: usize,
    tray: &mut OpenTray,
    activity: Activity,
    parsed: &ParsedRow,
) {
    tray.station_events += 1;
    if parsed.equipment != tray.equipment {
        report.push(
            ViolationKind::Tray,
            Some(r),
            format!("{} equipment differs from the tray's", activity),
        );
    }

    let Some(station) = activity.station() else {
        return;
    };

    // Fill and Seal carry no position; they belong to the current occupant
    let position = match activity {
        Activity::Fill | Activity::Seal => *tray.occupant(station),
        _ => parsed.batch_position,
    };
    let Some(position) = position else {
        report.push(
            ViolationKind::StationExclusion,
            Some(r),
            format!("{} with no box in {}", activity, station),
        );
        return;
    };

    let occupant = tray.occupant(station);
    match activity {
        Activity::LoadFS | Activity::LoadSS => {
            if let Some(current) = *occupant {
                report.push(
                    ViolationKind::StationExclusion,
                    Some(r),
                    format!("{} loads {} while {} is inside", station, position, current),
                );
            }
            *occupant = Some(position);
        }
        Activity::UnloadFS | Activity::UnloadSS => {
            if *occupant != Some(position) {
                report.push(
                    ViolationKind::StationExclusion,
                    Some(r),
                    format!("{} unloads {} but holds {:?}", station, position, occupant),
                );
            }
            *occupant = None;
        }
        _ => {}
    }

    if activity == Activity::Seal {
        if let Some(box_id) = parsed.box_id {
            tray.sealed.insert(position, box_id);
        }
    }

    let step = Activity::ITINERARY.iter().position(|a| *a == activity).unwrap_or_default();
    let next = tray.next_step.entry(position).or_insert(0);
    if *next != step {
        report.push(
            ViolationKind::Itinerary,
            Some(r),
            format!(
                "box at {} performs {} as step {} instead of {}",
                position,
                activity,
                *next + 1,
                step + 1
            ),
        );
    }
    *next = step + 1;
}

fn close_tray(report: &mut LogReport, r: usize, tray: OpenTray, boxes: &mut HashSet<BoxId>) {
    let expected = line::TRAY_SIZE * line::STEPS_PER_BOX;
    if tray.station_events != expected {
        report.push(
            ViolationKind::Tray,
            Some(r),
            format!(
                "tray loaded at row {} holds {} station events, expected {}",
                tray.start_row, tray.station_events, expected
            ),
        );
    }

    for position in BatchPosition::ALL {
        let done = tray.next_step.get(&position).copied().unwrap_or(0);
        if done != line::STEPS_PER_BOX {
            report.push(
                ViolationKind::Itinerary,
                Some(r),
                format!("box at {} completed {} of {} steps", position, done, line::STEPS_PER_BOX),
            );
        }
    }

    for box_id in tray.sealed.values() {
        if !boxes.insert(*box_id) {
            report.push(
                ViolationKind::Itinerary,
                Some(r),
                format!("{} sealed in two trays", box_id),
            );
        }
    }

    report.trays += 1;
}

/// Verify the log at `path`
pub fn verify_log_file<P: AsRef<Path>>(path: P) -> SimulationResult<LogReport> {
    let table = LogTable::read_from(path)?;
    Ok(verify_log(&table))
}

/// Write a verification report as JSON with a per-kind summary
pub fn write_report<P: AsRef<Path>>(output_path: P, report: &LogReport) -> SimulationResult<()> {
    let mut by_kind: HashMap<&str, usize> = HashMap::new();
    for violation in &report.violations {
        *by_kind.entry(violation.kind.name()).or_insert(0) += 1;
    }

    let full_report = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "valid": report.is_valid(),
        "report": report,
        "summary": {
            "rows": report.rows,
            "trays": report.trays,
            "boxes": report.boxes,
            "violations": report.violations.len(),
            "by_kind": by_kind,
        }
    });

    let file = File::create(output_path.as_ref())?;
    serde_json::to_writer_pretty(&file, &full_report)?;
    info!("Verification report written to {}", output_path.as_ref().display());
    Ok(())
}
