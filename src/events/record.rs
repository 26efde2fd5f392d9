//! Event records and their tabular rendering
//!
//! This module contains the immutable event record appended to the log, the
//! pending form a worker submits before identifiers are assigned, and the
//! fixed column layout of the persisted log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::config::line::TIMESTAMP_FORMAT;
use crate::types::{Activity, BatchPosition, BoxId, EquipmentId, EventCounter};

/// Column header of the persisted log, in order
pub const LOG_COLUMNS: [&str; 9] = [
    "idx",
    "eventId",
    "activity",
    "timestamp",
    "timestampVar",
    "box",
    "batchPosition",
    "equipment",
    "log",
];

/// Name of the column holding the box identifier
pub const BOX_COLUMN: &str = "box";

/// Format a simulated timestamp the way the log stores it
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// An event not yet placed in the log
///
/// Identifiers (`idx`, `eventId`, `timestampVar`) are assigned by
/// [`EventLog::append`](crate::events::EventLog::append) under the log's
/// exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    /// Activity being recorded
    pub activity: Activity,
    /// Simulated time of the activity
    pub timestamp: NaiveDateTime,
    /// Box identifier (Seal events only)
    pub box_id: Option<BoxId>,
    /// Batch position (station load/unload events only)
    pub batch_position: Option<BatchPosition>,
    /// Equipment shared by the tray
    pub equipment: EquipmentId,
}

impl PendingEvent {
    /// Create a tray boundary event (LoadAL / UnloadAL)
    pub fn tray_boundary(
        activity: Activity,
        timestamp: NaiveDateTime,
        equipment: EquipmentId,
    ) -> Self {
        Self { activity, timestamp, box_id: None, batch_position: None, equipment }
    }

    /// Create a station event for one box, populating only the fields the
    /// activity is allowed to carry
    pub fn station_step(
        activity: Activity,
        timestamp: NaiveDateTime,
        box_id: BoxId,
        batch_position: BatchPosition,
        equipment: EquipmentId,
    ) -> Self {
        Self {
            activity,
            timestamp,
            box_id: activity.records_box_id().then_some(box_id),
            batch_position: activity.records_batch_position().then_some(batch_position),
            equipment,
        }
    }
}

/// An event placed in the log; immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log (0-based, equals insertion order)
    pub sequence_index: u64,
    /// Run-wide identifier counter value
    pub counter: EventCounter,
    /// Activity recorded
    pub activity: Activity,
    /// Simulated time of the activity
    pub timestamp: NaiveDateTime,
    /// Box identifier (Seal events only)
    pub box_id: Option<BoxId>,
    /// Batch position (station load/unload events only)
    pub batch_position: Option<BatchPosition>,
    /// Equipment shared by the tray
    pub equipment: EquipmentId,
    /// Constant tag identifying the record as synthetic
    pub source_tag: String,
}

impl EventRecord {
    /// Place a pending event at `sequence_index` with the given counter value
    pub fn from_pending(
        pending: PendingEvent,
        sequence_index: u64,
        counter: EventCounter,
        source_tag: &str,
    ) -> Self {
        Self {
            sequence_index,
            counter,
            activity: pending.activity,
            timestamp: pending.timestamp,
            box_id: pending.box_id,
            batch_position: pending.batch_position,
            equipment: pending.equipment,
            source_tag: source_tag.to_string(),
        }
    }

    /// Rendered `eventId` column value
    pub fn event_id(&self) -> String {
        self.counter.event_id()
    }

    /// Rendered `timestampVar` column value
    pub fn time_var(&self) -> String {
        self.counter.time_var()
    }

    /// Render the record as table cells in [`LOG_COLUMNS`] order
    pub fn to_cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.sequence_index.to_string()),
            Some(self.event_id()),
            Some(self.activity.to_string()),
            Some(format_timestamp(&self.timestamp)),
            Some(self.time_var()),
            self.box_id.map(|id| id.to_string()),
            self.batch_position.map(|position| position.to_string()),
            Some(self.equipment.to_string()),
            Some(self.source_tag.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&at(9, 0, 7)), "01/10/2024 09:00:07");
    }

    #[test]
    fn test_station_step_field_rules() {
        let seal = PendingEvent::station_step(
            Activity::Seal,
            at(9, 0, 0),
            BoxId::new(4),
            BatchPosition::Y,
            EquipmentId(2000),
        );
        assert_eq!(seal.box_id, Some(BoxId::new(4)));
        assert_eq!(seal.batch_position, None);

        let fill = PendingEvent::station_step(
            Activity::Fill,
            at(9, 0, 0),
            BoxId::new(4),
            BatchPosition::Y,
            EquipmentId(2000),
        );
        assert_eq!(fill.box_id, None);
        assert_eq!(fill.batch_position, None);

        let load = PendingEvent::station_step(
            Activity::LoadSS,
            at(9, 0, 0),
            BoxId::new(4),
            BatchPosition::Y,
            EquipmentId(2000),
        );
        assert_eq!(load.box_id, None);
        assert_eq!(load.batch_position, Some(BatchPosition::Y));
    }

    #[test]
    fn test_record_cells_follow_column_order() {
        let pending = PendingEvent::station_step(
            Activity::LoadFS,
            at(9, 0, 1),
            BoxId::new(1),
            BatchPosition::Z,
            EquipmentId(5111),
        );
        let record = EventRecord::from_pending(pending, 1, EventCounter(2), "GeneratedExample");
        let cells = record.to_cells();

        assert_eq!(cells.len(), LOG_COLUMNS.len());
        assert_eq!(cells[0].as_deref(), Some("1"));
        assert_eq!(cells[1].as_deref(), Some("e2"));
        assert_eq!(cells[2].as_deref(), Some("LoadFS"));
        assert_eq!(cells[3].as_deref(), Some("01/10/2024 09:00:01"));
        assert_eq!(cells[4].as_deref(), Some("t2"));
        assert_eq!(cells[5], None);
        assert_eq!(cells[6].as_deref(), Some("z"));
        assert_eq!(cells[7].as_deref(), Some("5111"));
        assert_eq!(cells[8].as_deref(), Some("GeneratedExample"));
    }

    #[test]
    fn test_box_column_is_in_header() {
        assert_eq!(LOG_COLUMNS.iter().position(|c| *c == BOX_COLUMN), Some(5));
    }
}
