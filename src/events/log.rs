//! Append-only event log shared by every box worker
//!
//! The log owns the run-wide identifier counter. Assigning the counter and
//! pushing the record happen under one lock, so the position a record lands
//! at, its `idx` and its `e<n>`/`t<n>` identifiers are always consistent.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, instrument, trace};

use crate::events::record::{EventRecord, PendingEvent};
use crate::events::table::LogTable;
use crate::simulation::SimulationResult;
use crate::types::EventCounter;

/// Identifiers handed back for an appended event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Position of the record in the log
    pub sequence_index: u64,
    /// Counter value behind `eventId` and `timestampVar`
    pub counter: EventCounter,
}

impl AppendReceipt {
    /// Rendered `eventId` of the appended record
    pub fn event_id(&self) -> String {
        self.counter.event_id()
    }
}

#[derive(Debug, Default)]
struct LogInner {
    records: Vec<EventRecord>,
    last_counter: u64,
}

/// Ordered, append-only store of event records
#[derive(Debug)]
pub struct EventLog {
    source_tag: String,
    inner: Mutex<LogInner>,
}

impl EventLog {
    /// Create an empty log whose records carry `source_tag` in the `log` column
    pub fn new(source_tag: impl Into<String>) -> Self {
        Self { source_tag: source_tag.into(), inner: Mutex::new(LogInner::default()) }
    }

    /// Tag written to every record
    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    /// Append an event, assigning its position and identifiers
    ///
    /// Safe to call from many workers at once; no two calls ever observe the
    /// same sequence index or counter value.
    pub fn append(&self, pending: PendingEvent) -> AppendReceipt {
        let mut inner = self.lock();

        let sequence_index = inner.records.len() as u64;
        inner.last_counter += 1;
        let counter = EventCounter(inner.last_counter);

        trace!(
            idx = sequence_index,
            event_id = %counter.event_id(),
            activity = %pending.activity,
            "Appending event"
        );

        inner.records.push(EventRecord::from_pending(
            pending,
            sequence_index,
            counter,
            &self.source_tag,
        ));

        AppendReceipt { sequence_index, counter }
    }

    /// Number of records appended so far
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether nothing has been appended yet
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Snapshot of all records in ascending sequence index
    pub fn records(&self) -> Vec<EventRecord> {
        self.lock().records.clone()
    }

    /// Consume the log, returning its records in ascending sequence index
    pub fn into_records(self) -> Vec<EventRecord> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner).records
    }

    /// Tabular form of the log
    pub fn to_table(&self) -> LogTable {
        LogTable::from_records(&self.lock().records)
    }

    /// Write every record, in ascending sequence index, to `path`
    ///
    /// The parent directory is not created; an unreachable location is an
    /// error for the caller to surface.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn serialize<P: AsRef<Path>>(&self, path: P) -> SimulationResult<()> {
        let table = self.to_table();
        table.write_to(path.as_ref())?;
        info!("Serialized {} events", table.row_count());
        Ok(())
    }

    // Records are only ever pushed whole, so a poisoned lock still holds a
    // consistent log.
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Activity, EquipmentId};
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn boundary(activity: Activity) -> PendingEvent {
        let ts = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        PendingEvent::tray_boundary(activity, ts, EquipmentId(1000))
    }

    #[test]
    fn test_append_assigns_consecutive_identifiers() {
        let log = EventLog::new("GeneratedExample");
        assert!(log.is_empty());

        let first = log.append(boundary(Activity::LoadAL));
        let second = log.append(boundary(Activity::UnloadAL));

        assert_eq!(first.sequence_index, 0);
        assert_eq!(first.event_id(), "e1");
        assert_eq!(second.sequence_index, 1);
        assert_eq!(second.counter, EventCounter(2));
        assert_eq!(log.len(), 2);

        let records = log.records();
        assert_eq!(records[1].activity, Activity::UnloadAL);
        assert_eq!(records[1].source_tag, "GeneratedExample");
    }

    #[test]
    fn test_concurrent_appends_never_share_identifiers() {
        let log = Arc::new(EventLog::new("tag"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    (0..250).map(|_| log.append(boundary(Activity::LoadAL))).collect::<Vec<_>>()
                })
            })
            .collect();

        let receipts: Vec<AppendReceipt> =
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        assert_eq!(receipts.len(), 2000);

        let indices: HashSet<u64> = receipts.iter().map(|r| r.sequence_index).collect();
        assert_eq!(indices.len(), 2000);
        assert!(receipts.iter().all(|r| r.counter.0 == r.sequence_index + 1));

        let records = Arc::try_unwrap(log).unwrap().into_records();
        for (position, record) in records.iter().enumerate() {
            assert_eq!(record.sequence_index, position as u64);
            assert_eq!(record.counter.0, position as u64 + 1);
        }
    }

    #[test]
    fn test_serialize_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");

        let log = EventLog::new("GeneratedExample");
        log.append(boundary(Activity::LoadAL));
        log.serialize(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("idx,eventId,activity,timestamp,timestampVar,box,batchPosition,equipment,log")
        );
        assert_eq!(
            lines.next(),
            Some("0,e1,LoadAL,01/10/2024 09:00:00,t1,,,1000,GeneratedExample")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_serialize_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new("tag");
        log.append(boundary(Activity::LoadAL));
        assert!(log.serialize(dir.path().join("nope").join("log.csv")).is_err());
    }
}
