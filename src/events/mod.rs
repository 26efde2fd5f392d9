//! Event records, the shared event log, and its tabular form
//!
//! # Overview
//!
//! - **EventRecord**: an immutable line-activity record with its assigned identifiers
//! - **PendingEvent**: what a worker submits before identifiers are assigned
//! - **EventLog**: thread-safe, append-only store handing out `idx`/`eventId`/`timestampVar`
//! - **LogTable**: header plus optional cells, read from and written to CSV
//!
//! # Usage Example
//!
//! ```rust
//! use box_process_simulator::events::*;
//! use box_process_simulator::types::*;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 10, 1)
//!     .unwrap()
//!     .and_hms_opt(9, 0, 0)
//!     .unwrap();
//!
//! let log = EventLog::new("GeneratedExample");
//! let load = PendingEvent::tray_boundary(Activity::LoadAL, start, EquipmentId(1000));
//! let receipt = log.append(load);
//! assert_eq!(receipt.sequence_index, 0);
//! assert_eq!(receipt.event_id(), "e1");
//!
//! let table = log.to_table();
//! assert_eq!(table.row_count(), 1);
//! assert_eq!(table.column("activity").unwrap(), vec![Some("LoadAL")]);
//! ```

pub mod log;
pub mod record;
pub mod table;

// Re-export all public types for convenience
pub use log::*;
pub use record::*;
pub use table::*;
