//! Statistics collection and reporting
//!
//! This module contains the statistics of a simulation run and of the noise
//! variants derived from it, plus their human-readable summary output.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::events::{format_timestamp, EventRecord};
use crate::types::config::line;
use crate::types::{Activity, NoiseMode};

/// Statistics of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Box count asked for by the configuration
    pub requested_boxes: usize,
    /// Boxes actually simulated (whole trays only)
    pub boxes: usize,
    /// Trays processed
    pub trays: usize,
    /// Rows appended to the log
    pub total_events: usize,
    /// Rows per activity
    pub activity_counts: BTreeMap<Activity, usize>,
    /// Times the fill station was acquired
    pub fill_station_acquisitions: u64,
    /// Times the seal station was acquired
    pub seal_station_acquisitions: u64,
    /// Most simultaneous holders of the fill station (must be 1)
    pub peak_fill_occupancy: usize,
    /// Most simultaneous holders of the seal station (must be 1)
    pub peak_seal_occupancy: usize,
    /// Simulated time of the first LoadAL
    pub simulated_start: NaiveDateTime,
    /// Simulated time after the last UnloadAL
    pub simulated_end: NaiveDateTime,
    /// Wall-clock duration of the run
    pub simulation_duration: Duration,
}

impl RunStatistics {
    /// Empty statistics for a run starting at `simulated_start`
    pub fn new(requested_boxes: usize, simulated_start: NaiveDateTime) -> Self {
        Self {
            requested_boxes,
            boxes: 0,
            trays: 0,
            total_events: 0,
            activity_counts: BTreeMap::new(),
            fill_station_acquisitions: 0,
            seal_station_acquisitions: 0,
            peak_fill_occupancy: 0,
            peak_seal_occupancy: 0,
            simulated_start,
            simulated_end: simulated_start,
            simulation_duration: Duration::from_secs(0),
        }
    }

    /// Count rows per activity from the finished log
    pub fn record_events(&mut self, records: &[EventRecord]) {
        self.total_events = records.len();
        self.activity_counts.clear();
        for record in records {
            *self.activity_counts.entry(record.activity).or_insert(0) += 1;
        }
    }

    /// Rows recorded for one activity
    pub fn activity_count(&self, activity: Activity) -> usize {
        self.activity_counts.get(&activity).copied().unwrap_or(0)
    }

    /// Rows the processed trays should have produced
    pub fn expected_events(&self) -> usize {
        self.trays * line::ROWS_PER_TRAY
    }

    /// Boxes dropped by rounding down to whole trays
    pub fn dropped_boxes(&self) -> usize {
        self.requested_boxes.saturating_sub(self.boxes)
    }

    /// Set the wall-clock duration of the run
    pub fn set_simulation_duration(&mut self, duration: Duration) {
        self.simulation_duration = duration;
    }

    /// Simulated time covered by the run
    pub fn simulated_span(&self) -> chrono::Duration {
        self.simulated_end - self.simulated_start
    }

    /// Rows appended per wall-clock second
    pub fn events_per_second(&self) -> f64 {
        let secs = self.simulation_duration.as_secs_f64();
        if secs > 0.0 {
            self.total_events as f64 / secs
        } else {
            0.0
        }
    }

    /// Multi-line summary for the end of a run
    pub fn generate_summary_output(&self) -> String {
        let mut output = String::new();

        output.push_str("Box Process Simulation Complete!\n");
        output.push_str("================================\n\n");

        output.push_str("Simulation Summary:\n");
        output.push_str(&format!(
            "   Boxes: {} ({} requested) in {} trays\n",
            self.boxes, self.requested_boxes, self.trays
        ));
        output.push_str(&format!(
            "   Simulated Time: {} -> {} ({} s)\n",
            format_timestamp(&self.simulated_start),
            format_timestamp(&self.simulated_end),
            self.simulated_span().num_seconds()
        ));
        output.push_str(&format!(
            "   Duration: {:.3} seconds ({:.0} events/s)\n\n",
            self.simulation_duration.as_secs_f64(),
            self.events_per_second()
        ));

        output.push_str("Event Statistics:\n");
        output.push_str(&format!("   Total Events: {}\n", self.total_events));
        for activity in Activity::ALL {
            output.push_str(&format!(
                "   {:<9} {}\n",
                format!("{}:", activity),
                self.activity_count(activity)
            ));
        }
        output.push('\n');

        output.push_str("Stations:\n");
        output.push_str(&format!(
            "   FillStation: {} acquisitions, peak occupancy {}\n",
            self.fill_station_acquisitions, self.peak_fill_occupancy
        ));
        output.push_str(&format!(
            "   SealStation: {} acquisitions, peak occupancy {}\n",
            self.seal_station_acquisitions, self.peak_seal_occupancy
        ));

        output
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} boxes, {} trays, {} events",
            self.boxes, self.trays, self.total_events
        )
    }
}

/// Outcome of corrupting one copy of the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseVariantStatistics {
    /// Corruption rate applied
    pub rate: f64,
    /// Cells that could be corrupted (every column except `box`)
    pub eligible_cells: usize,
    /// Cells turned into missing values
    pub corrupted_cells: usize,
}

impl NoiseVariantStatistics {
    /// Share of eligible cells that were corrupted
    pub fn corrupted_fraction(&self) -> f64 {
        if self.eligible_cells == 0 {
            0.0
        } else {
            self.corrupted_cells as f64 / self.eligible_cells as f64
        }
    }
}

/// Statistics of every noise variant written by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseStatistics {
    /// How masks related across rates
    pub mode: NoiseMode,
    /// One entry per rate, in configuration order
    pub variants: Vec<NoiseVariantStatistics>,
}

impl NoiseStatistics {
    /// Multi-line summary of the variants
    pub fn generate_summary_output(&self) -> String {
        let mut output = format!("Noise Variants ({}):\n", self.mode);
        for (index, variant) in self.variants.iter().enumerate() {
            output.push_str(&format!(
                "   #{} rate {:.1}%: {} of {} cells missing ({:.2}%)\n",
                index + 1,
                variant.rate * 100.0,
                variant.corrupted_cells,
                variant.eligible_cells,
                variant.corrupted_fraction() * 100.0
            ));
        }
        output
    }
}
