//! Per-box worker
//!
//! A [`BoxWorker`] drives one box through its six-step itinerary: the fill
//! triplet under fill-station occupancy, then the seal triplet under
//! seal-station occupancy. Its clock is private; only the log's identifier
//! counter is shared with other workers.

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, instrument};

use crate::events::PendingEvent;
use crate::simulation::SimulationContext;
use crate::types::config::line;
use crate::types::{Activity, BatchPosition, BoxId, EquipmentId, Station};

/// Station and the itinerary steps performed while holding it
const STAGES: [(Station, [Activity; 3]); 2] = [
    (Station::Fill, [Activity::LoadFS, Activity::Fill, Activity::UnloadFS]),
    (Station::Seal, [Activity::LoadSS, Activity::Seal, Activity::UnloadSS]),
];

/// Executes one box's pass through both stations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxWorker {
    box_id: BoxId,
    batch_position: BatchPosition,
    equipment: EquipmentId,
    start_time: NaiveDateTime,
}

impl BoxWorker {
    /// Create a worker for one box of a tray
    pub fn new(
        box_id: BoxId,
        batch_position: BatchPosition,
        equipment: EquipmentId,
        start_time: NaiveDateTime,
    ) -> Self {
        Self { box_id, batch_position, equipment, start_time }
    }

    /// Box driven by this worker
    pub fn box_id(&self) -> BoxId {
        self.box_id
    }

    /// Slot the box occupies in its tray
    pub fn batch_position(&self) -> BatchPosition {
        self.batch_position
    }

    /// Clock value of the first step
    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    /// Append the six itinerary events, returning the worker clock after the
    /// last step
    #[instrument(
        skip(self, context),
        fields(box_id = %self.box_id, position = %self.batch_position, equipment = %self.equipment)
    )]
    pub fn run(self, context: &SimulationContext) -> NaiveDateTime {
        let step = Duration::seconds(line::STEP_SECONDS);
        let mut clock = self.start_time;

        for (station, activities) in STAGES {
            let _occupancy = context.station(station).acquire();
            debug!(%station, "Station occupied");

            for activity in activities {
                context.log().append(PendingEvent::station_step(
                    activity,
                    clock,
                    self.box_id,
                    self.batch_position,
                    self.equipment,
                ));
                clock += step;
            }
        }

        clock
    }
}
