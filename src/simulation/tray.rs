//! Tray-level simulation driver
//!
//! This module contains the [`SimulationContext`] shared by the workers of a
//! run and the [`TraySimulator`] that loads trays of three boxes, runs one
//! worker thread per box, waits for all of them and unloads the tray.

use std::any::Any;
use std::thread;
use std::time::Instant;

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, instrument, warn};

use crate::events::{EventLog, PendingEvent};
use crate::simulation::{
    BoxWorker, RunStatistics, SimulationError, SimulationResult, StationResource,
};
use crate::types::config::line;
use crate::types::{Activity, BatchPosition, BoxId, SimulationConfig, Station};

/// State shared by every worker of one run
///
/// Constructed once per run and passed by reference; [`into_log`] is the
/// teardown point.
///
/// [`into_log`]: SimulationContext::into_log
#[derive(Debug)]
pub struct SimulationContext {
    log: EventLog,
    fill_station: StationResource,
    seal_station: StationResource,
}

impl SimulationContext {
    /// Fresh context with an empty log and two free stations
    pub fn new(log_tag: impl Into<String>) -> Self {
        Self {
            log: EventLog::new(log_tag),
            fill_station: StationResource::new(Station::Fill),
            seal_station: StationResource::new(Station::Seal),
        }
    }

    /// The shared event log
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// The resource modelling `station`
    pub fn station(&self, station: Station) -> &StationResource {
        match station {
            Station::Fill => &self.fill_station,
            Station::Seal => &self.seal_station,
        }
    }

    /// Copy station counters into `statistics`
    pub fn record_station_statistics(&self, statistics: &mut RunStatistics) {
        statistics.fill_station_acquisitions = self.fill_station.acquisitions();
        statistics.seal_station_acquisitions = self.seal_station.acquisitions();
        statistics.peak_fill_occupancy = self.fill_station.peak_occupants();
        statistics.peak_seal_occupancy = self.seal_station.peak_occupants();
    }

    /// Tear the context down, keeping only the finished log
    pub fn into_log(self) -> EventLog {
        self.log
    }
}

/// Lifecycle of the tray currently on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayState {
    /// No tray on the line
    Idle,
    /// Tray boundary event being appended
    LoadingAL,
    /// Box workers running
    BoxesRunning,
    /// Waiting barrier passed, tray leaving the line
    UnloadingAL,
}

/// Result of a finished run
#[derive(Debug)]
pub struct SimulationRun {
    /// The complete log, ready to serialize
    pub log: EventLog,
    /// Statistics of the run
    pub statistics: RunStatistics,
}

/// Drives trays through the line until the configured box count is reached
#[derive(Debug)]
pub struct TraySimulator {
    config: SimulationConfig,
    rng: StdRng,
    state: TrayState,
}

impl TraySimulator {
    /// Create a simulator; the configuration must hold at least one tray
    #[instrument(skip(config), fields(box_count = config.box_count, seed = ?config.seed))]
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        if config.box_count < line::TRAY_SIZE {
            return Err(SimulationError::configuration_error(format!(
                "box count {} cannot fill a tray of {}",
                config.box_count,
                line::TRAY_SIZE
            )));
        }
        if config.equipment_ids.is_empty() {
            return Err(SimulationError::configuration_error("equipment id pool is empty"));
        }

        if config.effective_box_count() != config.box_count {
            warn!(
                "Box count {} is not a multiple of {}; simulating {} boxes in {} trays",
                config.box_count,
                line::TRAY_SIZE,
                config.effective_box_count(),
                config.tray_count()
            );
        }

        let rng = if let Some(seed) = config.seed {
            info!("Using deterministic seed: {}", seed);
            StdRng::seed_from_u64(seed)
        } else {
            debug!("Using entropy-based random seed");
            StdRng::from_entropy()
        };

        Ok(Self { config, rng, state: TrayState::Idle })
    }

    /// State of the tray currently on the line
    pub fn state(&self) -> TrayState {
        self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run every tray and return the finished log with its statistics
    #[instrument(skip(self), fields(trays = self.config.tray_count()))]
    pub fn run(&mut self) -> SimulationResult<SimulationRun> {
        let started = Instant::now();
        let context = SimulationContext::new(self.config.log_tag.clone());
        let mut statistics = RunStatistics::new(self.config.box_count, self.config.start_time);

        let mut clock = self.config.start_time;
        let mut next_box = 1u64;

        for tray_index in 0..self.config.tray_count() {
            clock = self.run_tray(&context, tray_index, next_box, clock)?;
            next_box += line::TRAY_SIZE as u64;
            statistics.trays += 1;
            statistics.boxes += line::TRAY_SIZE;
        }

        context.record_station_statistics(&mut statistics);
        let log = context.into_log();
        statistics.record_events(&log.records());
        statistics.simulated_end = clock;
        statistics.set_simulation_duration(started.elapsed());

        if statistics.total_events != statistics.expected_events() {
            return Err(SimulationError::event_generation_error(format!(
                "log holds {} events, expected {} for {} trays",
                statistics.total_events,
                statistics.expected_events(),
                statistics.trays
            )));
        }

        info!("Simulation finished: {}", statistics);
        Ok(SimulationRun { log, statistics })
    }

    /// Process one tray, returning the tray clock for the next one
    #[instrument(skip(self, context, clock), fields(tray = tray_index))]
    fn run_tray(
        &mut self,
        context: &SimulationContext,
        tray_index: usize,
        first_box: u64,
        clock: NaiveDateTime,
    ) -> SimulationResult<NaiveDateTime> {
        let step = Duration::seconds(line::STEP_SECONDS);
        let stagger = Duration::seconds(line::WORKER_STAGGER_SECONDS);

        self.transition(TrayState::LoadingAL);
        let equipment = *self.config.equipment_ids.choose(&mut self.rng).ok_or_else(|| {
            SimulationError::configuration_error("equipment id pool is empty")
        })?;
        context.log().append(PendingEvent::tray_boundary(Activity::LoadAL, clock, equipment));
        let mut clock = clock + step;

        self.transition(TrayState::BoxesRunning);
        let mut positions = BatchPosition::ALL;
        positions.shuffle(&mut self.rng);

        let workers: Vec<BoxWorker> = positions
            .iter()
            .zip(first_box..)
            .map(|(&position, number)| {
                let worker = BoxWorker::new(BoxId::new(number), position, equipment, clock);
                clock += stagger;
                worker
            })
            .collect();

        let outcomes: Vec<(BoxId, thread::Result<NaiveDateTime>)> = thread::scope(|scope| {
            let handles: Vec<_> = workers
                .into_iter()
                .map(|worker| (worker.box_id(), scope.spawn(move || worker.run(context))))
                .collect();
            // Barrier: every worker is joined before the tray may unload
            handles.into_iter().map(|(box_id, handle)| (box_id, handle.join())).collect()
        });

        check_worker_outcomes(tray_index, outcomes)?;

        self.transition(TrayState::UnloadingAL);
        context.log().append(PendingEvent::tray_boundary(Activity::UnloadAL, clock, equipment));
        clock += step;

        self.transition(TrayState::Idle);
        Ok(clock)
    }

    fn transition(&mut self, next: TrayState) {
        debug!(from = ?self.state, to = ?next, "Tray state transition");
        self.state = next;
    }
}

/// Fail the tray on the first worker that did not finish
fn check_worker_outcomes(
    tray_index: usize,
    outcomes: Vec<(BoxId, thread::Result<NaiveDateTime>)>,
) -> SimulationResult<()> {
    for (box_id, outcome) in outcomes {
        if let Err(payload) = outcome {
            return Err(SimulationError::worker_failed(format!(
                "{} in tray {} panicked: {}",
                box_id,
                tray_index,
                panic_message(payload.as_ref())
            )));
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
