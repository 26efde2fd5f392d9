//! Box Process Simulator
//!
//! A concurrent assembly-line event simulator that generates synthetic event
//! logs for process-mining pipelines, plus a noise injector that derives
//! degraded copies of those logs.
//!
//! # Overview
//!
//! Boxes move tray by tray (three boxes per tray) through two shared stations.
//! Every box runs on its own thread, contends for the fill station and then the
//! seal station, and appends its events to one shared log. The log assigns a
//! unique, gap-free `idx` and a run-wide `e<n>`/`t<n>` counter to every event.
//!
//! ## Key Features
//!
//! - **Station Exclusion**: at most one box inside each station at any time
//! - **Ordered Log**: per-box itinerary order preserved in insertion order
//! - **Noise Injection**: seeded corruption at configurable rates, `box` column protected
//! - **Verification**: structural checks of a generated log
//! - **Configurable Runs**: defaults, JSON config files and CLI overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use box_process_simulator::*;
//!
//! let config = SimulationConfig {
//!     box_count: 3,
//!     seed: Some(7),
//!     ..Default::default()
//! };
//!
//! let mut simulator = TraySimulator::new(config)?;
//! let run = simulator.run()?;
//!
//! // One tray: LoadAL + 3 boxes x 6 steps + UnloadAL
//! assert_eq!(run.log.len(), 20);
//! assert!(analysis::verify_log(&run.log.to_table()).is_valid());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: Core types, identifiers, and configuration
//! - [`events`]: Event records, the shared log, and its tabular form
//! - [`simulation`]: Stations, workers, tray driver, noise injection, statistics
//! - [`analysis`]: Structural verification of generated logs
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  spawns   ┌─────────────┐  acquire  ┌─────────────────┐
//! │ TraySimulator ├──────────►│  BoxWorker  ├──────────►│ StationResource │
//! │               │  joins    │  (x3/tray)  │           │  Fill / Seal    │
//! └───────┬───────┘           └──────┬──────┘           └─────────────────┘
//!         │ LoadAL/UnloadAL          │ append
//!         ▼                          ▼
//! ┌──────────────────────────────────────────┐  serialize  ┌──────────┐
//! │                 EventLog                 ├────────────►│ LogTable │
//! └──────────────────────────────────────────┘             └────┬─────┘
//!                                                               │
//!                                          ┌────────────────────┴─┐
//!                                          │    NoiseInjector     │
//!                                          └──────────────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod analysis;
pub mod events;
pub mod simulation;
pub mod types;

// Core types and identifiers
pub use types::{
    Activity,
    BatchPosition,
    // Identifiers
    BoxId,
    // Configuration
    ConfigError,
    ConfigValidationError,
    EquipmentId,
    EventCounter,
    NoiseMode,
    RunId,
    SimulationConfig,
    Station,
};

// Event types and functionality
pub use events::{AppendReceipt, EventLog, EventRecord, LogTable, PendingEvent};

// Simulation types and functionality
pub use simulation::{
    BoxWorker, LoggingConfig, NoiseInjector, NoisyVariant, RunManifest, RunStatistics,
    SimulationContext, SimulationError, SimulationResult, SimulationRun, StationGuard,
    StationResource, TraySimulator, TrayState,
};

// Analysis
pub use analysis::{verify_log, LogReport, LogViolation, ViolationKind};
