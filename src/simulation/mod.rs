//! Simulation of the assembly line and post-processing of its log
//!
//! This module contains the stations, box workers, tray driver, noise
//! injector, statistics, run manifest, logging setup and error handling.
//!
//! # Overview
//!
//! - **StationResource**: mutual-exclusion guard for the fill and seal stations
//! - **BoxWorker**: one box's six-step pass through both stations
//! - **TraySimulator**: loads trays of three boxes, runs their workers, unloads
//! - **NoiseInjector**: derives corrupted copies of a finished log
//! - **RunStatistics** / **RunManifest**: what a run produced
//! - **SimulationError**: error handling for every simulation operation
//!
//! # Usage Example
//!
//! ```rust
//! use box_process_simulator::simulation::*;
//! use box_process_simulator::types::*;
//!
//! let config = SimulationConfig {
//!     box_count: 6,
//!     seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let mut simulator = TraySimulator::new(config.clone()).unwrap();
//! let run = simulator.run().unwrap();
//! assert_eq!(run.log.len(), 40);
//!
//! let mut injector = NoiseInjector::from_config(&config).unwrap();
//! let variants = injector.inject(&run.log.to_table()).unwrap();
//! assert_eq!(variants.len(), 4);
//! ```

pub mod error;
pub mod logging;
pub mod manifest;
pub mod noise;
pub mod station;
pub mod statistics;
pub mod tray;
pub mod worker;

// Re-export all public types for convenience
pub use error::*;
pub use logging::*;
pub use manifest::*;
pub use noise::*;
pub use station::*;
pub use statistics::*;
pub use tray::*;
pub use worker::*;
