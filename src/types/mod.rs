//! Core types and identifiers for the assembly-line simulator
//!
//! - **Identifiers**: box, equipment, event counter, and run identifiers
//! - **Enums**: activities, batch positions, stations, and noise modes
//! - **Configuration**: defaults, JSON file and CLI layering plus validation
//!
//! # Usage Example
//!
//! ```rust
//! use box_process_simulator::types::*;
//!
//! let box_id = BoxId::new(1);
//! assert_eq!(box_id.to_string(), "b1");
//!
//! assert_eq!(Activity::Fill.station(), Some(Station::Fill));
//!
//! let config = SimulationConfig {
//!     box_count: 30,
//!     seed: Some(7),
//!     ..Default::default()
//! };
//! assert_eq!(config.tray_count(), 10);
//! ```

pub mod config;
pub mod enums;
pub mod identifiers;

pub use config::*;
pub use enums::*;
pub use identifiers::*;
