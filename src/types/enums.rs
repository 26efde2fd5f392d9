//! Enumeration types for the assembly-line simulator
//!
//! This module contains all enumeration types used throughout the simulation system,
//! including line activities, batch positions, stations, and noise injection modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Activities recorded on the assembly line
///
/// The wire names (`Display`/`FromStr`) are the exact strings written to the
/// `activity` column of the persisted log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Activity {
    /// A tray of three boxes is loaded onto the assembly line
    LoadAL,
    /// A box is loaded into the fill station
    LoadFS,
    /// The fill station fills the box it currently holds
    Fill,
    /// A box is unloaded from the fill station
    UnloadFS,
    /// A box is loaded into the seal station
    LoadSS,
    /// The seal station seals the box it currently holds
    Seal,
    /// A box is unloaded from the seal station
    UnloadSS,
    /// The tray is unloaded from the assembly line
    UnloadAL,
}

impl Activity {
    /// Every activity, in the order a single tray emits them for one box
    pub const ALL: [Activity; 8] = [
        Activity::LoadAL,
        Activity::LoadFS,
        Activity::Fill,
        Activity::UnloadFS,
        Activity::LoadSS,
        Activity::Seal,
        Activity::UnloadSS,
        Activity::UnloadAL,
    ];

    /// The fixed six-step itinerary every box follows
    pub const ITINERARY: [Activity; 6] = [
        Activity::LoadFS,
        Activity::Fill,
        Activity::UnloadFS,
        Activity::LoadSS,
        Activity::Seal,
        Activity::UnloadSS,
    ];

    /// Station whose occupancy this activity requires, if any
    pub fn station(&self) -> Option<Station> {
        match self {
            Activity::LoadFS | Activity::Fill | Activity::UnloadFS => Some(Station::Fill),
            Activity::LoadSS | Activity::Seal | Activity::UnloadSS => Some(Station::Seal),
            Activity::LoadAL | Activity::UnloadAL => None,
        }
    }

    /// Whether this activity is a tray-level boundary event
    pub fn is_tray_boundary(&self) -> bool {
        matches!(self, Activity::LoadAL | Activity::UnloadAL)
    }

    /// Whether the record for this activity carries the box identifier
    pub fn records_box_id(&self) -> bool {
        matches!(self, Activity::Seal)
    }

    /// Whether the record for this activity carries the batch position
    pub fn records_batch_position(&self) -> bool {
        matches!(
            self,
            Activity::LoadFS | Activity::UnloadFS | Activity::LoadSS | Activity::UnloadSS
        )
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::LoadAL => write!(f, "LoadAL"),
            Activity::LoadFS => write!(f, "LoadFS"),
            Activity::Fill => write!(f, "Fill"),
            Activity::UnloadFS => write!(f, "UnloadFS"),
            Activity::LoadSS => write!(f, "LoadSS"),
            Activity::Seal => write!(f, "Seal"),
            Activity::UnloadSS => write!(f, "UnloadSS"),
            Activity::UnloadAL => write!(f, "UnloadAL"),
        }
    }
}

impl FromStr for Activity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LoadAL" => Ok(Activity::LoadAL),
            "LoadFS" => Ok(Activity::LoadFS),
            "Fill" => Ok(Activity::Fill),
            "UnloadFS" => Ok(Activity::UnloadFS),
            "LoadSS" => Ok(Activity::LoadSS),
            "Seal" => Ok(Activity::Seal),
            "UnloadSS" => Ok(Activity::UnloadSS),
            "UnloadAL" => Ok(Activity::UnloadAL),
            _ => Err(format!("Unknown activity: {}", s)),
        }
    }
}

/// Slot labels distinguishing the three boxes of a tray
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPosition {
    /// Slot `x`
    X,
    /// Slot `y`
    Y,
    /// Slot `z`
    Z,
}

impl BatchPosition {
    /// All three slot labels; shuffled once per tray
    pub const ALL: [BatchPosition; 3] = [BatchPosition::X, BatchPosition::Y, BatchPosition::Z];
}

impl fmt::Display for BatchPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchPosition::X => write!(f, "x"),
            BatchPosition::Y => write!(f, "y"),
            BatchPosition::Z => write!(f, "z"),
        }
    }
}

impl FromStr for BatchPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x" => Ok(BatchPosition::X),
            "y" => Ok(BatchPosition::Y),
            "z" => Ok(BatchPosition::Z),
            _ => Err(format!("Unknown batch position: {}", s)),
        }
    }
}

/// Physical stations a box passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Station {
    /// Fill station (LoadFS, Fill, UnloadFS)
    Fill,
    /// Seal station (LoadSS, Seal, UnloadSS)
    Seal,
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Station::Fill => write!(f, "FillStation"),
            Station::Seal => write!(f, "SealStation"),
        }
    }
}

/// How random masks relate across corruption rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoiseMode {
    /// A fresh uniform draw per rate; variants are not subsets of one another
    #[default]
    Independent,
    /// One uniform draw shared by all rates; lower-rate corruption is a subset
    /// of higher-rate corruption
    Nested,
}

impl fmt::Display for NoiseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseMode::Independent => write!(f, "independent"),
            NoiseMode::Nested => write!(f, "nested"),
        }
    }
}

impl FromStr for NoiseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "independent" => Ok(NoiseMode::Independent),
            "nested" => Ok(NoiseMode::Nested),
            _ => Err(format!("Unknown noise mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_wire_names_round_trip() {
        for activity in Activity::ALL {
            let name = activity.to_string();
            assert_eq!(name.parse::<Activity>().unwrap(), activity);
        }
        assert!("fill".parse::<Activity>().is_err());
        assert!("Unknown".parse::<Activity>().is_err());
    }

    #[test]
    fn test_activity_station_membership() {
        assert_eq!(Activity::LoadFS.station(), Some(Station::Fill));
        assert_eq!(Activity::Fill.station(), Some(Station::Fill));
        assert_eq!(Activity::UnloadFS.station(), Some(Station::Fill));
        assert_eq!(Activity::LoadSS.station(), Some(Station::Seal));
        assert_eq!(Activity::Seal.station(), Some(Station::Seal));
        assert_eq!(Activity::UnloadSS.station(), Some(Station::Seal));
        assert_eq!(Activity::LoadAL.station(), None);
        assert_eq!(Activity::UnloadAL.station(), None);
    }

    #[test]
    fn test_activity_field_rules() {
        assert!(Activity::Seal.records_box_id());
        assert!(!Activity::Seal.records_batch_position());

        // Fill carries neither identifier
        assert!(!Activity::Fill.records_box_id());
        assert!(!Activity::Fill.records_batch_position());

        let positioned =
            [Activity::LoadFS, Activity::UnloadFS, Activity::LoadSS, Activity::UnloadSS];
        for activity in positioned {
            assert!(activity.records_batch_position());
            assert!(!activity.records_box_id());
        }

        assert!(Activity::LoadAL.is_tray_boundary());
        assert!(Activity::UnloadAL.is_tray_boundary());
        assert!(!Activity::Seal.is_tray_boundary());
    }

    #[test]
    fn test_itinerary_is_station_ordered() {
        let stations: Vec<_> = Activity::ITINERARY.iter().map(|a| a.station()).collect();
        assert_eq!(&stations[..3], &[Some(Station::Fill); 3]);
        assert_eq!(&stations[3..], &[Some(Station::Seal); 3]);
    }

    #[test]
    fn test_batch_position_display_and_parse() {
        assert_eq!(BatchPosition::X.to_string(), "x");
        assert_eq!(BatchPosition::Z.to_string(), "z");
        assert_eq!("Y".parse::<BatchPosition>().unwrap(), BatchPosition::Y);
        assert!("w".parse::<BatchPosition>().is_err());
    }

    #[test]
    fn test_noise_mode_parse_and_default() {
        assert_eq!(NoiseMode::default(), NoiseMode::Independent);
        assert_eq!("nested".parse::<NoiseMode>().unwrap(), NoiseMode::Nested);
        assert_eq!("Independent".parse::<NoiseMode>().unwrap(), NoiseMode::Independent);
        assert!("layered".parse::<NoiseMode>().is_err());
    }

    #[test]
    fn test_enum_serialization() {
        let json = serde_json::to_string(&BatchPosition::Y).unwrap();
        assert_eq!(json, "\"y\"");
        let deserialized: BatchPosition = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, BatchPosition::Y);

        let json = serde_json::to_string(&NoiseMode::Nested).unwrap();
        assert_eq!(json, "\"nested\"");

        let json = serde_json::to_string(&Activity::UnloadSS).unwrap();
        let deserialized: Activity = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, Activity::UnloadSS);
    }
}
