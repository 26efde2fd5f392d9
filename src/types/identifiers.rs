//! Identifier types for the assembly-line simulator
//!
//! This module contains the identifier types for boxes, equipment, event counters,
//! and simulation runs used throughout the simulation system.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Identifier for a box, rendered as `b<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(pub u64);

impl BoxId {
    /// Create a box ID from its 1-based running number
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    /// Running number of this box
    pub fn number(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl std::str::FromStr for BoxId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('b')
            .and_then(|n| n.parse::<u64>().ok())
            .map(BoxId)
            .ok_or_else(|| format!("Invalid box id: {}", s))
    }
}

impl Serialize for BoxId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BoxId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Equipment (tray carrier) identifier shared by every event of a tray
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentId(pub u32);

impl EquipmentId {
    /// The equipment pool trays draw from by default
    pub fn default_pool() -> Vec<EquipmentId> {
        [
            1000, 2000, 3000, 4000, 5000, 6000, 7000, 8000, 9000, 1111, 2111, 3111, 4111, 5111,
            6111, 7111, 8111, 9111,
        ]
        .into_iter()
        .map(EquipmentId)
        .collect()
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value of the run-wide identifier counter (1-based)
///
/// One counter value names both the event (`e<n>`) and its timestamp
/// variable (`t<n>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCounter(pub u64);

impl EventCounter {
    /// Rendered `eventId` column value
    pub fn event_id(&self) -> String {
        format!("e{}", self.0)
    }

    /// Rendered `timestampVar` column value
    pub fn time_var(&self) -> String {
        format!("t{}", self.0)
    }
}

impl fmt::Display for EventCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new random run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RUN_{}", self.0.simple())
    }
}

impl Serialize for RunId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("RUN_").unwrap_or(&s);
        let uuid = Uuid::parse_str(raw).map_err(serde::de::Error::custom)?;
        Ok(RunId(uuid))
    }
}
