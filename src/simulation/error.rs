//! Errors raised while simulating, reading or corrupting logs
//!
//! Every failure is fatal to a run: a partially written log is never valid.

use thiserror::Error;

/// Failure of a simulator operation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The run was configured with unusable values
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    /// The finished log does not hold what the trays should have produced
    #[error("Tray simulation produced an inconsistent log: {0}")]
    EventGenerationError(String),

    /// A box worker did not run to completion
    #[error("Box worker failed: {0}")]
    WorkerFailed(String),

    /// A log table is malformed
    #[error("Invalid event log: {0}")]
    InvalidLog(String),

    /// Noise injection failed
    #[error("Noise injection failed: {0}")]
    NoiseError(String),

    /// Reading or writing a table or manifest failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Manifest or report JSON could not be produced or read
    #[error("JSON error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<crate::types::ConfigValidationError> for SimulationError {
    fn from(error: crate::types::ConfigValidationError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl From<crate::types::ConfigError> for SimulationError {
    fn from(error: crate::types::ConfigError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl SimulationError {
    /// Configuration rejected by the simulator itself
    pub fn configuration_error(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Log inconsistent with the trays that produced it
    pub fn event_generation_error(msg: impl Into<String>) -> Self {
        Self::EventGenerationError(msg.into())
    }

    /// Create a worker failure error
    pub fn worker_failed(msg: impl Into<String>) -> Self {
        Self::WorkerFailed(msg.into())
    }

    /// Create an invalid log error
    pub fn invalid_log(msg: impl Into<String>) -> Self {
        Self::InvalidLog(msg.into())
    }

    /// Create a noise injection error
    pub fn noise_error(msg: impl Into<String>) -> Self {
        Self::NoiseError(msg.into())
    }

    /// Short category shown next to the message
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::ConfigurationError(_) => "Configuration",
            SimulationError::EventGenerationError(_) => "Event Generation",
            SimulationError::WorkerFailed(_) => "Box Worker",
            SimulationError::InvalidLog(_) => "Event Log",
            SimulationError::NoiseError(_) => "Noise Injection",
            SimulationError::IoError(_) => "IO",
            SimulationError::SerializationError(_) => "JSON",
        }
    }
}

/// Result of a simulator operation
pub type SimulationResult<T> = Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfigError, ConfigValidationError};
    use std::io;

    #[test]
    fn test_messages_carry_context() {
        let error = SimulationError::configuration_error("equipment id pool is empty");
        assert_eq!(error.to_string(), "Invalid configuration: equipment id pool is empty");

        let error = SimulationError::worker_failed("box b4 panicked");
        assert_eq!(error.to_string(), "Box worker failed: box b4 panicked");
    }

    #[test]
    fn test_config_errors_become_configuration_errors() {
        let error: SimulationError = ConfigValidationError::InvalidBoxCount(1).into();
        assert_eq!(error.category(), "Configuration");
        assert!(error.to_string().contains("at least 3"));

        let error: SimulationError = ConfigError::InvalidStartTime("noon".to_string()).into();
        assert_eq!(error.category(), "Configuration");
        assert!(error.to_string().contains("noon"));
    }

    #[test]
    fn test_io_and_json_errors_convert() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "event_data_generated_1.csv");
        let error: SimulationError = missing.into();
        assert!(matches!(error, SimulationError::IoError(_)));
        assert_eq!(error.category(), "IO");

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: SimulationError = json.into();
        assert_eq!(error.category(), "JSON");
    }

    #[test]
    fn test_every_category_is_distinct() {
        let categories = [
            SimulationError::configuration_error("").category(),
            SimulationError::event_generation_error("").category(),
            SimulationError::worker_failed("").category(),
            SimulationError::invalid_log("").category(),
            SimulationError::noise_error("").category(),
        ];
        for (i, a) in categories.iter().enumerate() {
            for b in &categories[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
