//! Configuration structures for the assembly-line simulator
//!
//! A run is configured in three layers: built-in defaults, an optional JSON
//! file, then command line flags. Line geometry (tray size, steps per box,
//! timestamp format) is fixed in [`line`] and not configurable.

use super::{EquipmentId, NoiseMode};
use chrono::NaiveDateTime;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed assembly-line constants
pub mod line {
    /// Boxes loaded onto the line per tray
    pub const TRAY_SIZE: usize = 3;

    /// Steps in a single box itinerary
    pub const STEPS_PER_BOX: usize = 6;

    /// Rows one tray contributes to the log (LoadAL + 3 x 6 + UnloadAL)
    pub const ROWS_PER_TRAY: usize = TRAY_SIZE * STEPS_PER_BOX + 2;

    /// Simulated seconds each logged step advances a clock
    pub const STEP_SECONDS: i64 = 1;

    /// Offset between the starting clocks of consecutive boxes in a tray
    pub const WORKER_STAGGER_SECONDS: i64 = 6;

    /// Timestamp format of the persisted log
    pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

    /// Default value of the `log` column
    pub const DEFAULT_LOG_TAG: &str = "GeneratedExample";

    /// Default corruption rates for the noisy variants
    pub const DEFAULT_NOISE_RATES: [f64; 4] = [0.01, 0.02, 0.05, 0.10];
}

/// Command line flags; every value is optional and overrides the file
#[derive(Debug, Clone, Parser)]
#[command(
    name = "box-process-simulator",
    version = "0.1.0",
    about = "Box Process Simulator - Generates synthetic assembly-line event logs",
    long_about = "Generates event logs of boxes moving tray by tray through a shared fill station and seal station, then derives corrupted variants of the log for process-mining robustness tests.

EXAMPLES:
    # Generate 500 boxes and four noisy variants into ./box_process_data
    box-process-simulator

    # Generate 1500 boxes as dataset 3 with a fixed seed
    box-process-simulator --box-count 1500 --dataset-number 3 --seed 42

    # Only corrupt an existing log
    box-process-simulator --noise-input box_process_data/event_data_generated_4.csv

    # Generate configuration template
    box-process-simulator --print-config > my-config.json

CONFIGURATION:
    Configuration can be provided via:
    1. Command line arguments (highest priority)
    2. Configuration file (--config flag)
    3. Default values (lowest priority)

    Supported configuration file formats: JSON (.json)"
)]
pub struct CliArgs {
    /// JSON file layered between defaults and flags
    #[arg(
        short,
        long,
        help = "Configuration file path (JSON format)",
        long_help = "Path to a JSON configuration file. CLI arguments will override file settings."
    )]
    pub config: Option<String>,

    /// Number of boxes to simulate
    #[arg(
        long,
        help = "Number of boxes to simulate",
        long_help = "Total number of boxes to push through the line. Rounded down to whole trays of 3. Must be at least 3. Default: 500"
    )]
    pub box_count: Option<usize>,

    /// Dataset number used in output file names
    #[arg(long, help = "Dataset number used in output file names")]
    pub dataset_number: Option<u32>,

    /// Directory receiving the generated tables
    #[arg(short, long, help = "Output directory for generated tables")]
    pub output_dir: Option<String>,

    /// Simulated start time
    #[arg(
        long,
        help = "Simulated start time (DD/MM/YYYY HH:MM:SS)",
        long_help = "Simulated time of the first LoadAL event, formatted DD/MM/YYYY HH:MM:SS. Default: 01/10/2024 09:00:00"
    )]
    pub start_time: Option<String>,

    /// Equipment identifiers trays draw from
    #[arg(long, value_delimiter = ',', help = "Comma separated equipment id pool")]
    pub equipment_ids: Option<Vec<u32>>,

    /// Value of the `log` column
    #[arg(long, help = "Tag written to the log column")]
    pub log_tag: Option<String>,

    /// Seed for every random draw of the run
    #[arg(long, help = "Random seed for reproducible results")]
    pub seed: Option<u64>,

    /// Corruption rates for noisy variants
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma separated corruption rates (0.0-1.0)",
        long_help = "Corruption rates, one noisy variant per rate. Range: 0.0-1.0. Default: 0.01,0.02,0.05,0.1"
    )]
    pub noise_rates: Option<Vec<f64>>,

    /// Relationship between masks of different rates
    #[arg(long, help = "Noise mode (independent or nested)")]
    pub noise_mode: Option<String>,

    /// Skip noise injection
    #[arg(long, help = "Do not write noisy variants")]
    pub no_noise: bool,

    /// Existing log to corrupt instead of generating a new one
    #[arg(long, help = "Corrupt an existing log instead of simulating")]
    pub noise_input: Option<String>,

    /// Verify structural properties of the generated log
    #[arg(long, help = "Verify the generated log before writing noisy variants")]
    pub verify: bool,

    /// Log at info level
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Directory for rolling JSON log files
    #[arg(long, help = "Also write JSON logs to daily rolling files in this directory")]
    pub log_dir: Option<String>,

    /// Emit console logs as JSON lines
    #[arg(long, help = "Emit console logs as JSON lines")]
    pub log_json: bool,

    /// Disable colored console logs
    #[arg(long, help = "Disable ANSI colors in console logs")]
    pub no_color: bool,

    /// Explicit tracing filter directive
    #[arg(
        long,
        help = "Tracing filter directive (overrides RUST_LOG and -v/-d)",
        long_help = "Tracing filter directive such as 'box_process_simulator::simulation=trace'. Overrides RUST_LOG and the --verbose/--debug levels."
    )]
    pub log_filter: Option<String>,

    /// Validate and print the configuration, then stop
    #[arg(long, help = "Validate configuration without running simulation")]
    pub dry_run: bool,

    /// Print the default configuration as JSON, then stop
    #[arg(long, help = "Print default configuration in JSON format and exit")]
    pub print_config: bool,
}

/// JSON configuration file; absent keys keep their defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Number of boxes to simulate
    pub box_count: Option<usize>,

    /// Dataset number used in output file names
    pub dataset_number: Option<u32>,

    /// Directory receiving the generated tables
    pub output_directory: Option<String>,

    /// Simulated start time
    pub start_time: Option<NaiveDateTime>,

    /// Equipment identifiers trays draw from
    pub equipment_ids: Option<Vec<EquipmentId>>,

    /// Value of the `log` column
    pub log_tag: Option<String>,

    /// Seed for every random draw of the run
    pub seed: Option<u64>,

    /// Whether to write noisy variants
    pub inject_noise: Option<bool>,

    /// Corruption rates for noisy variants
    pub noise_rates: Option<Vec<f64>>,

    /// Relationship between masks of different rates
    pub noise_mode: Option<NoiseMode>,

    /// Existing log to corrupt instead of generating a new one
    pub noise_input: Option<String>,

    /// Verify structural properties of the generated log
    pub verify: Option<bool>,
}

/// Configuration for the assembly-line simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of boxes to simulate (rounded down to whole trays)
    pub box_count: usize,

    /// Dataset number used in output file names
    pub dataset_number: u32,

    /// Directory receiving the generated tables
    pub output_directory: String,

    /// Simulated time of the first LoadAL event
    pub start_time: NaiveDateTime,

    /// Equipment identifiers trays draw from
    pub equipment_ids: Vec<EquipmentId>,

    /// Value of the `log` column
    pub log_tag: String,

    /// Seed for every random draw of the run
    pub seed: Option<u64>,

    /// Whether to write noisy variants
    pub inject_noise: bool,

    /// Corruption rates for noisy variants
    pub noise_rates: Vec<f64>,

    /// Relationship between masks of different rates
    pub noise_mode: NoiseMode,

    /// Existing log to corrupt instead of generating a new one
    pub noise_input: Option<String>,

    /// Verify structural properties of the generated log
    pub verify: bool,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `--config` names a missing file
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// The file exists but could not be read
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Extension other than `.json`
    #[error("Unsupported configuration file format: {0} (supported: .json)")]
    UnsupportedFormat(String),

    /// Start time could not be parsed
    #[error("Invalid start time '{0}' (expected DD/MM/YYYY HH:MM:SS)")]
    InvalidStartTime(String),

    /// Noise mode could not be parsed
    #[error("{0}")]
    InvalidNoiseMode(String),
}

/// Values that parse but cannot drive a run
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// Box count cannot fill a single tray
    #[error("Box count must be at least 3 to fill one tray, got {0}")]
    InvalidBoxCount(usize),

    /// Equipment pool is empty
    #[error("Equipment id pool must not be empty")]
    EmptyEquipmentPool,

    /// Output directory is empty
    #[error("Output directory must not be empty")]
    EmptyOutputDirectory,

    /// Log tag is empty
    #[error("Log tag must not be empty")]
    EmptyLogTag,

    /// Noise requested without any rate
    #[error("Noise injection is enabled but no noise rates are configured")]
    NoNoiseRates,

    /// Noise rate outside [0, 1]
    #[error("Invalid noise rate {rate} (must be between 0.0 and 1.0)")]
    InvalidNoiseRate {
        /// The invalid rate
        rate: f64,
    },
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            box_count: 500,
            dataset_number: 1,
            output_directory: "box_process_data".to_string(),
            start_time: default_start_time(),
            equipment_ids: EquipmentId::default_pool(),
            log_tag: line::DEFAULT_LOG_TAG.to_string(),
            seed: None,
            inject_noise: true,
            noise_rates: line::DEFAULT_NOISE_RATES.to_vec(),
            noise_mode: NoiseMode::default(),
            noise_input: None,
            verify: false,
        }
    }
}

/// 01/10/2024 09:00:00
fn default_start_time() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 10, 1)
        .and_then(|date| date.and_hms_opt(9, 0, 0))
        .unwrap_or_default()
}

/// Parse a start time in the log timestamp format, falling back to ISO 8601
pub fn parse_start_time(value: &str) -> Result<NaiveDateTime, ConfigError> {
    NaiveDateTime::parse_from_str(value, line::TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| ConfigError::InvalidStartTime(value.to_string()))
}

impl SimulationConfig {
    /// Layer already parsed flags over the file (if any) and defaults
    pub fn from_cli_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(config_path) = &args.config {
            config = Self::from_file(config_path)?;
        }

        // CLI takes precedence over the file
        Self::apply_cli_overrides(&mut config, args)?;

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config_file: ConfigFile = serde_json::from_str(&content)?;
                Ok(Self::from_config_file(config_file))
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }

    /// Fill the keys a file left out from the defaults
    fn from_config_file(config_file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            box_count: config_file.box_count.unwrap_or(defaults.box_count),
            dataset_number: config_file.dataset_number.unwrap_or(defaults.dataset_number),
            output_directory: config_file
                .output_directory
                .unwrap_or(defaults.output_directory),
            start_time: config_file.start_time.unwrap_or(defaults.start_time),
            equipment_ids: config_file.equipment_ids.unwrap_or(defaults.equipment_ids),
            log_tag: config_file.log_tag.unwrap_or(defaults.log_tag),
            seed: config_file.seed.or(defaults.seed),
            inject_noise: config_file.inject_noise.unwrap_or(defaults.inject_noise),
            noise_rates: config_file.noise_rates.unwrap_or(defaults.noise_rates),
            noise_mode: config_file.noise_mode.unwrap_or(defaults.noise_mode),
            noise_input: config_file.noise_input.or(defaults.noise_input),
            verify: config_file.verify.unwrap_or(defaults.verify),
        }
    }

    /// Overwrite every value given on the command line
    fn apply_cli_overrides(config: &mut Self, args: CliArgs) -> Result<(), ConfigError> {
        if let Some(value) = args.box_count {
            config.box_count = value;
        }
        if let Some(value) = args.dataset_number {
            config.dataset_number = value;
        }
        if let Some(value) = args.output_dir {
            config.output_directory = value;
        }
        if let Some(value) = args.start_time {
            config.start_time = parse_start_time(&value)?;
        }
        if let Some(values) = args.equipment_ids {
            config.equipment_ids = values.into_iter().map(EquipmentId).collect();
        }
        if let Some(value) = args.log_tag {
            config.log_tag = value;
        }
        if let Some(value) = args.seed {
            config.seed = Some(value);
        }
        if let Some(values) = args.noise_rates {
            config.noise_rates = values;
        }
        if let Some(value) = args.noise_mode {
            config.noise_mode = value.parse().map_err(ConfigError::InvalidNoiseMode)?;
        }
        if args.no_noise {
            config.inject_noise = false;
        }
        if let Some(value) = args.noise_input {
            config.noise_input = Some(value);
        }
        if args.verify {
            config.verify = true;
        }

        Ok(())
    }

    /// Write the full configuration as a reusable JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Pretty JSON used by `--print-config`
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that cannot produce a run
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        // Noise-only runs never load a tray, so the box count is irrelevant there
        if self.noise_input.is_none() && self.box_count < line::TRAY_SIZE {
            return Err(ConfigValidationError::InvalidBoxCount(self.box_count));
        }

        if self.equipment_ids.is_empty() {
            return Err(ConfigValidationError::EmptyEquipmentPool);
        }

        if self.output_directory.trim().is_empty() {
            return Err(ConfigValidationError::EmptyOutputDirectory);
        }

        if self.log_tag.is_empty() {
            return Err(ConfigValidationError::EmptyLogTag);
        }

        if self.inject_noise && self.noise_rates.is_empty() {
            return Err(ConfigValidationError::NoNoiseRates);
        }

        for &rate in &self.noise_rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigValidationError::InvalidNoiseRate { rate });
            }
        }

        Ok(())
    }

    /// Number of complete trays the configured box count yields
    pub fn tray_count(&self) -> usize {
        self.box_count / line::TRAY_SIZE
    }

    /// Box count after rounding down to complete trays
    pub fn effective_box_count(&self) -> usize {
        self.tray_count() * line::TRAY_SIZE
    }

    /// Path of the clean generated log
    pub fn generated_log_path(&self) -> PathBuf {
        Path::new(&self.output_directory)
            .join(format!("event_data_generated_{}.csv", self.dataset_number))
    }

    /// Path of the noisy variant for the rate at `rate_index` (0-based)
    pub fn noise_output_path(&self, rate_index: usize) -> PathBuf {
        Path::new(&self.output_directory).join(format!("event_data_noise_{}.csv", rate_index + 1))
    }

    /// Path of the run manifest
    pub fn manifest_path(&self) -> PathBuf {
        Path::new(&self.output_directory).join(format!("manifest_{}.json", self.dataset_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_config_default() {
        let config = SimulationConfig::default();

        assert_eq!(config.box_count, 500);
        assert_eq!(config.dataset_number, 1);
        assert_eq!(config.output_directory, "box_process_data");
        assert_eq!(
            config.start_time.format(line::TIMESTAMP_FORMAT).to_string(),
            "01/10/2024 09:00:00"
        );
        assert_eq!(config.equipment_ids.len(), 18);
        assert_eq!(config.log_tag, "GeneratedExample");
        assert!(config.seed.is_none());
        assert!(config.inject_noise);
        assert_eq!(config.noise_rates, vec![0.01, 0.02, 0.05, 0.10]);
        assert_eq!(config.noise_mode, NoiseMode::Independent);
        assert!(config.noise_input.is_none());
        assert!(!config.verify);
    }

    #[test]
    fn test_rows_per_tray_constant() {
        assert_eq!(line::ROWS_PER_TRAY, 20);
    }

    #[test]
    fn test_tray_rounding() {
        let config = SimulationConfig { box_count: 500, ..Default::default() };
        assert_eq!(config.tray_count(), 166);
        assert_eq!(config.effective_box_count(), 498);

        let config = SimulationConfig { box_count: 3, ..Default::default() };
        assert_eq!(config.tray_count(), 1);
        assert_eq!(config.effective_box_count(), 3);
    }

    #[test]
    fn test_validation_success() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_box_count() {
        let config = SimulationConfig { box_count: 2, ..Default::default() };
        match config.validate() {
            Err(ConfigValidationError::InvalidBoxCount(2)) => {}
            other => panic!("Expected InvalidBoxCount error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_box_count_ignored_for_noise_only_runs() {
        let config = SimulationConfig {
            box_count: 0,
            noise_input: Some("existing.csv".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_noise_rate() {
        let config = SimulationConfig { noise_rates: vec![0.01, 1.5], ..Default::default() };
        match config.validate() {
            Err(ConfigValidationError::InvalidNoiseRate { rate }) => assert_eq!(rate, 1.5),
            other => panic!("Expected InvalidNoiseRate error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_empty_rates_only_matter_with_noise() {
        let mut config = SimulationConfig { noise_rates: Vec::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigValidationError::NoNoiseRates)));

        config.inject_noise = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_equipment_pool() {
        let config = SimulationConfig { equipment_ids: Vec::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigValidationError::EmptyEquipmentPool)));
    }

    #[test]
    fn test_parse_start_time_formats() {
        let parsed = parse_start_time("02/03/2025 10:11:12").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-03-02 10:11:12");

        let iso = parse_start_time("2025-03-02T10:11:12").unwrap();
        assert_eq!(iso, parsed);

        assert!(matches!(
            parse_start_time("yesterday"),
            Err(ConfigError::InvalidStartTime(_))
        ));
    }

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::try_parse_from([
            "test",
            "--box-count",
            "30",
            "--dataset-number",
            "4",
            "--seed",
            "7",
            "--noise-rates",
            "0.1,0.2",
            "--noise-mode",
            "nested",
            "--equipment-ids",
            "1000,2000",
            "--no-noise",
            "--verify",
        ])
        .unwrap();

        let config = SimulationConfig::from_cli_args(args).unwrap();
        assert_eq!(config.box_count, 30);
        assert_eq!(config.dataset_number, 4);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.noise_rates, vec![0.1, 0.2]);
        assert_eq!(config.noise_mode, NoiseMode::Nested);
        assert_eq!(config.equipment_ids, vec![EquipmentId(1000), EquipmentId(2000)]);
        assert!(!config.inject_noise);
        assert!(config.verify);
        // Untouched fields keep their defaults
        assert_eq!(config.log_tag, "GeneratedExample");
    }

    #[test]
    fn test_cli_invalid_noise_mode() {
        let args = CliArgs::try_parse_from(["test", "--noise-mode", "layered"]).unwrap();
        assert!(matches!(
            SimulationConfig::from_cli_args(args),
            Err(ConfigError::InvalidNoiseMode(_))
        ));
    }

    #[test]
    fn test_config_file_loading() {
        use std::io::Write;
        use tempfile::Builder;

        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        let config_json = r#"{
            "box_count": 1500,
            "dataset_number": 3,
            "start_time": "2024-11-05T08:30:00",
            "equipment_ids": [1111, 2111],
            "noise_mode": "nested",
            "seed": 12345
        }"#;

        temp_file.write_all(config_json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = SimulationConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.box_count, 1500);
        assert_eq!(config.dataset_number, 3);
        assert_eq!(
            config.start_time.format(line::TIMESTAMP_FORMAT).to_string(),
            "05/11/2024 08:30:00"
        );
        assert_eq!(config.equipment_ids, vec![EquipmentId(1111), EquipmentId(2111)]);
        assert_eq!(config.noise_mode, NoiseMode::Nested);
        assert_eq!(config.seed, Some(12345));
        // Missing fields fall back to defaults
        assert_eq!(config.noise_rates, vec![0.01, 0.02, 0.05, 0.10]);
    }

    #[test]
    fn test_config_file_unsupported_extension() {
        let temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            SimulationConfig::from_file(temp_file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_config_file_not_found() {
        assert!(matches!(
            SimulationConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_output_paths() {
        let config = SimulationConfig {
            output_directory: "out".to_string(),
            dataset_number: 2,
            ..Default::default()
        };
        assert_eq!(config.generated_log_path(), PathBuf::from("out/event_data_generated_2.csv"));
        assert_eq!(config.noise_output_path(0), PathBuf::from("out/event_data_noise_1.csv"));
        assert_eq!(config.noise_output_path(3), PathBuf::from("out/event_data_noise_4.csv"));
        assert_eq!(config.manifest_path(), PathBuf::from("out/manifest_2.json"));
    }

    #[test]
    fn test_simulation_config_serialization() {
        let config = SimulationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SimulationConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.box_count, deserialized.box_count);
        assert_eq!(config.start_time, deserialized.start_time);
        assert_eq!(config.equipment_ids, deserialized.equipment_ids);
        assert_eq!(config.noise_mode, deserialized.noise_mode);
    }
}
