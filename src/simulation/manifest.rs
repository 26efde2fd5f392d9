//! Run manifest
//!
//! A JSON record written next to the generated tables describing what a run
//! produced and how to reproduce it.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::simulation::{NoisyVariant, RunStatistics, SimulationResult};
use crate::types::{NoiseMode, RunId, SimulationConfig};

/// Generation half of a manifest (absent for noise-only runs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Box count asked for
    pub requested_boxes: usize,
    /// Boxes simulated after rounding to whole trays
    pub effective_boxes: usize,
    /// Trays processed
    pub trays: usize,
    /// Simulated time of the first event
    pub simulated_start: NaiveDateTime,
    /// Simulated time after the last event
    pub simulated_end: NaiveDateTime,
}

/// One noisy table written by the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestVariant {
    /// Corruption rate
    pub rate: f64,
    /// File the variant was written to
    pub path: PathBuf,
    /// Cells turned into missing values
    pub corrupted_cells: usize,
    /// Cells that could have been corrupted
    pub eligible_cells: usize,
}

/// Description of everything a run wrote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Unique run identifier
    pub run_id: RunId,
    /// Wall-clock time the manifest was created
    pub generated_at: DateTime<Utc>,
    /// Seed used, if the run was deterministic
    pub seed: Option<u64>,
    /// Dataset number in the output file names
    pub dataset_number: u32,
    /// Clean log: written by this run, or read for a noise-only run
    pub log_path: PathBuf,
    /// Data rows of the clean log
    pub rows: usize,
    /// Present when this run simulated the log
    pub generation: Option<GenerationSummary>,
    /// Mask relationship, when noise was injected
    pub noise_mode: Option<NoiseMode>,
    /// Noisy variants, in rate order
    pub noise_variants: Vec<ManifestVariant>,
}

impl RunManifest {
    /// Start a manifest for a run over the log at `log_path`
    pub fn new(config: &SimulationConfig, log_path: impl Into<PathBuf>, rows: usize) -> Self {
        Self {
            run_id: RunId::new(),
            generated_at: Utc::now(),
            seed: config.seed,
            dataset_number: config.dataset_number,
            log_path: log_path.into(),
            rows,
            generation: None,
            noise_mode: None,
            noise_variants: Vec::new(),
        }
    }

    /// Attach the generation summary of a simulated run
    pub fn with_generation(mut self, statistics: &RunStatistics) -> Self {
        self.generation = Some(GenerationSummary {
            requested_boxes: statistics.requested_boxes,
            effective_boxes: statistics.boxes,
            trays: statistics.trays,
            simulated_start: statistics.simulated_start,
            simulated_end: statistics.simulated_end,
        });
        self
    }

    /// Attach the written noise variants; `paths` pairs with `variants`
    pub fn with_noise(
        mut self,
        mode: NoiseMode,
        variants: &[NoisyVariant],
        paths: &[PathBuf],
    ) -> Self {
        self.noise_mode = Some(mode);
        self.noise_variants = variants
            .iter()
            .zip(paths)
            .map(|(variant, path)| ManifestVariant {
                rate: variant.rate,
                path: path.clone(),
                corrupted_cells: variant.corrupted_cells,
                eligible_cells: variant.eligible_cells,
            })
            .collect();
        self
    }

    /// Write the manifest as pretty JSON
    #[instrument(skip(self, path), fields(run_id = %self.run_id, path = %path.as_ref().display()))]
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> SimulationResult<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!("Manifest written");
        Ok(())
    }

    /// Read a manifest back
    pub fn read_from<P: AsRef<Path>>(path: P) -> SimulationResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
