//! Noise injection for degraded test fixtures
//!
//! The [`NoiseInjector`] turns a clean log table into one corrupted copy per
//! configured rate. Every cell outside the `box` column is replaced by a
//! missing value when its uniform draw falls below the rate.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

use crate::events::{LogTable, BOX_COLUMN};
use crate::simulation::{
    NoiseStatistics, NoiseVariantStatistics, SimulationError, SimulationResult,
};
use crate::types::{NoiseMode, SimulationConfig};

/// One corrupted copy of a log
#[derive(Debug, Clone, PartialEq)]
pub struct NoisyVariant {
    /// Rate the variant was produced at
    pub rate: f64,
    /// The corrupted table
    pub table: LogTable,
    /// Cells outside the protected column
    pub eligible_cells: usize,
    /// Cells that held a value and now hold none
    pub corrupted_cells: usize,
}

impl NoisyVariant {
    /// Counters of this variant
    pub fn statistics(&self) -> NoiseVariantStatistics {
        NoiseVariantStatistics {
            rate: self.rate,
            eligible_cells: self.eligible_cells,
            corrupted_cells: self.corrupted_cells,
        }
    }
}

/// Produces corrupted variants of a log table
#[derive(Debug)]
pub struct NoiseInjector {
    rates: Vec<f64>,
    mode: NoiseMode,
    rng: StdRng,
}

impl NoiseInjector {
    /// Create an injector; every rate must lie in `[0, 1]`
    pub fn new(rates: Vec<f64>, mode: NoiseMode, seed: Option<u64>) -> SimulationResult<Self> {
        if let Some(rate) = rates.iter().find(|rate| !(0.0..=1.0).contains(*rate)) {
            return Err(SimulationError::noise_error(format!(
                "rate {} is outside 0.0-1.0",
                rate
            )));
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self { rates, mode, rng })
    }

    /// Create an injector from the run configuration
    pub fn from_config(config: &SimulationConfig) -> SimulationResult<Self> {
        Self::new(config.noise_rates.clone(), config.noise_mode, config.seed)
    }

    /// Configured rates, in output order
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Mask relationship across rates
    pub fn mode(&self) -> NoiseMode {
        self.mode
    }

    /// Produce one variant per configured rate
    #[instrument(skip(self, table), fields(rows = table.row_count(), mode = %self.mode))]
    pub fn inject(&mut self, table: &LogTable) -> SimulationResult<Vec<NoisyVariant>> {
        let protected = table.column_index(BOX_COLUMN).ok_or_else(|| {
            SimulationError::invalid_log(format!("table has no '{}' column", BOX_COLUMN))
        })?;

        let cells = table.row_count() * table.column_count();
        let shared = match self.mode {
            NoiseMode::Nested => Some(self.draw_matrix(cells)),
            NoiseMode::Independent => None,
        };

        let mut variants = Vec::with_capacity(self.rates.len());
        for rate in self.rates.clone() {
            let draws = match &shared {
                Some(draws) => draws.clone(),
                None => self.draw_matrix(cells),
            };
            let variant = corrupt(table, rate, protected, &draws);
            debug!(
                rate,
                corrupted = variant.corrupted_cells,
                eligible = variant.eligible_cells,
                "Noise variant produced"
            );
            variants.push(variant);
        }

        Ok(variants)
    }

    fn draw_matrix(&mut self, cells: usize) -> Vec<f64> {
        (0..cells).map(|_| self.rng.gen::<f64>()).collect()
    }
}

/// Replace every unprotected cell whose draw is below `rate` with a missing
/// value; `draws` is row-major over the table
fn corrupt(table: &LogTable, rate: f64, protected: usize, draws: &[f64]) -> NoisyVariant {
    let columns = table.column_count();
    let mut corrupted_cells = 0;

    let noisy = table.map_cells(|row, column, cell| {
        if column == protected || draws[row * columns + column] >= rate {
            return cell.clone();
        }
        if cell.is_some() {
            corrupted_cells += 1;
        }
        None
    });

    NoisyVariant {
        rate,
        table: noisy,
        eligible_cells: table.row_count() * columns.saturating_sub(1),
        corrupted_cells,
    }
}

/// Write variants as `event_data_noise_<k>.csv`, `k` being the 1-based
/// position of the rate
pub fn write_variants(
    variants: &[NoisyVariant],
    config: &SimulationConfig,
) -> SimulationResult<Vec<PathBuf>> {
    variants
        .iter()
        .enumerate()
        .map(|(index, variant)| {
            let path = config.noise_output_path(index);
            write_variant(variant, &path)?;
            Ok(path)
        })
        .collect()
}

#[instrument(skip(variant), fields(rate = variant.rate))]
fn write_variant(variant: &NoisyVariant, path: &Path) -> SimulationResult<()> {
    variant.table.write_to(path)?;
    info!(
        "Wrote noise variant {} ({} cells missing)",
        path.display(),
        variant.corrupted_cells
    );
    Ok(())
}

/// Summary of a set of variants
pub fn noise_statistics(mode: NoiseMode, variants: &[NoisyVariant]) -> NoiseStatistics {
    NoiseStatistics { mode, variants: variants.iter().map(NoisyVariant::statistics).collect() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LOG_COLUMNS;

    fn table(rows: usize) -> LogTable {
        let mut table = LogTable::with_log_header();
        for i in 0..rows {
            let row = LOG_COLUMNS
                .iter()
                .enumerate()
                .map(|(c, _)| Some(format!("{}-{}", i, c)))
                .collect();
            table.push_row(row).unwrap();
        }
        table
    }

    fn missing(table: &LogTable) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for (r, row) in table.rows().iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_none() {
                    cells.push((r, c));
                }
            }
        }
        cells
    }

    #[test]
    fn test_zero_rate_returns_identical_table() {
        let input = table(50);
        let mut injector = NoiseInjector::new(vec![0.0], NoiseMode::Independent, Some(1)).unwrap();
        let variants = injector.inject(&input).unwrap();
        assert_eq!(variants[0].table, input);
        assert_eq!(variants[0].corrupted_cells, 0);
        assert_eq!(variants[0].eligible_cells, 50 * 8);
    }

    #[test]
    fn test_full_rate_blanks_everything_but_box() {
        let input = table(20);
        let mut injector = NoiseInjector::new(vec![1.0], NoiseMode::Independent, Some(2)).unwrap();
        let variant = &injector.inject(&input).unwrap()[0];

        assert_eq!(variant.corrupted_cells, 20 * 8);
        assert_eq!(variant.table.column(BOX_COLUMN), input.column(BOX_COLUMN));
        assert!(variant.table.column("activity").unwrap().iter().all(Option::is_none));
    }

    #[test]
    fn test_shape_and_box_column_preserved() {
        let input = table(200);
        let mut injector = NoiseInjector::new(
            vec![0.01, 0.02, 0.05, 0.10],
            NoiseMode::Independent,
            Some(3),
        )
        .unwrap();
        let variants = injector.inject(&input).unwrap();

        assert_eq!(variants.len(), 4);
        for variant in &variants {
            assert_eq!(variant.table.row_count(), input.row_count());
            assert_eq!(variant.table.column_count(), input.column_count());
            assert_eq!(variant.table.header(), input.header());
            assert_eq!(variant.table.column(BOX_COLUMN), input.column(BOX_COLUMN));
            assert_eq!(missing(&variant.table).len(), variant.corrupted_cells);
        }
    }

    #[test]
    fn test_nested_mode_produces_subsets() {
        let input = table(300);
        let mut injector =
            NoiseInjector::new(vec![0.05, 0.10, 0.30], NoiseMode::Nested, Some(4)).unwrap();
        let variants = injector.inject(&input).unwrap();

        for pair in variants.windows(2) {
            let lower = missing(&pair[0].table);
            let higher = missing(&pair[1].table);
            assert!(lower.iter().all(|cell| higher.contains(cell)));
            assert!(pair[0].corrupted_cells <= pair[1].corrupted_cells);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let input = table(100);
        let run = |seed| {
            NoiseInjector::new(vec![0.1, 0.2], NoiseMode::Independent, Some(seed))
                .unwrap()
                .inject(&input)
                .unwrap()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_already_missing_cells_are_not_counted() {
        let mut input = LogTable::with_log_header();
        input.push_row(vec![None; LOG_COLUMNS.len()]).unwrap();
        let mut injector = NoiseInjector::new(vec![1.0], NoiseMode::Independent, Some(5)).unwrap();
        let variant = &injector.inject(&input).unwrap()[0];
        assert_eq!(variant.corrupted_cells, 0);
        assert_eq!(variant.eligible_cells, 8);
    }

    #[test]
    fn test_invalid_rate_is_rejected() {
        let err = NoiseInjector::new(vec![0.1, -0.5], NoiseMode::Nested, None).unwrap_err();
        assert!(matches!(err, SimulationError::NoiseError(_)));
    }

    #[test]
    fn test_missing_box_column_is_rejected() {
        let input = LogTable::new(vec!["idx".to_string()]);
        let mut injector = NoiseInjector::new(vec![0.1], NoiseMode::Independent, Some(6)).unwrap();
        assert!(matches!(injector.inject(&input), Err(SimulationError::InvalidLog(_))));
    }

    #[test]
    fn test_write_variants_uses_rate_positions() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimulationConfig {
            output_directory: dir.path().display().to_string(),
            ..Default::default()
        };
        let input = table(5);
        let mut injector =
            NoiseInjector::new(vec![0.1, 0.2], NoiseMode::Independent, Some(7)).unwrap();
        let variants = injector.inject(&input).unwrap();

        let paths = write_variants(&variants, &config).unwrap();
        assert_eq!(paths[0], dir.path().join("event_data_noise_1.csv"));
        assert_eq!(paths[1], dir.path().join("event_data_noise_2.csv"));
        let reread = LogTable::read_from(&paths[1]).unwrap();
        assert_eq!(reread, variants[1].table);

        let stats = noise_statistics(NoiseMode::Independent, &variants);
        assert_eq!(stats.variants.len(), 2);
        assert_eq!(stats.variants[1].rate, 0.2);
    }
}
