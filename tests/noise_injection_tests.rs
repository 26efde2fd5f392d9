//! Tests for noise injection over generated logs
//!
//! These tests corrupt real simulated logs, both in memory and after a trip
//! through the CSV files the pipeline writes, and check that structure and
//! the `box` column survive.

use box_process_simulator::events::BOX_COLUMN;
use box_process_simulator::simulation::{noise_statistics, write_variants};
use box_process_simulator::*;

fn generated_table(box_count: usize, seed: u64) -> LogTable {
    let config = SimulationConfig { box_count, seed: Some(seed), ..Default::default() };
    TraySimulator::new(config).unwrap().run().unwrap().log.to_table()
}

fn missing_cells(table: &LogTable) -> usize {
    table.rows().iter().flatten().filter(|cell| cell.is_none()).count()
}

/// Concrete scenario: a 0% rate returns the input unchanged
#[test]
fn test_zero_rate_is_identity() {
    let table = generated_table(30, 1);
    let mut injector = NoiseInjector::new(vec![0.0], NoiseMode::Independent, Some(1)).unwrap();
    let variants = injector.inject(&table).unwrap();

    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].table, table);
    assert_eq!(variants[0].corrupted_cells, 0);
}

#[test]
fn test_default_rates_preserve_shape_and_box_column() {
    let table = generated_table(300, 2);
    let config = SimulationConfig { seed: Some(2), ..Default::default() };
    let mut injector = NoiseInjector::from_config(&config).unwrap();
    let variants = injector.inject(&table).unwrap();

    assert_eq!(variants.len(), 4);
    let baseline_missing = missing_cells(&table);

    for (variant, rate) in variants.iter().zip([0.01, 0.02, 0.05, 0.10]) {
        assert_eq!(variant.rate, rate);
        assert_eq!(variant.table.row_count(), table.row_count());
        assert_eq!(variant.table.column_count(), table.column_count());
        assert_eq!(variant.table.header(), table.header());
        assert_eq!(variant.table.column(BOX_COLUMN), table.column(BOX_COLUMN));
        assert_eq!(missing_cells(&variant.table), baseline_missing + variant.corrupted_cells);

        // Cells only ever disappear; surviving cells are untouched
        for (noisy_row, clean_row) in variant.table.rows().iter().zip(table.rows()) {
            for (noisy, clean) in noisy_row.iter().zip(clean_row) {
                assert!(noisy.is_none() || noisy == clean);
            }
        }
    }
}

#[test]
fn test_corruption_tracks_rate() {
    // 2000 rows x 8 eligible columns; generous bounds keep this stable
    let table = generated_table(300, 3);
    let mut injector =
        NoiseInjector::new(vec![0.10, 0.50], NoiseMode::Independent, Some(3)).unwrap();
    let variants = injector.inject(&table).unwrap();

    let low = variants[0].statistics().corrupted_fraction();
    let high = variants[1].statistics().corrupted_fraction();
    // A clean log already misses batchPosition on 8 of 20 rows, which caps
    // the observed fraction at 95% of the nominal rate
    assert!(low > 0.07 && low < 0.12, "low fraction {}", low);
    assert!(high > 0.40 && high < 0.55, "high fraction {}", high);
}

#[test]
fn test_nested_mode_masks_are_supersets() {
    let table = generated_table(60, 4);
    let mut injector =
        NoiseInjector::new(vec![0.01, 0.02, 0.05, 0.10], NoiseMode::Nested, Some(4)).unwrap();
    let variants = injector.inject(&table).unwrap();

    for pair in variants.windows(2) {
        for (lower_row, higher_row) in pair[0].table.rows().iter().zip(pair[1].table.rows()) {
            for (lower, higher) in lower_row.iter().zip(higher_row) {
                if lower.is_none() {
                    assert!(higher.is_none());
                }
            }
        }
    }
}

/// Independent masks: the low-rate variant is not a subset of the high-rate one
#[test]
fn test_independent_mode_draws_fresh_masks_per_rate() {
    let table = generated_table(300, 4);
    let mut injector =
        NoiseInjector::new(vec![0.01, 0.10], NoiseMode::Independent, Some(4)).unwrap();
    let variants = injector.inject(&table).unwrap();

    let only_missing_at_low_rate = variants[0]
        .table
        .rows()
        .iter()
        .flatten()
        .zip(variants[1].table.rows().iter().flatten())
        .filter(|(low, high)| low.is_none() && high.is_some())
        .count();
    assert!(only_missing_at_low_rate > 0);
}

#[test]
fn test_noise_is_reproducible_for_a_seed() {
    let table = generated_table(30, 5);
    let inject = |seed| {
        NoiseInjector::new(vec![0.05, 0.10], NoiseMode::Independent, Some(seed))
            .unwrap()
            .inject(&table)
            .unwrap()
    };

    assert_eq!(inject(17), inject(17));
    assert_ne!(inject(17), inject(18));
}

#[test]
fn test_noise_over_persisted_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig {
        box_count: 60,
        seed: Some(6),
        output_directory: dir.path().display().to_string(),
        ..Default::default()
    };

    let run = TraySimulator::new(config.clone()).unwrap().run().unwrap();
    let log_path = config.generated_log_path();
    run.log.serialize(&log_path).unwrap();

    let table = LogTable::read_from(&log_path).unwrap();
    assert_eq!(table, run.log.to_table());

    let mut injector = NoiseInjector::from_config(&config).unwrap();
    let variants = injector.inject(&table).unwrap();
    let paths = write_variants(&variants, &config).unwrap();

    assert_eq!(paths.len(), 4);
    for (index, path) in paths.iter().enumerate() {
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("event_data_noise_{}.csv", index + 1)
        );
        let reread = LogTable::read_from(path).unwrap();
        assert_eq!(reread, variants[index].table);
    }

    let stats = noise_statistics(config.noise_mode, &variants);
    assert_eq!(stats.variants.len(), 4);
    assert!(stats.generate_summary_output().contains("#4 rate 10.0%"));
}

#[test]
fn test_unreadable_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("event_data_generated_9.csv");
    let err = LogTable::read_from(&missing).unwrap_err();
    assert_eq!(err.category(), "IO");
}
