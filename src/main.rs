// Box Process Simulator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/box-process-simulator
// ```
//
// Or with custom configuration:
//
// ```console
// $ ./target/release/box-process-simulator --box-count 1500 --dataset-number 3 --seed 42 --verbose
// ```

use anyhow::{bail, Context};
use box_process_simulator::analysis::verify_log;
use box_process_simulator::events::{format_timestamp, LogTable};
use box_process_simulator::simulation::{
    noise_statistics, write_variants, LoggingConfig, NoiseInjector, RunManifest, RunStatistics,
    TraySimulator,
};
use box_process_simulator::types::config::CliArgs;
use box_process_simulator::types::SimulationConfig;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

/// Violations echoed to the log before a failed verification aborts the run
const MAX_REPORTED_VIOLATIONS: usize = 10;

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    if args.print_config {
        match SimulationConfig::default().print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize default configuration: {}", e);
                process::exit(1);
            }
        }
    }

    let mut logging = LoggingConfig::from_flags(args.verbose, args.debug);
    if let Some(dir) = &args.log_dir {
        logging = logging.with_file_logging(dir.clone());
    }
    if let Some(filter) = &args.log_filter {
        logging = logging.with_env_filter(filter.clone());
    }
    if args.log_json {
        logging = logging.with_json_format();
    }
    if args.no_color {
        logging = logging.without_ansi();
    }
    // Held until exit so buffered log lines are flushed
    let _logging_guard = match logging.init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    info!("Starting Box Process Simulator");

    if let Err(e) = run(args) {
        error!("Run failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    info!("Box Process Simulator completed successfully");
}

/// Load configuration, then generate and/or corrupt a log
fn run(args: CliArgs) -> anyhow::Result<()> {
    let dry_run = args.dry_run;

    let config = SimulationConfig::from_cli_args(args).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    info!("Configuration loaded and validated successfully");

    if dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - simulation will not be executed.");
        print_configuration_summary(&config);
        return Ok(());
    }

    print_startup_banner(&config);

    fs::create_dir_all(&config.output_directory).with_context(|| {
        format!("Failed to create output directory '{}'", config.output_directory)
    })?;

    let (table, manifest) = match &config.noise_input {
        Some(input) => load_existing_log(&config, input)?,
        None => generate_log(&config)?,
    };

    if config.verify {
        verify_table(&table)?;
    }

    let manifest = if config.inject_noise {
        eprintln!("Injecting noise at {} rates...", config.noise_rates.len());
        let mut injector = NoiseInjector::from_config(&config)?;
        let variants = injector.inject(&table).context("Noise injection failed")?;
        let paths = write_variants(&variants, &config).context("Failed to write noise variants")?;

        eprintln!("{}", noise_statistics(config.noise_mode, &variants).generate_summary_output());
        manifest.with_noise(config.noise_mode, &variants, &paths)
    } else {
        info!("Noise injection disabled");
        manifest
    };

    let manifest_path = config.manifest_path();
    manifest
        .write_to(&manifest_path)
        .with_context(|| format!("Failed to write manifest '{}'", manifest_path.display()))?;
    eprintln!("Manifest written to: {}", manifest_path.display());

    Ok(())
}

/// Simulate every tray and persist the clean log
fn generate_log(config: &SimulationConfig) -> anyhow::Result<(LogTable, RunManifest)> {
    eprintln!(
        "Simulating {} boxes in {} trays...",
        config.effective_box_count(),
        config.tray_count()
    );

    let mut simulator = TraySimulator::new(config.clone())?;
    let run = simulator.run().context("Simulation failed")?;

    let path = config.generated_log_path();
    run.log
        .serialize(&path)
        .with_context(|| format!("Failed to write event log '{}'", path.display()))?;
    eprintln!("Event log written to: {}", path.display());

    print_run_statistics(&run.statistics);

    let table = run.log.to_table();
    let manifest =
        RunManifest::new(config, path, table.row_count()).with_generation(&run.statistics);
    Ok((table, manifest))
}

/// Read a previously generated log for a noise-only run
fn load_existing_log(
    config: &SimulationConfig,
    input: &str,
) -> anyhow::Result<(LogTable, RunManifest)> {
    eprintln!("Reading existing event log: {}", input);
    let table = LogTable::read_from(input)
        .with_context(|| format!("Failed to read event log '{}'", input))?;

    if !config.inject_noise {
        warn!("Noise input given but noise injection is disabled; only the manifest is written");
    }

    let manifest = RunManifest::new(config, PathBuf::from(input), table.row_count());
    Ok((table, manifest))
}

/// Fail the run when the log breaks any structural property
fn verify_table(table: &LogTable) -> anyhow::Result<()> {
    let report = verify_log(table);
    if !report.is_valid() {
        for violation in report.violations.iter().take(MAX_REPORTED_VIOLATIONS) {
            error!(
                kind = violation.kind.name(),
                row = ?violation.row,
                "{}",
                violation.details
            );
        }
        bail!("Event log failed verification: {}", report.summary());
    }
    eprintln!("Verification passed: {}", report.summary());
    Ok(())
}

/// Print startup banner and configuration summary
fn print_startup_banner(config: &SimulationConfig) {
    eprintln!("Box Process Simulator");
    eprintln!("=====================");
    eprintln!("Synthetic assembly-line event logs for process mining");
    eprintln!();

    print_configuration_summary(config);
}

/// Print configuration summary
fn print_configuration_summary(config: &SimulationConfig) {
    eprintln!("Configuration:");
    match &config.noise_input {
        Some(input) => eprintln!("  Noise Input: {}", input),
        None => {
            eprintln!(
                "  Box Count: {} ({} trays, {} boxes simulated)",
                config.box_count,
                config.tray_count(),
                config.effective_box_count()
            );
            eprintln!("  Dataset Number: {}", config.dataset_number);
            eprintln!("  Start Time: {}", format_timestamp(&config.start_time));
            eprintln!("  Equipment Pool: {} ids", config.equipment_ids.len());
            eprintln!("  Log Tag: {}", config.log_tag);
        }
    }
    eprintln!("  Output Directory: {}", config.output_directory);
    if config.inject_noise {
        let rates: Vec<String> =
            config.noise_rates.iter().map(|r| format!("{:.1}%", r * 100.0)).collect();
        eprintln!("  Noise Rates: {} ({})", rates.join(", "), config.noise_mode);
    } else {
        eprintln!("  Noise Rates: disabled");
    }
    if let Some(seed) = config.seed {
        eprintln!("  Random Seed: {}", seed);
    }
    eprintln!();
}

/// Print the end-of-run statistics
fn print_run_statistics(statistics: &RunStatistics) {
    eprintln!("{}", statistics.generate_summary_output());
}
