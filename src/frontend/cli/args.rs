use std::path::PathBuf;

use clap::ArgMatches;
use log::LevelFilter;

use crate::backend::engine::InterferenceEngine;
use crate::backend::report::ConflictReport;
use crate::backend::snapshot::Snapshot;
use crate::frontend::FrontendError;
use crate::frontend::config::{load_analysis_config, GeneralConfig, SnapshotSource};
use crate::frontend::demo::{generate_snapshot, MeshArea};
use crate::frontend::output::write_report;


pub const ARG_CONFIG: &str     = "config file path";
pub const ARG_DEMO: &str       = "demo device count";
pub const ARG_OUTPUT_DIR: &str = "output directory path";
pub const ARG_SEED: &str       = "demo seed";
pub const ARG_SNAPSHOT: &str   = "snapshot path";
pub const ARG_VERBOSE: &str    = "verbose";

pub const GROUP_INPUT: &str = "input";


pub fn handle_arguments(matches: &ArgMatches) -> Result<(), FrontendError> {
    init_logger(verbose(matches));

    let general_config = general_config(matches)?;
    let engine = InterferenceEngine::new(general_config.analysis_config().clone())?;

    let snapshot = load_snapshot(general_config.source())?;
    let analysis = engine.analyze(&snapshot);
    let report = ConflictReport::new(&snapshot, &analysis);

    write_report(general_config.output_directory(), &report)?;

    Ok(())
}

// `RUST_LOG` still takes precedence over the flag.
fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

fn general_config(matches: &ArgMatches) -> Result<GeneralConfig, FrontendError> {
    let source = match (snapshot_path(matches), demo_device_count(matches)) {
        (Some(path), _) => SnapshotSource::File(path),
        // The input group is required, so no path means a demo count.
        (None, count)   => SnapshotSource::Demo {
            device_count: count.unwrap_or_default(),
            seed: demo_seed(matches),
        },
    };

    Ok(GeneralConfig::new(
        load_analysis_config(config_path(matches).as_deref())?,
        source,
        output_directory(matches),
    ))
}

fn load_snapshot(source: &SnapshotSource) -> Result<Snapshot, FrontendError> {
    let snapshot = match source {
        SnapshotSource::File(path) => Snapshot::from_json_file(path)?,
        SnapshotSource::Demo { device_count, seed } =>
            generate_snapshot(*device_count, *seed, &MeshArea::default())?,
    };

    Ok(snapshot)
}

fn snapshot_path(matches: &ArgMatches) -> Option<PathBuf> {
    matches
        .get_one::<PathBuf>(ARG_SNAPSHOT)
        .cloned()
}

fn demo_device_count(matches: &ArgMatches) -> Option<usize> {
    matches
        .get_one::<usize>(ARG_DEMO)
        .copied()
}

fn demo_seed(matches: &ArgMatches) -> Option<u64> {
    matches
        .get_one::<u64>(ARG_SEED)
        .copied()
}

fn config_path(matches: &ArgMatches) -> Option<PathBuf> {
    matches
        .get_one::<PathBuf>(ARG_CONFIG)
        .cloned()
}

fn output_directory(matches: &ArgMatches) -> Option<PathBuf> {
    matches
        .get_one::<PathBuf>(ARG_OUTPUT_DIR)
        .cloned()
}

fn verbose(matches: &ArgMatches) -> bool {
    matches.get_flag(ARG_VERBOSE)
}
