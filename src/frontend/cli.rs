use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgGroup, Command, value_parser};

use args::{
    handle_arguments, ARG_CONFIG, ARG_DEMO, ARG_OUTPUT_DIR, ARG_SEED,
    ARG_SNAPSHOT, ARG_VERBOSE, GROUP_INPUT
};

use super::FrontendError;


mod args;


/// # Errors
///
/// Will return `Err` if the input can not be loaded, the configuration is
/// rejected or the report can not be written.
pub fn cli() -> Result<(), FrontendError> {
    let matches = command().get_matches();

    handle_arguments(&matches)
}

fn command() -> Command {
    Command::new("mesh_interference")
        .version("0.1.0")
        .about(
            "Finds interfering radios in a wireless mesh and proposes \
            channel reassignments."
        )
        .args([
            arg_snapshot(),
            arg_demo(),
            arg_config(),
            arg_output_dir(),
            arg_seed(),
            arg_verbose(),
        ])
        .group(
            ArgGroup::new(GROUP_INPUT)
                .args([ARG_SNAPSHOT, ARG_DEMO])
                .required(true)
        )
        .arg_required_else_help(true)
}

fn arg_snapshot() -> Arg {
    Arg::new(ARG_SNAPSHOT)
        .short('s')
        .long("snapshot")
        .value_parser(value_parser!(PathBuf))
        .help("Analyse the network snapshot in this `.json` file")
}

fn arg_demo() -> Arg {
    Arg::new(ARG_DEMO)
        .long("demo")
        .value_parser(value_parser!(usize))
        .help("Analyse a synthetic mesh with this many devices")
}

fn arg_config() -> Arg {
    Arg::new(ARG_CONFIG)
        .short('c')
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Read analysis settings from this `.json` file")
}

fn arg_output_dir() -> Arg {
    Arg::new(ARG_OUTPUT_DIR)
        .short('o')
        .long("output")
        .value_parser(value_parser!(PathBuf))
        .help(
            "Write the report and the recommendations digest to this \
            directory instead of stdout"
        )
}

fn arg_seed() -> Arg {
    Arg::new(ARG_SEED)
        .long("seed")
        .requires(ARG_DEMO)
        .conflicts_with(ARG_SNAPSHOT)
        .value_parser(value_parser!(u64))
        .help("Seed the synthetic mesh (\"--demo\" only)")
}

fn arg_verbose() -> Arg {
    Arg::new(ARG_VERBOSE)
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
        .help("Show debug log output")
}
