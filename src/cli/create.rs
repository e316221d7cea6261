//! Command line interface for assembling a grid from Cloudy outputs.

use crate::{
    assembly::{self, AssemblyConfig, GridAssembler},
    cli::utils as cli_utils,
    config::{self, PhotoionisationConfig},
    exit_on_error,
    io::artifact::ArtifactFormat,
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::Path;

/// Builds a representation of the `create` command line subcommand.
pub fn create_create_subcommand() -> Command {
    Command::new("create")
        .about("Assemble a grid from the outputs of Cloudy runs")
        .long_about(
            "Assemble a grid from the outputs of Cloudy runs.\n\
             The runs are expected in <OUTPUT_DIR>/<MODEL>, where the model name is\n\
             <incident grid stem>-<config stem>. The grid is written to\n\
             <GRID_DIR>/<MODEL>.<FORMAT>, and failed runs are listed in\n\
             <GRID_DIR>/<MODEL>.failed_models.",
        )
        .arg(
            Arg::new("incident-grid")
                .short('i')
                .long("incident-grid")
                .require_equals(true)
                .value_name("PATH")
                .required(true)
                .help("Incident grid file, or YAML file listing the incident axes"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .require_equals(true)
                .value_name("PATH")
                .required(true)
                .help("YAML file with the photoionisation parameters"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .require_equals(true)
                .value_name("DIR")
                .required(true)
                .help("Directory containing the Cloudy outputs of each model"),
        )
        .arg(
            Arg::new("grid-dir")
                .short('g')
                .long("grid-dir")
                .require_equals(true)
                .value_name("DIR")
                .default_value(".")
                .help("Directory to write the grid to"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .require_equals(true)
                .value_name("EXTENSION")
                .default_value("glg")
                .help("Storage format of the grid, given by its file extension (glg or hdf5)"),
        )
        .arg(
            Arg::new("no-normalise")
                .long("no-normalise")
                .action(ArgAction::SetTrue)
                .help("Store raw Cloudy luminosities without correcting for the incident energy"),
        )
        .arg(
            Arg::new("save-continuum")
                .long("save-continuum")
                .action(ArgAction::SetTrue)
                .help("Also write the full continuum spectra of every model"),
        )
        .arg(cli_utils::overwrite_arg())
        .arg(cli_utils::verbose_arg("Print status messages related to assembly"))
        .arg(cli_utils::progress_arg())
}

/// Runs the actions for the `create` subcommand using the given arguments.
pub fn run_create_subcommand(arguments: &ArgMatches) {
    let verbosity = cli_utils::parse_verbosity(arguments, true);
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);

    let incident_grid_path = Path::new(cli_utils::get_required_string(arguments, "incident-grid"));
    let config_path = Path::new(cli_utils::get_required_string(arguments, "config"));
    let output_dir = Path::new(cli_utils::get_required_string(arguments, "output-dir"));
    let grid_dir = Path::new(cli_utils::get_required_string(arguments, "grid-dir"));
    let format = exit_on_error!(
        ArtifactFormat::from_extension(cli_utils::get_required_string(arguments, "format")),
        "Error: Invalid grid format: {}"
    );

    let config = exit_on_error!(
        PhotoionisationConfig::from_file(config_path),
        "Error: Could not read photoionisation configuration: {}"
    );
    let cloudy_version = exit_on_error!(config.cloudy_version(), "Error: {}");

    let incident_axes = exit_on_error!(
        config::read_incident_axes(incident_grid_path, &verbosity),
        "Error: Could not read incident grid axes: {}"
    );

    let assembly_config = AssemblyConfig {
        normalise: !arguments.get_flag("no-normalise"),
        save_continuum: arguments.get_flag("save-continuum"),
        cloudy_version,
        verbosity: verbosity.clone(),
    };

    let model_name = assembly::model_name(incident_grid_path, config_path);
    let output_directory = assembly_config.cloudy_outputs(output_dir, &model_name);

    if verbosity.print_messages() {
        println!(
            "Assembling model {} from {}",
            model_name,
            output_directory.root().to_string_lossy()
        );
    }

    let assembler = exit_on_error!(
        GridAssembler::for_cloudy_outputs(incident_axes, config.axes().clone(), &output_directory),
        "Error: Could not set up grid assembly: {}"
    );

    let grid = exit_on_error!(
        assembler.assemble(&output_directory, &assembly_config),
        "Error: Could not assemble grid: {}"
    );

    if !grid.failed_points.is_empty() {
        eprintln!(
            "Warning: {} of {} models failed",
            grid.failed_points.len(),
            assembler.n_cells()
        );
    }

    exit_on_error!(
        grid.write(
            grid_dir,
            &model_name,
            format.extension(),
            overwrite_mode,
            &verbosity
        ),
        "Error: Could not write grid: {}"
    );
}
