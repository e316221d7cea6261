//! Command line interface for writing a grid with a subset of the lines.

use crate::{cli::utils as cli_utils, exit_on_error, exit_on_false, grid::data::GridData};
use clap::{Arg, ArgMatches, Command};

/// Builds a representation of the `subset` command line subcommand.
pub fn create_subset_subcommand() -> Command {
    Command::new("subset")
        .about("Write a new grid containing only the given lines")
        .arg(
            Arg::new("grid")
                .value_name("GRID")
                .required(true)
                .help("Path to the original grid file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .require_equals(true)
                .value_name("PATH")
                .required(true)
                .help("Path of the new grid file"),
        )
        .arg(
            cli_utils::lines_arg("Identifiers of the lines to keep (comma-separated)")
                .required(true),
        )
        .arg(cli_utils::overwrite_arg())
        .arg(cli_utils::verbose_arg("Print status messages related to reading and writing"))
}

/// Runs the actions for the `subset` subcommand using the given arguments.
pub fn run_subset_subcommand(arguments: &ArgMatches) {
    let verbosity = cli_utils::parse_verbosity(arguments, false);
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);
    let grid_path = cli_utils::get_required_string(arguments, "grid");
    let output_path = cli_utils::get_required_string(arguments, "output");
    let line_ids = cli_utils::get_string_values(arguments, "lines").unwrap_or_default();

    exit_on_false!(!line_ids.is_empty(), "Error: No lines to keep");

    let data = exit_on_error!(
        GridData::read(grid_path, Some(line_ids.as_slice()), &verbosity),
        "Error: Could not read grid: {}"
    );
    exit_on_error!(
        data.write(output_path, overwrite_mode, &verbosity),
        "Error: Could not write grid: {}"
    );
}
