//! Command line interface for printing information about a grid.

use crate::{cli::utils as cli_utils, exit_on_error, grid::Grid};
use clap::{Arg, ArgAction, ArgMatches, Command};
use ndarray::Dimension;

/// Builds a representation of the `inspect` command line subcommand.
pub fn create_inspect_subcommand() -> Command {
    Command::new("inspect")
        .about("Print a summary of a grid")
        .arg(
            Arg::new("grid")
                .value_name("GRID")
                .required(true)
                .help("Path to the grid file"),
        )
        .arg(
            Arg::new("list-lines")
                .long("list-lines")
                .action(ArgAction::SetTrue)
                .help("Also list the lines in the grid with their wavelengths"),
        )
        .arg(
            Arg::new("list-failed")
                .long("list-failed")
                .action(ArgAction::SetTrue)
                .help("Also list the grid points of failed models"),
        )
        .arg(cli_utils::verbose_arg("Print status messages related to reading"))
}

/// Runs the actions for the `inspect` subcommand using the given arguments.
pub fn run_inspect_subcommand(arguments: &ArgMatches) {
    let verbosity = cli_utils::parse_verbosity(arguments, false);
    let grid_path = cli_utils::get_required_string(arguments, "grid");

    let grid = exit_on_error!(
        Grid::load::<_, &str>(grid_path, None, &verbosity),
        "Error: Could not read grid: {}"
    );

    println!("{}", grid);

    if arguments.get_flag("list-lines") {
        println!("Lines:");
        for line in grid.data().lines() {
            println!("  {} ({:.2} Å)", line.id, line.wavelength);
        }
    }

    if arguments.get_flag("list-failed") {
        println!("Failed models:");
        for (index, _) in grid
            .failed_models()
            .indexed_iter()
            .filter(|(_, &failed)| failed)
        {
            println!("  {:?}", index.slice());
        }
    }
}
