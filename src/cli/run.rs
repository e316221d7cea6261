//! Function for running the command line program.

use super::{
    build, create::run_create_subcommand, inspect::run_inspect_subcommand,
    parameters::run_parameters_subcommand, query::run_query_subcommand,
    subset::run_subset_subcommand,
};
use clap::ArgMatches;
use std::time::Instant;

/// Runs the `gaslight` command line program.
pub fn run() {
    run_with_args(build::build().get_matches());
}

/// Runs the `gaslight` command line program with the given parsed arguments.
pub fn run_with_args(arguments: ArgMatches) {
    let start_instant = Instant::now();

    match arguments.subcommand() {
        Some(("create", create_arguments)) => run_create_subcommand(create_arguments),
        Some(("inspect", inspect_arguments)) => run_inspect_subcommand(inspect_arguments),
        Some(("subset", subset_arguments)) => run_subset_subcommand(subset_arguments),
        Some(("query", query_arguments)) => run_query_subcommand(query_arguments),
        Some(("parameters", parameters_arguments)) => {
            run_parameters_subcommand(parameters_arguments)
        }
        _ => {}
    }

    if arguments.get_flag("timing") {
        println!("Elapsed time: {} s", start_instant.elapsed().as_secs_f64());
    }
}
