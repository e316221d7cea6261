//! Function for building the command line hierarchy.

use super::{
    create::create_create_subcommand, inspect::create_inspect_subcommand,
    parameters::create_parameters_subcommand, query::create_query_subcommand,
    subset::create_subset_subcommand,
};
use clap::{self, Arg, ArgAction, Command};

/// Build the `gaslight` command line hierarchy.
pub fn build() -> Command {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .author(clap::crate_authors!())
        .about(clap::crate_description!())
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("timing")
                .short('t')
                .long("timing")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Display elapsed time when done"),
        )
        .subcommand(create_create_subcommand())
        .subcommand(create_inspect_subcommand())
        .subcommand(create_subset_subcommand())
        .subcommand(create_query_subcommand())
        .subcommand(create_parameters_subcommand())
}
