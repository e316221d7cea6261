//! Command line interface for printing the parameters of photoionisation models.

use crate::{cli::utils as cli_utils, config::PhotoionisationConfig, exit_on_error, exit_on_false};
use clap::{Arg, ArgMatches, Command};

/// Builds a representation of the `parameters` command line subcommand.
pub fn create_parameters_subcommand() -> Command {
    Command::new("parameters")
        .about("Print the full parameter set of photoionisation models as YAML")
        .arg(
            Arg::new("config")
                .value_name("CONFIG")
                .required(true)
                .help("YAML file with the photoionisation parameters"),
        )
        .arg(
            Arg::new("row")
                .short('r')
                .long("row")
                .require_equals(true)
                .value_name("ROW")
                .help("Print only the model with this row [default: all models]"),
        )
}

/// Runs the actions for the `parameters` subcommand using the given arguments.
pub fn run_parameters_subcommand(arguments: &ArgMatches) {
    let config_path = cli_utils::get_required_string(arguments, "config");
    let config = exit_on_error!(
        PhotoionisationConfig::from_file(config_path),
        "Error: Could not read photoionisation configuration: {}"
    );
    let n_models = config.axes().n_models();

    let rows: Vec<usize> = match arguments.get_one::<String>("row") {
        Some(row) => {
            let row: usize = cli_utils::parse_value_string("row", row);
            exit_on_false!(
                row < n_models,
                "Error: Row {} out of range for {} models",
                row,
                n_models
            );
            vec![row]
        }
        None => (0..n_models).collect(),
    };

    for row in rows {
        let parameters = exit_on_error!(
            serde_yaml::to_string(&config.model_parameters(row)),
            "Error: Could not serialise parameters: {}"
        );
        println!("# model {}", row);
        print!("{}", parameters);
    }
}
