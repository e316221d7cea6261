//! Command line interface for looking up lines in a grid.

use crate::{
    cli::utils as cli_utils,
    exit_on_error, exit_with_error,
    grid::{
        fgd,
        point::{GridPoint, ParameterValues},
        Grid, Log10Axes,
    },
    line::{Line, LineCollection},
};
use clap::{Arg, ArgAction, ArgMatches, Command};

/// Builds a representation of the `query` command line subcommand.
pub fn create_query_subcommand() -> Command {
    Command::new("query")
        .about("Look up lines at a point in a grid")
        .arg(
            Arg::new("grid")
                .value_name("GRID")
                .required(true)
                .help("Path to the grid file"),
        )
        .arg(cli_utils::lines_arg(
            "Identifiers of the lines to look up (comma-separated) [default: all]",
        ))
        .arg(
            Arg::new("parameters")
                .short('P')
                .long("parameters")
                .require_equals(true)
                .value_name("VALUES")
                .help(
                    "Parameter values, either as name=value pairs or in axis order\n\
                     (comma-separated, values may carry a unit, e.g. age=10 Myr)",
                )
                .conflicts_with("indices")
                .required_unless_present("indices"),
        )
        .arg(
            Arg::new("indices")
                .short('I')
                .long("indices")
                .require_equals(true)
                .value_delimiter(',')
                .value_name("INDICES")
                .num_args(1..)
                .help("Grid point given as one index per axis (comma-separated)"),
        )
        .arg(
            Arg::new("covering-fraction")
                .long("covering-fraction")
                .require_equals(true)
                .value_name("FRACTION")
                .default_value("1.0")
                .help("Fraction of the source covered by the nebula"),
        )
        .arg(
            Arg::new("incident-escape-fraction")
                .long("incident-escape-fraction")
                .require_equals(true)
                .value_name("FRACTION")
                .default_value("1.0")
                .help("Fraction of the incident and transmitted light that escapes"),
        )
        .arg(
            Arg::new("interpolate")
                .long("interpolate")
                .action(ArgAction::SetTrue)
                .requires("parameters")
                .help("Interpolate the luminosity instead of using the nearest grid point"),
        )
        .arg(
            Arg::new("log10-axes")
                .long("log10-axes")
                .require_equals(true)
                .value_delimiter(',')
                .value_name("NAMES")
                .num_args(1..)
                .requires("interpolate")
                .help("Axes to interpolate in log10 space (comma-separated) [default: none]"),
        )
        .arg(
            Arg::new("yaml")
                .long("yaml")
                .action(ArgAction::SetTrue)
                .help("Print the lines as YAML"),
        )
        .arg(cli_utils::verbose_arg("Print status messages related to reading"))
}

/// Runs the actions for the `query` subcommand using the given arguments.
pub fn run_query_subcommand(arguments: &ArgMatches) {
    let verbosity = cli_utils::parse_verbosity(arguments, false);
    let grid_path = cli_utils::get_required_string(arguments, "grid");
    let line_ids = cli_utils::get_string_values(arguments, "lines");

    let mut grid = exit_on_error!(
        Grid::load(grid_path, line_ids.as_deref(), &verbosity),
        "Error: Could not read grid: {}"
    );

    let parameters: Option<ParameterValues> = arguments
        .get_one::<String>("parameters")
        .map(|value_string| cli_utils::parse_value_string("parameters", value_string));

    let lines: LineCollection<Line> = if arguments.get_flag("interpolate") {
        let parameters = parameters.unwrap_or_else(|| {
            exit_with_error!("Error: Interpolation requires parameter values")
        });
        let log10_axes = Log10Axes::explicit(
            &cli_utils::get_string_values(arguments, "log10-axes").unwrap_or_default(),
        );
        exit_on_error!(
            grid.get_interpolated_line_collection::<&str>(&parameters, None, &log10_axes),
            "Error: Could not interpolate lines: {}"
        )
    } else {
        let grid_point = match parameters {
            Some(parameters) => GridPoint::ByParameters(parameters),
            None => GridPoint::ByIndex(
                cli_utils::get_string_values(arguments, "indices")
                    .unwrap_or_default()
                    .iter()
                    .map(|index| cli_utils::parse_value_string("indices", index))
                    .collect(),
            ),
        };
        let covering_fraction: fgd =
            cli_utils::get_value_from_required_parseable_argument(arguments, "covering-fraction");
        let incident_escape_fraction: fgd = cli_utils::get_value_from_required_parseable_argument(
            arguments,
            "incident-escape-fraction",
        );
        if verbosity.print_messages() {
            let indices = exit_on_error!(
                grid.resolve_grid_point(&grid_point),
                "Error: Invalid grid point: {}"
            );
            println!("Using grid point {:?}", indices);
        }
        exit_on_error!(
            grid.get_line_collection_at_grid_point::<&str>(
                &grid_point,
                None,
                covering_fraction,
                incident_escape_fraction
            ),
            "Error: Could not look up lines: {}"
        )
    };

    if arguments.get_flag("yaml") {
        let lines: Vec<&Line> = lines.iter().collect();
        print!(
            "{}",
            exit_on_error!(
                serde_yaml::to_string(&lines),
                "Error: Could not serialise lines: {}"
            )
        );
    } else {
        for line in lines.iter() {
            println!("{}", line);
            if let Ok(equivalent_width) = line.equivalent_width() {
                println!("equivalent width: {:.3} Å", equivalent_width);
            }
        }
    }
}
