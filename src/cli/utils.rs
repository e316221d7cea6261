//! Utilities for creating the command line interface.

use crate::{exit_on_error, io::OverwriteMode, io::Verbosity};
use clap::{Arg, ArgAction, ArgMatches};
use indicatif::ProgressStyle;
use lazy_static::lazy_static;
use std::str::FromStr;

lazy_static! {
    static ref DEFAULT_PROGRESS_STYLE: ProgressStyle = ProgressStyle::default_bar()
        .template("Progress: {bar:40}  {percent}% | ETA: {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
}

/// Creates the `verbose` flag shared by most subcommands.
pub fn verbose_arg(help: &'static str) -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
        .help(help)
}

/// Creates the `progress` flag for subcommands performing long computations.
pub fn progress_arg() -> Arg {
    Arg::new("progress")
        .short('p')
        .long("progress")
        .action(ArgAction::SetTrue)
        .help("Show progress bar (also implies `verbose`)")
}

/// Creates the `overwrite` flag for subcommands writing grid files.
pub fn overwrite_arg() -> Arg {
    Arg::new("overwrite")
        .long("overwrite")
        .action(ArgAction::SetTrue)
        .help("Replace existing output files")
}

/// Creates an argument taking a comma-separated list of line identifiers.
pub fn lines_arg(help: &'static str) -> Arg {
    Arg::new("lines")
        .short('l')
        .long("lines")
        .require_equals(true)
        .value_delimiter(',')
        .value_name("IDS")
        .num_args(1..)
        .help(help)
}

pub fn parse_value_string<T>(argument_name: &str, value_string: &str) -> T
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    exit_on_error!(
        value_string.parse(),
        "Error: Could not parse value for {0}: {1}",
        argument_name
    )
}

pub fn get_required_string<'a>(arguments: &'a ArgMatches, argument_name: &str) -> &'a str {
    arguments
        .get_one::<String>(argument_name)
        .map(String::as_str)
        .unwrap_or_else(|| {
            crate::exit_with_error!("Error: No value for required argument {}", argument_name)
        })
}

pub fn get_value_from_required_parseable_argument<T>(
    arguments: &ArgMatches,
    argument_name: &str,
) -> T
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    parse_value_string(argument_name, get_required_string(arguments, argument_name))
}

/// Returns the non-empty comma-separated values of the given argument, if present.
pub fn get_string_values(arguments: &ArgMatches, argument_name: &str) -> Option<Vec<String>> {
    arguments.get_many::<String>(argument_name).map(|values| {
        values
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    })
}

pub fn overwrite_mode_from_arguments(arguments: &ArgMatches) -> OverwriteMode {
    arguments.get_flag("overwrite").into()
}

pub fn parse_verbosity(arguments: &ArgMatches, support_progress: bool) -> Verbosity {
    if support_progress && arguments.get_flag("progress") {
        Verbosity::Progress(DEFAULT_PROGRESS_STYLE.clone())
    } else if arguments.get_flag("verbose") {
        Verbosity::Messages
    } else {
        Verbosity::Quiet
    }
}
