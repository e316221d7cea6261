//! Error types and error handling macros.

use std::io;
use thiserror::Error;

/// Errors arising from invalid use of a grid or its axes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Line {0} is not in the list of available lines")]
    UnknownLine(String),
    #[error("Axis {0} is not an axis of the grid")]
    UnknownAxis(String),
    #[error("No value given for grid axis {0}")]
    MissingParameter(String),
    #[error("Grid point has {got} components, but the grid has {expected} axes")]
    GridPointRankMismatch { expected: usize, got: usize },
    #[error("Index {index} is out of range for axis {axis} of length {length}")]
    IndexOutOfRange {
        axis: String,
        index: usize,
        length: usize,
    },
    #[error("Grid has no continuum data")]
    MissingContinuum,
    #[error("Cannot convert from {from} to {to}")]
    IncompatibleUnits { from: String, to: String },
    #[error("Unrecognised unit {0}")]
    UnrecognisedUnit(String),
    #[error("The model at grid point {0:?} failed")]
    FailedGridPoint(Vec<usize>),
    #[error("Value {value} for axis {axis} is outside the grid range [{min}, {max}]")]
    OutOfBounds {
        axis: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Interpolation requires the failed model at grid point {0:?}")]
    FailedModelInStencil(Vec<usize>),
    #[error("Axis {0} contains non-positive values and cannot be interpolated in log10 space")]
    NonPositiveLog10Axis(String),
    #[error("Values of axis {0} are not strictly increasing")]
    NonMonotonicAxis(String),
    #[error("Axis {0} has no values")]
    EmptyAxis(String),
    #[error("Wavelength unit of line {0} not recognised")]
    UnrecognisedWavelengthUnit(String),
    #[error("Cannot add line {second} to line {first}")]
    InconsistentLineAddition { first: String, second: String },
}

impl From<GridError> for io::Error {
    fn from(err: GridError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err.to_string())
    }
}

#[cfg(not(feature = "for-testing"))]
#[macro_export]
macro_rules! exit_with_error {
    ($($print_arg:tt)*) => {{
        eprintln!($($print_arg)*);
        quit::with_code(1);
    }};
}

#[cfg(feature = "for-testing")]
#[macro_export]
macro_rules! exit_with_error {
    ($($print_arg:tt)*) => {{
        panic!($($print_arg)*);
    }};
}

#[macro_export]
macro_rules! exit_on_error {
    ($result:expr, $($print_arg:tt)*) => {
        match $result {
            Ok(value) => value,
            Err(err) => {
                $crate::exit_with_error!($($print_arg)*, err)
            }
        }
    };
}

#[macro_export]
macro_rules! exit_on_false {
    ($logic:expr, $($print_arg:tt)*) => {
        if $logic {
            true
        } else {
            $crate::exit_with_error!($($print_arg)*)
        }
    };
}

#[macro_export]
macro_rules! exit_on_none {
    ($option:expr, $($print_arg:tt)*) => {
        $option.unwrap_or_else(|| $crate::exit_with_error!($($print_arg)*))
    };
}

/// Creates an `io::Result::Err` with the given kind and formatted message.
#[macro_export]
macro_rules! io_result {
    ($kind:ident, $($fmt_arg:tt)*) => {
        Err(::std::io::Error::new(
            ::std::io::ErrorKind::$kind,
            format!($($fmt_arg)*),
        ))
    };
}
