//! The `gaslight` crate builds photoionisation grids from the outputs of Cloudy runs
//! and serves nearest-point and interpolated lookups of line luminosities on them.

pub mod assembly;
pub mod axes;
pub mod config;
pub mod constants;
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod io;
pub mod line;
pub mod spectrum;
pub mod units;

#[cfg(feature = "cli")]
pub mod cli;
