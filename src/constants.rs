//! Physical constants and unit conversion factors.

/// Floating-point precision to use for constants.
#[allow(non_camel_case_types)]
pub type fcn = f64;

// Physical constants

/// Speed of light in vacuum [cm/s].
pub const CLIGHT: fcn = 2.997_924_58e10;
/// Speed of light in vacuum [Å/s].
pub const CLIGHT_ANGSTROM: fcn = CLIGHT * CM_TO_ANGSTROM;

// Unit conversion factors

/// Conversion factor from centimeters to Ångström.
pub const CM_TO_ANGSTROM: fcn = 1e8;
/// Conversion factor from meters to Ångström.
pub const M_TO_ANGSTROM: fcn = 1e10;
/// Conversion factor from nanometers to Ångström.
pub const NM_TO_ANGSTROM: fcn = 10.0;
/// Conversion factor from microns to Ångström.
pub const MICRON_TO_ANGSTROM: fcn = 1e4;
/// Conversion factor from megayears to years.
pub const MYR_TO_YR: fcn = 1e6;
/// Conversion factor from gigayears to years.
pub const GYR_TO_YR: fcn = 1e9;
/// Conversion factor from inverse cubic meters to inverse cubic centimeters.
pub const PER_M3_TO_PER_CM3: fcn = 1e-6;
