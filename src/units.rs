//! Physical units of grid axes and grid data.

use crate::{
    constants::{
        fcn, CM_TO_ANGSTROM, GYR_TO_YR, MICRON_TO_ANGSTROM, MYR_TO_YR, M_TO_ANGSTROM,
        NM_TO_ANGSTROM, PER_M3_TO_PER_CM3,
    },
    error::GridError,
};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// Floating-point precision to use for units.
#[allow(non_camel_case_types)]
pub type fun = f64;

/// Physical dimension of a unit. Only units of equal dimension can be converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Time,
    Length,
    NumberDensity,
    Temperature,
    Luminosity,
    SpectralLuminosity,
}

/// Units appearing on grid axes and grid quantities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Year,
    Megayear,
    Gigayear,
    Angstrom,
    Nanometer,
    Micron,
    Centimeter,
    Meter,
    PerCubicCentimeter,
    PerCubicMeter,
    Kelvin,
    ErgPerSecond,
    ErgPerSecondPerHertz,
}

impl Unit {
    /// Returns the physical dimension of the unit.
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::Year | Self::Megayear | Self::Gigayear => Dimension::Time,
            Self::Angstrom | Self::Nanometer | Self::Micron | Self::Centimeter | Self::Meter => {
                Dimension::Length
            }
            Self::PerCubicCentimeter | Self::PerCubicMeter => Dimension::NumberDensity,
            Self::Kelvin => Dimension::Temperature,
            Self::ErgPerSecond => Dimension::Luminosity,
            Self::ErgPerSecondPerHertz => Dimension::SpectralLuminosity,
        }
    }

    /// Factor converting a value in this unit into the reference unit of its dimension
    /// (yr, Å, cm^-3, K, erg/s, erg/s/Hz).
    fn reference_factor(&self) -> fun {
        match self {
            Self::Year => 1.0,
            Self::Megayear => MYR_TO_YR,
            Self::Gigayear => GYR_TO_YR,
            Self::Angstrom => 1.0,
            Self::Nanometer => NM_TO_ANGSTROM,
            Self::Micron => MICRON_TO_ANGSTROM,
            Self::Centimeter => CM_TO_ANGSTROM,
            Self::Meter => M_TO_ANGSTROM,
            Self::PerCubicCentimeter => 1.0,
            Self::PerCubicMeter => PER_M3_TO_PER_CM3,
            Self::Kelvin | Self::ErgPerSecond | Self::ErgPerSecondPerHertz => 1.0,
        }
    }

    /// Returns the factor that converts values in this unit into the given unit.
    pub fn conversion_factor_to(&self, target: Unit) -> Result<fun, GridError> {
        if self.dimension() != target.dimension() {
            return Err(GridError::IncompatibleUnits {
                from: self.to_string(),
                to: target.to_string(),
            });
        }
        Ok(self.reference_factor() / target.reference_factor())
    }

    /// Returns the symbol used for the unit in stored grids.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Year => "yr",
            Self::Megayear => "Myr",
            Self::Gigayear => "Gyr",
            Self::Angstrom => "Å",
            Self::Nanometer => "nm",
            Self::Micron => "μm",
            Self::Centimeter => "cm",
            Self::Meter => "m",
            Self::PerCubicCentimeter => "cm**(-3)",
            Self::PerCubicMeter => "m**(-3)",
            Self::Kelvin => "K",
            Self::ErgPerSecond => "erg/s",
            Self::ErgPerSecondPerHertz => "erg/(Hz*s)",
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Unit {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "yr" | "year" => Ok(Self::Year),
            "Myr" => Ok(Self::Megayear),
            "Gyr" => Ok(Self::Gigayear),
            "Å" | "A" | "Angstrom" => Ok(Self::Angstrom),
            "nm" => Ok(Self::Nanometer),
            "μm" | "um" | "micron" => Ok(Self::Micron),
            "cm" => Ok(Self::Centimeter),
            "m" => Ok(Self::Meter),
            "cm**(-3)" | "cm^-3" | "1/cm**3" => Ok(Self::PerCubicCentimeter),
            "m**(-3)" | "m^-3" | "1/m**3" => Ok(Self::PerCubicMeter),
            "K" => Ok(Self::Kelvin),
            "erg/s" => Ok(Self::ErgPerSecond),
            "erg/(Hz*s)" | "erg/s/Hz" => Ok(Self::ErgPerSecondPerHertz),
            other => Err(GridError::UnrecognisedUnit(other.to_string())),
        }
    }
}

/// A number with an optional unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantity {
    pub value: fun,
    pub unit: Option<Unit>,
}

impl Quantity {
    pub fn new(value: fun, unit: Unit) -> Self {
        Self {
            value,
            unit: Some(unit),
        }
    }

    /// Returns the value expressed in the given unit.
    ///
    /// A quantity without a unit, or a missing target unit, leaves the value untouched.
    pub fn value_in(&self, target: Option<Unit>) -> Result<fun, GridError> {
        match (self.unit, target) {
            (Some(unit), Some(target)) if unit != target => {
                Ok(self.value * unit.conversion_factor_to(target)?)
            }
            _ => Ok(self.value),
        }
    }
}

impl From<fcn> for Quantity {
    fn from(value: fcn) -> Self {
        Self { value, unit: None }
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{} {}", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Parses a quantity of the form `<value>` or `<value> <unit>`.
impl FromStr for Quantity {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (value_str, unit_str) = match s.split_once(char::is_whitespace) {
            Some((value_str, unit_str)) => (value_str, Some(unit_str)),
            None => (s, None),
        };
        let value = value_str
            .parse::<fun>()
            .map_err(|_| GridError::UnrecognisedUnit(s.to_string()))?;
        Ok(Self {
            value,
            unit: unit_str.map(str::parse).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn same_dimension_units_convert() {
        assert_relative_eq!(
            Unit::Megayear.conversion_factor_to(Unit::Year).unwrap(),
            1e6
        );
        assert_relative_eq!(
            Unit::Micron.conversion_factor_to(Unit::Angstrom).unwrap(),
            1e4
        );
        assert_relative_eq!(
            Quantity::new(2.0, Unit::Gigayear)
                .value_in(Some(Unit::Megayear))
                .unwrap(),
            2000.0
        );
    }

    #[test]
    fn different_dimension_units_are_incompatible() {
        assert!(matches!(
            Unit::Year.conversion_factor_to(Unit::Angstrom),
            Err(GridError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn unitless_quantities_are_not_converted() {
        assert_eq!(Quantity::from(3.5).value_in(Some(Unit::Year)).unwrap(), 3.5);
        assert_eq!(Quantity::new(3.5, Unit::Year).value_in(None).unwrap(), 3.5);
    }

    #[test]
    fn quantities_parse_with_and_without_units() {
        assert_eq!("1.5".parse::<Quantity>().unwrap(), Quantity::from(1.5));
        assert_eq!(
            "10 Myr".parse::<Quantity>().unwrap(),
            Quantity::new(10.0, Unit::Megayear)
        );
        assert!("10 parsec".parse::<Quantity>().is_err());
    }
}
