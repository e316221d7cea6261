//! Spectral lines extracted from a grid.

use crate::{
    constants::{CLIGHT_ANGSTROM, MICRON_TO_ANGSTROM},
    error::GridError,
    grid::fgd,
};
use ndarray::prelude::*;
use serde::Serialize;
use std::fmt;

/// Collapses runs of whitespace in a line identifier into single spaces,
/// so that `"H  1 6562.80A"` and `"H 1 6562.80A"` refer to the same line.
pub fn normalise_line_id(line_id: &str) -> String {
    line_id.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the rest wavelength [Å] encoded in the last token of a line identifier.
///
/// A trailing `A` denotes Ångström and a trailing `m` microns.
pub fn wavelength_from_line_id(line_id: &str) -> Result<fgd, GridError> {
    let unrecognised = || GridError::UnrecognisedWavelengthUnit(line_id.to_string());

    let token = line_id.split_whitespace().last().ok_or_else(unrecognised)?;
    let (number, factor) = if let Some(number) = token.strip_suffix('A') {
        (number, 1.0)
    } else if let Some(number) = token.strip_suffix('m') {
        (number, MICRON_TO_ANGSTROM)
    } else {
        return Err(unrecognised());
    };
    number
        .parse::<fgd>()
        .map(|wavelength| wavelength * factor)
        .map_err(|_| unrecognised())
}

/// Converts a luminosity density per unit frequency at the given wavelength [Å]
/// into a luminosity density per unit wavelength [erg/s/Å].
pub fn per_wavelength(luminosity_density: fgd, wavelength: fgd) -> fgd {
    luminosity_density * CLIGHT_ANGSTROM / (wavelength * wavelength)
}

/// Anything identified by a line identifier.
pub trait LineRecord {
    fn id(&self) -> &str;
}

/// A line evaluated at a single grid point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Line {
    pub id: String,
    /// Rest wavelength [Å].
    pub wavelength: fgd,
    /// Luminosity [erg/s].
    pub luminosity: fgd,
    /// Continuum luminosity density under the line [erg/s/Hz].
    pub continuum: Option<fgd>,
}

impl Line {
    /// Returns the element symbol of the line.
    pub fn element(&self) -> &str {
        self.id.split_whitespace().next().unwrap_or("")
    }

    /// Computes the equivalent width [Å] against the line's own continuum.
    pub fn equivalent_width(&self) -> Result<fgd, GridError> {
        let continuum = self.continuum.ok_or(GridError::MissingContinuum)?;
        Ok(self.luminosity / per_wavelength(continuum, self.wavelength))
    }

    /// Sums the luminosities and continua of two evaluations of the same line.
    pub fn try_add(&self, other: &Line) -> Result<Line, GridError> {
        if self.id != other.id {
            return Err(GridError::InconsistentLineAddition {
                first: self.id.clone(),
                second: other.id.clone(),
            });
        }
        Ok(Line {
            id: self.id.clone(),
            wavelength: self.wavelength,
            luminosity: self.luminosity + other.luminosity,
            continuum: match (self.continuum, other.continuum) {
                (Some(a), Some(b)) => Some(a + b),
                _ => None,
            },
        })
    }
}

impl LineRecord for Line {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "-".repeat(10))?;
        writeln!(f, "SUMMARY OF {}", self.id)?;
        writeln!(f, "wavelength: {:.1} Å", self.wavelength)?;
        writeln!(
            f,
            "log10(luminosity/(erg/s)): {:.2}",
            self.luminosity.log10()
        )?;
        if let Some(continuum) = self.continuum {
            writeln!(f, "continuum: {:e} erg/(Hz*s)", continuum)?;
        }
        write!(f, "{}", "-".repeat(10))
    }
}

/// A line over every point of a grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GridLine {
    pub id: String,
    /// Rest wavelength [Å].
    pub wavelength: fgd,
    /// Luminosity over the grid [erg/s].
    pub luminosity: ArrayD<fgd>,
    /// Continuum luminosity density over the grid [erg/s/Hz].
    pub continuum: Option<ArrayD<fgd>>,
    /// Whether the model at each grid point succeeded.
    pub valid: ArrayD<bool>,
}

impl GridLine {
    /// Evaluates the line at the given grid point.
    pub fn at(&self, grid_point: &[usize]) -> Result<Line, GridError> {
        if grid_point.len() != self.luminosity.ndim() {
            return Err(GridError::GridPointRankMismatch {
                expected: self.luminosity.ndim(),
                got: grid_point.len(),
            });
        }
        match self.valid.get(grid_point) {
            Some(true) => {}
            Some(false) => return Err(GridError::FailedGridPoint(grid_point.to_vec())),
            None => return Err(index_out_of_range(grid_point, self.valid.shape())),
        }
        Ok(Line {
            id: self.id.clone(),
            wavelength: self.wavelength,
            luminosity: self.luminosity[grid_point],
            continuum: self.continuum.as_ref().map(|continuum| continuum[grid_point]),
        })
    }
}

impl LineRecord for GridLine {
    fn id(&self) -> &str {
        &self.id
    }
}

fn index_out_of_range(grid_point: &[usize], shape: &[usize]) -> GridError {
    grid_point
        .iter()
        .zip(shape)
        .enumerate()
        .find(|(_, (&index, &length))| index >= length)
        .map(|(axis, (&index, &length))| GridError::IndexOutOfRange {
            axis: axis.to_string(),
            index,
            length,
        })
        .unwrap_or_else(|| GridError::GridPointRankMismatch {
            expected: shape.len(),
            got: grid_point.len(),
        })
}

/// An ordered set of lines that can be looked up by identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct LineCollection<L> {
    lines: Vec<L>,
}

impl<L: LineRecord> LineCollection<L> {
    pub fn new(lines: Vec<L>) -> Self {
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.lines.iter().map(LineRecord::id).collect()
    }

    pub fn get(&self, line_id: &str) -> Option<&L> {
        self.lines.iter().find(|line| line.id() == line_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wavelengths_are_parsed_from_ids() {
        assert_relative_eq!(wavelength_from_line_id("H 1 6562.80A").unwrap(), 6562.8);
        assert_relative_eq!(wavelength_from_line_id("O 3 5006.84A").unwrap(), 5006.84);
        assert_relative_eq!(
            wavelength_from_line_id("H 1 4.05116m").unwrap(),
            40511.6,
            max_relative = 1e-12
        );
    }

    #[test]
    fn unknown_wavelength_units_are_rejected() {
        assert_eq!(
            wavelength_from_line_id("CO 2600.05c"),
            Err(GridError::UnrecognisedWavelengthUnit(
                "CO 2600.05c".to_string()
            ))
        );
        assert!(wavelength_from_line_id("").is_err());
    }

    #[test]
    fn line_ids_are_normalised() {
        assert_eq!(normalise_line_id("H  1  6562.80A "), "H 1 6562.80A");
    }

    #[test]
    fn lines_of_different_ids_cannot_be_added() {
        let line = Line {
            id: "H 1 6562.80A".to_string(),
            wavelength: 6562.8,
            luminosity: 1.0,
            continuum: Some(2.0),
        };
        let sum = line.try_add(&line).unwrap();
        assert_eq!(sum.luminosity, 2.0);
        assert_eq!(sum.continuum, Some(4.0));
        assert_eq!(line.element(), "H");

        let other = Line {
            id: "H 1 4861.32A".to_string(),
            ..line.clone()
        };
        assert!(line.try_add(&other).is_err());
    }

    #[test]
    fn failed_grid_points_are_reported() {
        let grid_line = GridLine {
            id: "H 1 6562.80A".to_string(),
            wavelength: 6562.8,
            luminosity: arr2(&[[1.0, f64::NAN]]).into_dyn(),
            continuum: None,
            valid: arr2(&[[true, false]]).into_dyn(),
        };
        assert_eq!(grid_line.at(&[0, 0]).unwrap().luminosity, 1.0);
        assert_eq!(
            grid_line.at(&[0, 1]),
            Err(GridError::FailedGridPoint(vec![0, 1]))
        );
        assert!(matches!(
            grid_line.at(&[0]),
            Err(GridError::GridPointRankMismatch {
                expected: 2,
                got: 1
            })
        ));
        assert!(matches!(
            grid_line.at(&[1, 0]),
            Err(GridError::IndexOutOfRange { index: 1, length: 1, .. })
        ));
    }
}
