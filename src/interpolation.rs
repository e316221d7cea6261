//! Interpolation of grid quantities between grid points.

pub mod multilinear;

use crate::{axes::ParameterSpace, error::GridError, grid::fgd};
use std::collections::BTreeSet;

/// Defines the properties of an interpolator over the lattice of grid points.
pub trait LatticeInterpolator: Clone + Sync + Send {
    /// Computes the interpolated value at the given point.
    ///
    /// # Parameters
    ///
    /// - `point`: One parameter value per lattice axis, in axis order and in the
    /// original (untransformed) axis coordinates.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the interpolated value.
    /// - `Err`: The point lies outside the lattice, has the wrong number of components,
    /// or a model required for the interpolation failed.
    fn interp(&self, point: &[fgd]) -> Result<fgd, GridError>;
}

/// One axis of an interpolation lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeAxis {
    name: String,
    values: Vec<fgd>,
    coords: Vec<fgd>,
    log10: bool,
}

impl LatticeAxis {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, value: fgd) -> fgd {
        if self.log10 {
            value.log10()
        } else {
            value
        }
    }

    fn out_of_bounds(&self, value: fgd) -> GridError {
        GridError::OutOfBounds {
            axis: self.name.clone(),
            value,
            min: self.values[0],
            max: self.values[self.values.len() - 1],
        }
    }

    /// Finds the lower lattice index of the cell containing the given value and the
    /// fractional position of the value inside the cell.
    pub fn locate(&self, value: fgd) -> Result<(usize, fgd), GridError> {
        let x = self.transform(value);
        let n = self.coords.len();
        if n == 1 {
            return if x == self.coords[0] {
                Ok((0, 0.0))
            } else {
                Err(self.out_of_bounds(value))
            };
        }
        if !(x >= self.coords[0] && x <= self.coords[n - 1]) {
            return Err(self.out_of_bounds(value));
        }
        let lower = (self.coords.partition_point(|&coord| coord <= x) - 1).min(n - 2);
        let weight = (x - self.coords[lower]) / (self.coords[lower + 1] - self.coords[lower]);
        Ok((lower, weight))
    }
}

/// Rectilinear lattice spanned by the grid axes, with selected axes transformed
/// to log10 space.
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice {
    axes: Vec<LatticeAxis>,
}

impl Lattice {
    /// Creates the lattice of the given parameter space.
    ///
    /// Axes must be strictly increasing, and axes interpolated in log10 space must
    /// be strictly positive.
    pub fn new(space: &ParameterSpace, log10_axes: &BTreeSet<String>) -> Result<Self, GridError> {
        if let Some(unknown) = log10_axes
            .iter()
            .find(|name| space.axis(name).is_none())
        {
            return Err(GridError::UnknownAxis(unknown.clone()));
        }
        let axes = space
            .axes()
            .iter()
            .map(|axis| {
                let name = axis.name().to_string();
                if axis.is_empty() {
                    return Err(GridError::EmptyAxis(name));
                }
                if !axis.is_strictly_increasing() {
                    return Err(GridError::NonMonotonicAxis(name));
                }
                let values = axis.values().to_vec();
                let log10 = log10_axes.contains(&name);
                let coords = if log10 {
                    if values.iter().any(|&value| value <= 0.0) {
                        return Err(GridError::NonPositiveLog10Axis(name));
                    }
                    values.iter().map(|value| value.log10()).collect()
                } else {
                    values.clone()
                };
                Ok(LatticeAxis {
                    name,
                    values,
                    coords,
                    log10,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { axes })
    }

    pub fn axes(&self) -> &[LatticeAxis] {
        &self.axes
    }

    pub fn n_dims(&self) -> usize {
        self.axes.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|axis| axis.coords.len()).collect()
    }
}
