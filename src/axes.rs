//! Named parameter axes and enumeration of their Cartesian product.

use crate::{error::GridError, grid::fgd, units::Unit};
use ndarray::prelude::*;

/// A named, ordered one-dimensional array of parameter values.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    name: String,
    values: Array1<fgd>,
    unit: Option<Unit>,
}

impl Axis {
    /// Creates a new axis, failing if it has no values.
    pub fn new<S: Into<String>>(
        name: S,
        values: Array1<fgd>,
        unit: Option<Unit>,
    ) -> Result<Self, GridError> {
        let name = name.into();
        if values.is_empty() {
            Err(GridError::EmptyAxis(name))
        } else {
            Ok(Self { name, values, unit })
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &Array1<fgd> {
        &self.values
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the values are strictly increasing.
    pub fn is_strictly_increasing(&self) -> bool {
        self.values
            .windows(2)
            .into_iter()
            .all(|pair| pair[0] < pair[1])
    }
}

/// An ordered set of axes spanning a Cartesian parameter space.
///
/// Points are enumerated with the first axis varying fastest and the last axis
/// slowest, so that for axes `[A, B]` all values of `A` are visited for `b0` before
/// moving on to `b1`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterSpace {
    axes: Vec<Axis>,
}

impl ParameterSpace {
    pub fn new(axes: Vec<Axis>) -> Self {
        Self { axes }
    }

    /// Builds a parameter space from axis names and a lookup of their values.
    pub fn from_names<'a, F>(names: &[&'a str], mut lookup: F) -> Result<Self, GridError>
    where
        F: FnMut(&'a str) -> Option<(Array1<fgd>, Option<Unit>)>,
    {
        names
            .iter()
            .map(|&name| {
                let (values, unit) =
                    lookup(name).ok_or_else(|| GridError::EmptyAxis(name.to_string()))?;
                Axis::new(name, values, unit)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Returns the space spanned by the axes of `self` followed by those of `other`.
    pub fn concatenated(&self, other: &ParameterSpace) -> Self {
        Self::new(self.axes.iter().chain(other.axes.iter()).cloned().collect())
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|axis| axis.name == name)
    }

    pub fn axis_names(&self) -> Vec<&str> {
        self.axes.iter().map(Axis::name).collect()
    }

    pub fn n_axes(&self) -> usize {
        self.axes.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::len).collect()
    }

    /// Returns the number of points in the space. A space without axes holds a
    /// single point.
    pub fn n_models(&self) -> usize {
        self.axes.iter().map(Axis::len).product()
    }

    /// Returns the index tuple of the `k`th point in enumeration order.
    pub fn index_of_model(&self, k: usize) -> Vec<usize> {
        let mut remainder = k;
        self.axes
            .iter()
            .map(|axis| {
                let index = remainder % axis.len();
                remainder /= axis.len();
                index
            })
            .collect()
    }

    /// Returns the index tuple of every point, in enumeration order.
    pub fn index_list(&self) -> Vec<Vec<usize>> {
        (0..self.n_models())
            .map(|k| self.index_of_model(k))
            .collect()
    }

    /// Returns the parameter values of every point, in the same order as
    /// [`index_list`](Self::index_list).
    pub fn model_list(&self) -> Vec<Vec<fgd>> {
        self.index_list()
            .into_iter()
            .map(|indices| {
                indices
                    .iter()
                    .zip(&self.axes)
                    .map(|(&index, axis)| axis.values[index])
                    .collect()
            })
            .collect()
    }
}
