//! Addressing of grid points by index or by parameter values.

use crate::{
    axes::{Axis, ParameterSpace},
    error::GridError,
    units::Quantity,
};
use std::{fmt, str::FromStr};

/// Parameter values given either in axis order or by axis name.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValues {
    Positional(Vec<Quantity>),
    Named(Vec<(String, Quantity)>),
}

impl ParameterValues {
    /// Creates named parameter values from unit-less numbers.
    pub fn named<S: AsRef<str>>(values: &[(S, f64)]) -> Self {
        Self::Named(
            values
                .iter()
                .map(|(name, value)| (name.as_ref().to_string(), Quantity::from(*value)))
                .collect(),
        )
    }

    /// Returns one value per axis of the given space, in axis order.
    ///
    /// Named values must cover every axis and may not name unknown axes.
    pub fn in_axis_order<'a>(
        &'a self,
        space: &ParameterSpace,
    ) -> Result<Vec<&'a Quantity>, GridError> {
        match self {
            Self::Positional(values) => {
                if values.len() != space.n_axes() {
                    Err(GridError::GridPointRankMismatch {
                        expected: space.n_axes(),
                        got: values.len(),
                    })
                } else {
                    Ok(values.iter().collect())
                }
            }
            Self::Named(values) => {
                if let Some((unknown, _)) = values
                    .iter()
                    .find(|(name, _)| space.axis(name).is_none())
                {
                    return Err(GridError::UnknownAxis(unknown.clone()));
                }
                space
                    .axes()
                    .iter()
                    .map(|axis| {
                        values
                            .iter()
                            .find(|(name, _)| name == axis.name())
                            .map(|(_, value)| value)
                            .ok_or_else(|| GridError::MissingParameter(axis.name().to_string()))
                    })
                    .collect()
            }
        }
    }

    /// Returns one value per axis expressed in the unit of the axis.
    pub fn values_in_axis_units(&self, space: &ParameterSpace) -> Result<Vec<f64>, GridError> {
        self.in_axis_order(space)?
            .into_iter()
            .zip(space.axes())
            .map(|(value, axis)| value.value_in(axis.unit()))
            .collect()
    }
}

/// Parses `name=value[ unit],...` as named values or `value[ unit],...` as
/// positional values.
impl FromStr for ParameterValues {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entries: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();
        if entries.iter().all(|entry| entry.contains('=')) && !entries.is_empty() {
            entries
                .into_iter()
                .map(|entry| -> Result<_, GridError> {
                    let (name, value) = entry.split_once('=').unwrap_or((entry, ""));
                    Ok((name.trim().to_string(), value.parse::<Quantity>()?))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Named)
        } else {
            entries
                .into_iter()
                .map(str::parse::<Quantity>)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Positional)
        }
    }
}

impl fmt::Display for ParameterValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = match self {
            Self::Positional(values) => values.iter().map(Quantity::to_string).collect(),
            Self::Named(values) => values
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect(),
        };
        write!(f, "{}", entries.join(","))
    }
}

/// A grid point given either as an index tuple or as parameter values resolved to
/// the nearest grid point.
#[derive(Clone, Debug, PartialEq)]
pub enum GridPoint {
    ByIndex(Vec<usize>),
    ByParameters(ParameterValues),
}

impl GridPoint {
    /// Resolves the grid point into an index tuple of the given space.
    pub fn resolve(&self, space: &ParameterSpace) -> Result<Vec<usize>, GridError> {
        match self {
            Self::ByIndex(indices) => {
                if indices.len() != space.n_axes() {
                    return Err(GridError::GridPointRankMismatch {
                        expected: space.n_axes(),
                        got: indices.len(),
                    });
                }
                for (&index, axis) in indices.iter().zip(space.axes()) {
                    if index >= axis.len() {
                        return Err(GridError::IndexOutOfRange {
                            axis: axis.name().to_string(),
                            index,
                            length: axis.len(),
                        });
                    }
                }
                Ok(indices.clone())
            }
            Self::ByParameters(values) => nearest_grid_point(space, values),
        }
    }
}

impl From<Vec<usize>> for GridPoint {
    fn from(indices: Vec<usize>) -> Self {
        Self::ByIndex(indices)
    }
}

impl From<ParameterValues> for GridPoint {
    fn from(values: ParameterValues) -> Self {
        Self::ByParameters(values)
    }
}

/// Returns the index of the axis value closest to the given value.
///
/// The value is converted into the unit of the axis first. Ties resolve to the
/// lowest index.
pub fn nearest_index(value: &Quantity, axis: &Axis) -> Result<usize, GridError> {
    let value = value.value_in(axis.unit())?;
    let mut nearest = 0;
    let mut smallest_distance = f64::INFINITY;
    for (index, &axis_value) in axis.values().iter().enumerate() {
        let distance = (axis_value - value).abs();
        if distance < smallest_distance {
            nearest = index;
            smallest_distance = distance;
        }
    }
    Ok(nearest)
}

/// Resolves parameter values into the grid point whose index along each axis is
/// independently the nearest one.
pub fn nearest_grid_point(
    space: &ParameterSpace,
    values: &ParameterValues,
) -> Result<Vec<usize>, GridError> {
    values
        .in_axis_order(space)?
        .into_iter()
        .zip(space.axes())
        .map(|(value, axis)| nearest_index(value, axis))
        .collect()
}
