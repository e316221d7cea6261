//! Multilinear interpolation on a rectilinear lattice.

use super::{Lattice, LatticeInterpolator};
use crate::{error::GridError, grid::fgd};
use ndarray::prelude::*;

/// Interpolator computing the weighted average of the `2^n` lattice points at the
/// corners of the cell containing the interpolation point.
///
/// Corners with zero weight are never read, so interpolating exactly on a lattice
/// point or along the edge of a failed region only requires the models that
/// actually contribute.
#[derive(Clone, Debug)]
pub struct MultilinearInterpolator {
    lattice: Lattice,
    values: ArrayD<fgd>,
    valid: ArrayD<bool>,
}

impl MultilinearInterpolator {
    /// Creates a new interpolator for the given values over the given lattice.
    ///
    /// # Panics
    ///
    /// If the shape of the values or the validity mask differs from the lattice shape.
    pub fn new(lattice: Lattice, values: ArrayD<fgd>, valid: ArrayD<bool>) -> Self {
        assert_eq!(
            values.shape(),
            lattice.shape().as_slice(),
            "Value array shape must match lattice shape"
        );
        assert_eq!(
            valid.shape(),
            values.shape(),
            "Validity mask shape must match value array shape"
        );
        Self {
            lattice,
            values,
            valid,
        }
    }
}

impl LatticeInterpolator for MultilinearInterpolator {
    fn interp(&self, point: &[fgd]) -> Result<fgd, GridError> {
        let n_dims = self.lattice.n_dims();
        if point.len() != n_dims {
            return Err(GridError::GridPointRankMismatch {
                expected: n_dims,
                got: point.len(),
            });
        }

        let cell = self
            .lattice
            .axes()
            .iter()
            .zip(point)
            .map(|(axis, &value)| axis.locate(value))
            .collect::<Result<Vec<_>, _>>()?;

        let mut corner_index = vec![0; n_dims];
        let mut interp_value = 0.0;

        for corner in 0..(1_usize << n_dims) {
            let mut weight = 1.0;
            for (dim, &(lower, fraction)) in cell.iter().enumerate() {
                if (corner >> dim) & 1 == 0 {
                    weight *= 1.0 - fraction;
                    corner_index[dim] = lower;
                } else {
                    weight *= fraction;
                    corner_index[dim] = lower + 1;
                }
                if weight == 0.0 {
                    break;
                }
            }
            if weight == 0.0 {
                continue;
            }
            if !self.valid[corner_index.as_slice()] {
                return Err(GridError::FailedModelInStencil(corner_index));
            }
            interp_value += weight * self.values[corner_index.as_slice()];
        }
        Ok(interp_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axes::{Axis, ParameterSpace};
    use approx::assert_relative_eq;
    use std::collections::BTreeSet;

    fn lattice(log10_axes: &[&str]) -> Lattice {
        let space = ParameterSpace::new(vec![
            Axis::new("log10age", arr1(&[6.0, 7.0, 8.0]), None).unwrap(),
            Axis::new("ionisation_parameter", arr1(&[0.001, 0.01]), None).unwrap(),
        ]);
        let log10_axes: BTreeSet<String> = log10_axes.iter().map(|s| s.to_string()).collect();
        Lattice::new(&space, &log10_axes).unwrap()
    }

    fn values() -> ArrayD<fgd> {
        arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).into_dyn()
    }

    #[test]
    fn lattice_points_are_reproduced() {
        let interpolator = MultilinearInterpolator::new(
            lattice(&[]),
            values(),
            ArrayD::from_elem(IxDyn(&[3, 2]), true),
        );
        assert_eq!(interpolator.interp(&[7.0, 0.01]).unwrap(), 4.0);
        assert_eq!(interpolator.interp(&[8.0, 0.001]).unwrap(), 5.0);
    }

    #[test]
    fn interpolation_is_linear_per_axis() {
        let interpolator = MultilinearInterpolator::new(
            lattice(&[]),
            values(),
            ArrayD::from_elem(IxDyn(&[3, 2]), true),
        );
        assert_relative_eq!(interpolator.interp(&[6.5, 0.001]).unwrap(), 2.0);
        assert_relative_eq!(
            interpolator.interp(&[6.5, 0.0055]).unwrap(),
            2.5,
            max_relative = 1e-12
        );
    }

    #[test]
    fn log10_axes_are_interpolated_in_log_space() {
        let interpolator = MultilinearInterpolator::new(
            lattice(&["ionisation_parameter"]),
            values(),
            ArrayD::from_elem(IxDyn(&[3, 2]), true),
        );
        assert_relative_eq!(
            interpolator.interp(&[6.0, 10_f64.powf(-2.5)]).unwrap(),
            1.5,
            max_relative = 1e-12
        );
    }

    #[test]
    fn failed_models_only_matter_with_nonzero_weight() {
        let mut valid = ArrayD::from_elem(IxDyn(&[3, 2]), true);
        valid[[2, 1].as_slice()] = false;
        let interpolator = MultilinearInterpolator::new(lattice(&[]), values(), valid);

        assert_relative_eq!(interpolator.interp(&[7.5, 0.001]).unwrap(), 4.0);
        assert_eq!(
            interpolator.interp(&[7.5, 0.0055]),
            Err(GridError::FailedModelInStencil(vec![2, 1]))
        );
    }

    #[test]
    fn points_outside_lattice_are_rejected() {
        let interpolator = MultilinearInterpolator::new(
            lattice(&[]),
            values(),
            ArrayD::from_elem(IxDyn(&[3, 2]), true),
        );
        assert!(matches!(
            interpolator.interp(&[9.0, 0.001]),
            Err(GridError::OutOfBounds { .. })
        ));
        assert!(matches!(
            interpolator.interp(&[7.0]),
            Err(GridError::GridPointRankMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn single_valued_axes_accept_only_their_value() {
        let space = ParameterSpace::new(vec![
            Axis::new("log10age", arr1(&[6.0, 7.0]), None).unwrap(),
            Axis::new("metallicity", arr1(&[0.01]), None).unwrap(),
        ]);
        let lattice = Lattice::new(&space, &BTreeSet::new()).unwrap();
        let interpolator = MultilinearInterpolator::new(
            lattice,
            arr2(&[[1.0], [3.0]]).into_dyn(),
            ArrayD::from_elem(IxDyn(&[2, 1]), true),
        );
        assert_relative_eq!(interpolator.interp(&[6.5, 0.01]).unwrap(), 2.0);
        assert!(interpolator.interp(&[6.5, 0.02]).is_err());
    }
}
