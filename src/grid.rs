//! Photoionisation grids and queries on them.

pub mod data;
pub mod point;

use crate::{
    axes::ParameterSpace,
    error::GridError,
    interpolation::{multilinear::MultilinearInterpolator, Lattice, LatticeInterpolator},
    io::{utils, Verbosity},
    line::{per_wavelength, GridLine, Line, LineCollection},
};
use data::{GridData, LineData};
use ndarray::prelude::*;
use point::{GridPoint, ParameterValues};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt, io,
    path::Path,
};

/// Floating-point precision to use for grid data.
#[allow(non_camel_case_types)]
pub type fgd = f64;

/// Line used to determine which models failed, when present.
pub const REFERENCE_LINE_ID: &str = "H 1 6562.80A";

/// Which axes to interpolate in log10 space.
#[derive(Clone, Debug, PartialEq)]
pub enum Log10Axes {
    /// The given axes. The set is remembered for later [`Log10Axes::Remembered`] requests.
    Explicit(BTreeSet<String>),
    /// The set given in the most recent explicit request (initially none).
    Remembered,
}

impl Log10Axes {
    /// Creates an explicit log10 axis set from axis names.
    pub fn explicit<S: AsRef<str>>(names: &[S]) -> Self {
        Self::Explicit(names.iter().map(|name| name.as_ref().to_string()).collect())
    }

    /// Interpolate every axis linearly.
    pub fn none() -> Self {
        Self::Explicit(BTreeSet::new())
    }
}

/// Equivalent widths [Å] of every line, computed for one escape fraction.
#[derive(Clone, Debug, PartialEq)]
pub struct EquivalentWidths {
    pub escape_fraction: fgd,
    pub widths: BTreeMap<String, ArrayD<fgd>>,
}

/// Grid quantities flattened into one entry per model.
///
/// Models are ordered with the first axis varying slowest.
#[derive(Clone, Debug, PartialEq)]
pub struct FlattenedGrid {
    pub luminosity: BTreeMap<String, Array1<fgd>>,
    /// Empty unless equivalent widths have been calculated.
    pub equivalent_widths: BTreeMap<String, Array1<fgd>>,
    pub axes: Vec<(String, Array1<fgd>)>,
    pub failed_models: Array1<bool>,
}

type InterpolatorKey = (String, BTreeSet<String>);

/// A loaded photoionisation grid.
#[derive(Clone, Debug)]
pub struct Grid {
    name: String,
    data: GridData,
    failed_models: ArrayD<bool>,
    interpolators: HashMap<InterpolatorKey, MultilinearInterpolator>,
    remembered_log10_axes: BTreeSet<String>,
    equivalent_widths: Option<EquivalentWidths>,
}

impl Grid {
    /// Creates a grid from tabulated grid data.
    pub fn new<S: Into<String>>(name: S, data: GridData) -> Self {
        let failed_models = match data
            .line(REFERENCE_LINE_ID)
            .ok()
            .or_else(|| data.lines().first())
        {
            Some(reference_line) => reference_line.valid.mapv(|valid| !valid),
            None => ArrayD::from_elem(IxDyn(&data.axes().shape()), false),
        };
        Self {
            name: name.into(),
            data,
            failed_models,
            interpolators: HashMap::new(),
            remembered_log10_axes: BTreeSet::new(),
            equivalent_widths: None,
        }
    }

    /// Loads the grid stored at the given path, optionally only with the given lines.
    pub fn load<P: AsRef<Path>, S: AsRef<str>>(
        file_path: P,
        line_ids: Option<&[S]>,
        verbosity: &Verbosity,
    ) -> io::Result<Self> {
        let file_path = file_path.as_ref();
        let data = GridData::read(file_path, line_ids, verbosity)?;
        Ok(Self::new(utils::file_stem_str(file_path), data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &GridData {
        &self.data
    }

    pub fn axes(&self) -> &ParameterSpace {
        self.data.axes()
    }

    pub fn axis_names(&self) -> Vec<&str> {
        self.axes().axis_names()
    }

    /// Returns the values of the axis with the given name.
    pub fn axis_values(&self, name: &str) -> Result<&Array1<fgd>, GridError> {
        self.axes()
            .axis(name)
            .map(|axis| axis.values())
            .ok_or_else(|| GridError::UnknownAxis(name.to_string()))
    }

    pub fn n_axes(&self) -> usize {
        self.axes().n_axes()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes().shape()
    }

    pub fn n_models(&self) -> usize {
        self.axes().n_models()
    }

    pub fn line_ids(&self) -> Vec<&str> {
        self.data.line_ids()
    }

    pub fn n_lines(&self) -> usize {
        self.data.lines().len()
    }

    pub fn has_continuum(&self) -> bool {
        self.data.has_continuum()
    }

    /// Returns the rest wavelength [Å] of the given line.
    pub fn wavelength(&self, line_id: &str) -> Result<fgd, GridError> {
        Ok(self.data.line(line_id)?.wavelength)
    }

    /// Returns the mask of grid points whose model failed.
    pub fn failed_models(&self) -> &ArrayD<bool> {
        &self.failed_models
    }

    pub fn n_failed_models(&self) -> usize {
        self.failed_models.iter().filter(|&&failed| failed).count()
    }

    /// Resolves a grid point into an index tuple.
    pub fn resolve_grid_point(&self, grid_point: &GridPoint) -> Result<Vec<usize>, GridError> {
        grid_point.resolve(self.axes())
    }

    /// Returns the grid point whose index along each axis is the nearest one.
    pub fn nearest_grid_point(&self, values: &ParameterValues) -> Result<Vec<usize>, GridError> {
        point::nearest_grid_point(self.axes(), values)
    }

    /// Returns the given line over the whole grid.
    ///
    /// The luminosity is scaled by the covering fraction, and the continuum combines
    /// the nebular and transmitted emission of the covered fraction with the incident
    /// emission of the uncovered fraction. Everything but the nebular emission is
    /// attenuated by the incident escape fraction.
    pub fn get_line(
        &self,
        line_id: &str,
        covering_fraction: fgd,
        incident_escape_fraction: fgd,
    ) -> Result<GridLine, GridError> {
        let line = self.data.line(line_id)?;
        Ok(GridLine {
            id: line.id.clone(),
            wavelength: line.wavelength,
            luminosity: &line.luminosity * covering_fraction,
            continuum: line.continuum.as_ref().map(|continuum| {
                &continuum.nebular * covering_fraction
                    + &continuum.transmitted * (covering_fraction * incident_escape_fraction)
                    + &continuum.incident
                        * ((1.0 - covering_fraction) * incident_escape_fraction)
            }),
            valid: line.valid.clone(),
        })
    }

    /// Returns the given line at the given grid point.
    pub fn get_line_at_grid_point(
        &self,
        grid_point: &GridPoint,
        line_id: &str,
        covering_fraction: fgd,
        incident_escape_fraction: fgd,
    ) -> Result<Line, GridError> {
        let line = self.data.line(line_id)?;
        let indices = self.resolve_grid_point(grid_point)?;
        line_at(line, &indices, covering_fraction, incident_escape_fraction)
    }

    /// Returns the given lines (all if `None`) over the whole grid.
    pub fn get_line_collection<S: AsRef<str>>(
        &self,
        line_ids: Option<&[S]>,
        covering_fraction: fgd,
        incident_escape_fraction: fgd,
    ) -> Result<LineCollection<GridLine>, GridError> {
        self.requested_line_ids(line_ids)
            .iter()
            .map(|line_id| self.get_line(line_id, covering_fraction, incident_escape_fraction))
            .collect::<Result<Vec<_>, _>>()
            .map(LineCollection::new)
    }

    /// Returns the given lines (all if `None`) at the given grid point.
    pub fn get_line_collection_at_grid_point<S: AsRef<str>>(
        &self,
        grid_point: &GridPoint,
        line_ids: Option<&[S]>,
        covering_fraction: fgd,
        incident_escape_fraction: fgd,
    ) -> Result<LineCollection<Line>, GridError> {
        let indices = self.resolve_grid_point(grid_point)?;
        self.requested_line_ids(line_ids)
            .iter()
            .map(|line_id| {
                line_at(
                    self.data.line(line_id)?,
                    &indices,
                    covering_fraction,
                    incident_escape_fraction,
                )
            })
            .collect::<Result<Vec<_>, _>>()
            .map(LineCollection::new)
    }

    /// Builds luminosity interpolators for the given lines (all if `None`).
    ///
    /// An explicit log10 axis set becomes the remembered set used by later
    /// [`Log10Axes::Remembered`] requests.
    pub fn setup_interpolator<S: AsRef<str>>(
        &mut self,
        line_ids: Option<&[S]>,
        log10_axes: &Log10Axes,
    ) -> Result<(), GridError> {
        let log10_axes = self.resolve_log10_axes(log10_axes)?;
        for line_id in self.requested_line_ids(line_ids) {
            self.ensure_interpolator(&line_id, &log10_axes)?;
        }
        Ok(())
    }

    /// Returns the log10 axis set the next remembered request will use.
    pub fn remembered_log10_axes(&self) -> &BTreeSet<String> {
        &self.remembered_log10_axes
    }

    /// Interpolates the luminosity of the given line at the given parameter values,
    /// building the interpolator if it does not exist yet.
    ///
    /// The returned line carries no continuum.
    pub fn get_interpolated_line(
        &mut self,
        parameters: &ParameterValues,
        line_id: &str,
        log10_axes: &Log10Axes,
    ) -> Result<Line, GridError> {
        let log10_axes = self.resolve_log10_axes(log10_axes)?;
        self.interpolated_line(parameters, line_id, &log10_axes)
    }

    /// Interpolates the luminosities of the given lines (all if `None`).
    pub fn get_interpolated_line_collection<S: AsRef<str>>(
        &mut self,
        parameters: &ParameterValues,
        line_ids: Option<&[S]>,
        log10_axes: &Log10Axes,
    ) -> Result<LineCollection<Line>, GridError> {
        let log10_axes = self.resolve_log10_axes(log10_axes)?;
        self.requested_line_ids(line_ids)
            .iter()
            .map(|line_id| self.interpolated_line(parameters, line_id, &log10_axes))
            .collect::<Result<Vec<_>, _>>()
            .map(LineCollection::new)
    }

    /// Computes the equivalent width [Å] of every line over the grid for the given
    /// nebular escape fraction.
    ///
    /// The result is cached and only recomputed for a different escape fraction.
    pub fn calculate_equivalent_widths(
        &mut self,
        escape_fraction: fgd,
    ) -> Result<&EquivalentWidths, GridError> {
        let is_cached = self
            .equivalent_widths
            .as_ref()
            .map_or(false, |cached| cached.escape_fraction == escape_fraction);

        if !is_cached {
            let widths = self
                .data
                .lines()
                .iter()
                .map(|line| {
                    let continuum = line.continuum.as_ref().ok_or(GridError::MissingContinuum)?;
                    let line_luminosity = &line.luminosity * (1.0 - escape_fraction);
                    let continuum_density = (&continuum.nebular * (1.0 - escape_fraction)
                        + &continuum.transmitted)
                        .mapv(|continuum| per_wavelength(continuum, line.wavelength));
                    Ok((line.id.clone(), line_luminosity / continuum_density))
                })
                .collect::<Result<BTreeMap<_, _>, GridError>>()?;
            self.equivalent_widths = Some(EquivalentWidths {
                escape_fraction,
                widths,
            });
        }
        self.equivalent_widths
            .as_ref()
            .ok_or(GridError::MissingContinuum)
    }

    /// Returns the most recently calculated equivalent widths.
    pub fn equivalent_widths(&self) -> Option<&EquivalentWidths> {
        self.equivalent_widths.as_ref()
    }

    /// Flattens luminosities, any calculated equivalent widths, the axis values and
    /// the failed model mask of the given lines (all if `None`).
    pub fn flatten<S: AsRef<str>>(&self, line_ids: Option<&[S]>) -> Result<FlattenedGrid, GridError> {
        let line_ids = self.requested_line_ids(line_ids);

        let luminosity = line_ids
            .iter()
            .map(|line_id| {
                let line = self.data.line(line_id)?;
                Ok((line_id.clone(), flattened(&line.luminosity)))
            })
            .collect::<Result<BTreeMap<_, _>, GridError>>()?;

        let equivalent_widths = match &self.equivalent_widths {
            Some(equivalent_widths) => line_ids
                .iter()
                .filter_map(|line_id| {
                    equivalent_widths
                        .widths
                        .get(line_id)
                        .map(|widths| (line_id.clone(), flattened(widths)))
                })
                .collect(),
            None => BTreeMap::new(),
        };

        let shape = IxDyn(&self.shape());
        let axes = self
            .axes()
            .axes()
            .iter()
            .enumerate()
            .map(|(axis_index, axis)| {
                let mesh = ArrayD::from_shape_fn(shape.clone(), |index| {
                    axis.values()[index[axis_index]]
                });
                (axis.name().to_string(), flattened(&mesh))
            })
            .collect();

        Ok(FlattenedGrid {
            luminosity,
            equivalent_widths,
            axes,
            failed_models: self.failed_models.iter().copied().collect(),
        })
    }

    fn requested_line_ids<S: AsRef<str>>(&self, line_ids: Option<&[S]>) -> Vec<String> {
        match line_ids {
            Some(line_ids) => line_ids.iter().map(|id| id.as_ref().to_string()).collect(),
            None => self.line_ids().into_iter().map(String::from).collect(),
        }
    }

    fn resolve_log10_axes(&mut self, log10_axes: &Log10Axes) -> Result<BTreeSet<String>, GridError> {
        match log10_axes {
            Log10Axes::Explicit(names) => {
                if let Some(unknown) = names.iter().find(|name| self.axes().axis(name).is_none()) {
                    return Err(GridError::UnknownAxis(unknown.clone()));
                }
                self.remembered_log10_axes = names.clone();
                Ok(names.clone())
            }
            Log10Axes::Remembered => Ok(self.remembered_log10_axes.clone()),
        }
    }

    fn ensure_interpolator(
        &mut self,
        line_id: &str,
        log10_axes: &BTreeSet<String>,
    ) -> Result<&MultilinearInterpolator, GridError> {
        let key = (line_id.to_string(), log10_axes.clone());
        if !self.interpolators.contains_key(&key) {
            let line = self.data.line(line_id)?;
            let lattice = Lattice::new(self.data.axes(), log10_axes)?;
            let interpolator =
                MultilinearInterpolator::new(lattice, line.luminosity.clone(), line.valid.clone());
            self.interpolators.insert(key.clone(), interpolator);
        }
        self.interpolators
            .get(&key)
            .ok_or_else(|| GridError::UnknownLine(line_id.to_string()))
    }

    fn interpolated_line(
        &mut self,
        parameters: &ParameterValues,
        line_id: &str,
        log10_axes: &BTreeSet<String>,
    ) -> Result<Line, GridError> {
        let point = parameters.values_in_axis_units(self.data.axes())?;
        let wavelength = self.data.line(line_id)?.wavelength;
        let luminosity = self.ensure_interpolator(line_id, log10_axes)?.interp(&point)?;
        Ok(Line {
            id: line_id.to_string(),
            wavelength,
            luminosity,
            continuum: None,
        })
    }
}

fn line_at(
    line: &LineData,
    indices: &[usize],
    covering_fraction: fgd,
    incident_escape_fraction: fgd,
) -> Result<Line, GridError> {
    if !line.valid[indices] {
        return Err(GridError::FailedGridPoint(indices.to_vec()));
    }
    Ok(Line {
        id: line.id.clone(),
        wavelength: line.wavelength,
        luminosity: covering_fraction * line.luminosity[indices],
        continuum: line.continuum.as_ref().map(|continuum| {
            covering_fraction * continuum.nebular[indices]
                + covering_fraction * incident_escape_fraction * continuum.transmitted[indices]
                + (1.0 - covering_fraction) * incident_escape_fraction * continuum.incident[indices]
        }),
    })
}

/// Flattens an array in row-major order, so the first axis varies slowest.
fn flattened(values: &ArrayD<fgd>) -> Array1<fgd> {
    values.iter().copied().collect()
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n_models = self.n_models();
        let n_failed = self.n_failed_models();
        writeln!(f, "{}", "-".repeat(30))?;
        writeln!(f, "SUMMARY OF GASLIGHT GRID {}", self.name)?;
        writeln!(f, "Grid dimensions:")?;
        writeln!(f, "  Number of axes: {}", self.n_axes())?;
        writeln!(f, "  Grid shape: {:?}", self.shape())?;
        writeln!(f, "  Number of models: {}", n_models)?;
        writeln!(
            f,
            "  Number of failed models: {} ({:.2}%)",
            n_failed,
            100.0 * n_failed as fgd / n_models as fgd
        )?;
        writeln!(f, "  Number of lines: {}", self.n_lines())?;
        writeln!(f, "  Continuum: {}", if self.has_continuum() { "yes" } else { "no" })?;
        writeln!(f, "Grid axes:")?;
        for axis in self.axes().axes() {
            match axis.unit() {
                Some(unit) => writeln!(f, "  {} [{}]: {}", axis.name(), unit, axis.values())?,
                None => writeln!(f, "  {}: {}", axis.name(), axis.values())?,
            }
        }
        write!(f, "{}", "-".repeat(30))
    }
}
