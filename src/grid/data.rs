//! Tabulated grid data and its mapping onto the storage container.

use super::fgd;
use crate::{
    axes::{Axis, ParameterSpace},
    error::GridError,
    io::{
        artifact::{Dataset, GridArtifact},
        OverwriteMode, Verbosity,
    },
    io_result,
    line::wavelength_from_line_id,
    units::Unit,
};
use ndarray::prelude::*;
use std::{io, path::Path};

/// Top-level attribute listing the axis names in grid order.
pub const AXES_ATTRIBUTE: &str = "axes";
/// Top-level attribute listing the axis units (empty for unit-less axes).
pub const AXIS_UNITS_ATTRIBUTE: &str = "axis_units";
/// Top-level attribute listing the line identifiers in grid order.
pub const LINES_ATTRIBUTE: &str = "lines";

pub const AXES_NAMESPACE: &str = "axes";
pub const WAVELENGTH_NAMESPACE: &str = "wavelength";
pub const LUMINOSITY_NAMESPACE: &str = "luminosity";
pub const INCIDENT_CONTINUUM_NAMESPACE: &str = "incident_continuum";
pub const NEBULAR_CONTINUUM_NAMESPACE: &str = "nebular_continuum";
pub const TRANSMITTED_CONTINUUM_NAMESPACE: &str = "transmitted_continuum";
pub const VALID_NAMESPACE: &str = "valid";

/// Continuum luminosity densities under a line over the grid [erg/s/Hz].
#[derive(Clone, Debug, PartialEq)]
pub struct LineContinuumData {
    pub incident: ArrayD<fgd>,
    pub nebular: ArrayD<fgd>,
    pub transmitted: ArrayD<fgd>,
}

/// Tabulated values of one line over the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct LineData {
    pub id: String,
    /// Rest wavelength [Å].
    pub wavelength: fgd,
    /// Luminosity [erg/s], NaN where the model failed.
    pub luminosity: ArrayD<fgd>,
    pub continuum: Option<LineContinuumData>,
    /// Whether the model at each grid point produced this line.
    pub valid: ArrayD<bool>,
}

impl LineData {
    fn shapes_match(&self, shape: &[usize]) -> bool {
        self.luminosity.shape() == shape
            && self.valid.shape() == shape
            && self.continuum.as_ref().map_or(true, |continuum| {
                continuum.incident.shape() == shape
                    && continuum.nebular.shape() == shape
                    && continuum.transmitted.shape() == shape
            })
    }
}

/// Axes and per-line tables of a grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GridData {
    axes: ParameterSpace,
    lines: Vec<LineData>,
}

impl GridData {
    /// Creates grid data, verifying that every table has the shape of the axes.
    ///
    /// Line identifiers name datasets in the storage container and may not
    /// contain `/`.
    pub fn new(axes: ParameterSpace, lines: Vec<LineData>) -> io::Result<Self> {
        if let Some(line) = lines.iter().find(|line| !is_valid_line_id(&line.id)) {
            return io_result!(InvalidInput, "Invalid line identifier {:?}", line.id);
        }
        let shape = axes.shape();
        if let Some(line) = lines.iter().find(|line| !line.shapes_match(&shape)) {
            return io_result!(
                InvalidData,
                "Tables of line {} do not have the grid shape {:?}",
                line.id,
                shape
            );
        }
        Ok(Self { axes, lines })
    }

    pub fn axes(&self) -> &ParameterSpace {
        &self.axes
    }

    pub fn lines(&self) -> &[LineData] {
        &self.lines
    }

    pub fn line_ids(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line.id.as_str()).collect()
    }

    pub fn line(&self, line_id: &str) -> Result<&LineData, GridError> {
        self.lines
            .iter()
            .find(|line| line.id == line_id)
            .ok_or_else(|| GridError::UnknownLine(line_id.to_string()))
    }

    /// Whether continuum tables exist for every line.
    pub fn has_continuum(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|line| line.continuum.is_some())
    }

    /// Returns grid data holding only the given lines, in the given order.
    pub fn subset<S: AsRef<str>>(&self, line_ids: &[S]) -> Result<Self, GridError> {
        let lines = line_ids
            .iter()
            .map(|line_id| self.line(line_id.as_ref()).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            axes: self.axes.clone(),
            lines,
        })
    }

    /// Lays the grid out in a storage container.
    pub fn to_artifact(&self) -> GridArtifact {
        let mut artifact = GridArtifact::new();
        write_axes(&mut artifact, &self.axes);
        artifact.set_attribute(LINES_ATTRIBUTE, &self.line_ids());
        for line in &self.lines {
            artifact.insert_float(WAVELENGTH_NAMESPACE, &line.id, arr0(line.wavelength));
            artifact.insert_float(LUMINOSITY_NAMESPACE, &line.id, line.luminosity.clone());
            if let Some(continuum) = &line.continuum {
                artifact.insert_float(
                    INCIDENT_CONTINUUM_NAMESPACE,
                    &line.id,
                    continuum.incident.clone(),
                );
                artifact.insert_float(
                    NEBULAR_CONTINUUM_NAMESPACE,
                    &line.id,
                    continuum.nebular.clone(),
                );
                artifact.insert_float(
                    TRANSMITTED_CONTINUUM_NAMESPACE,
                    &line.id,
                    continuum.transmitted.clone(),
                );
            }
            artifact.insert_flags(VALID_NAMESPACE, &line.id, line.valid.clone());
        }
        artifact
    }

    /// Reconstructs grid data from a storage container, optionally keeping only
    /// the given lines.
    pub fn from_artifact<S: AsRef<str>>(
        artifact: &GridArtifact,
        line_ids: Option<&[S]>,
    ) -> io::Result<Self> {
        let axes = axes_from_artifact(artifact)?;
        let shape = axes.shape();

        let line_ids: Vec<String> = match line_ids {
            Some(line_ids) => line_ids.iter().map(|id| id.as_ref().to_string()).collect(),
            None => match artifact.attribute(LINES_ATTRIBUTE) {
                Some(line_ids) => line_ids.to_vec(),
                None => artifact
                    .members(LUMINOSITY_NAMESPACE)
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
        };

        let lines = line_ids
            .into_iter()
            .map(|line_id| read_line(artifact, line_id))
            .collect::<io::Result<Vec<_>>>()?;

        if let Some(line) = lines.iter().find(|line| !line.shapes_match(&shape)) {
            return io_result!(
                InvalidData,
                "Tables of line {} do not have the grid shape {:?}",
                line.id,
                shape
            );
        }
        Ok(Self { axes, lines })
    }

    /// Reads grid data from the file at the given path.
    pub fn read<P: AsRef<Path>, S: AsRef<str>>(
        file_path: P,
        line_ids: Option<&[S]>,
        verbosity: &Verbosity,
    ) -> io::Result<Self> {
        let artifact = GridArtifact::read(file_path, verbosity)?;
        Self::from_artifact(&artifact, line_ids)
    }

    /// Writes the grid data to a new file at the given path.
    pub fn write<P: AsRef<Path>>(
        &self,
        file_path: P,
        overwrite_mode: OverwriteMode,
        verbosity: &Verbosity,
    ) -> io::Result<()> {
        self.to_artifact()
            .write(file_path, overwrite_mode, verbosity)
    }
}

fn read_line(artifact: &GridArtifact, line_id: String) -> io::Result<LineData> {
    if artifact
        .dataset(&format!("{}/{}", LUMINOSITY_NAMESPACE, line_id))
        .is_none()
    {
        return Err(GridError::UnknownLine(line_id).into());
    }
    let luminosity = artifact.float(LUMINOSITY_NAMESPACE, &line_id)?.clone();

    let wavelength = match artifact.float(WAVELENGTH_NAMESPACE, &line_id) {
        Ok(wavelength) => match wavelength.iter().next() {
            Some(&wavelength) => wavelength,
            None => return io_result!(InvalidData, "Empty wavelength for line {}", line_id),
        },
        Err(_) => wavelength_from_line_id(&line_id)?,
    };

    let continuum = match (
        artifact.float(INCIDENT_CONTINUUM_NAMESPACE, &line_id),
        artifact.float(NEBULAR_CONTINUUM_NAMESPACE, &line_id),
        artifact.float(TRANSMITTED_CONTINUUM_NAMESPACE, &line_id),
    ) {
        (Ok(incident), Ok(nebular), Ok(transmitted)) => Some(LineContinuumData {
            incident: incident.clone(),
            nebular: nebular.clone(),
            transmitted: transmitted.clone(),
        }),
        _ => None,
    };

    // Containers without a validity mask mark failed models with non-finite values
    let valid = match artifact.flags(VALID_NAMESPACE, &line_id) {
        Some(valid) => valid.clone(),
        None => luminosity.mapv(fgd::is_finite),
    };

    Ok(LineData {
        id: line_id,
        wavelength,
        luminosity,
        continuum,
        valid,
    })
}

/// Whether the given line identifier can name a dataset.
pub fn is_valid_line_id(line_id: &str) -> bool {
    !line_id.is_empty() && !line_id.contains('/')
}

/// Stores the axis names, units and values in the given container.
pub fn write_axes(artifact: &mut GridArtifact, axes: &ParameterSpace) {
    artifact.set_attribute(AXES_ATTRIBUTE, &axes.axis_names());
    let units: Vec<String> = axes
        .axes()
        .iter()
        .map(|axis| axis.unit().map(|unit| unit.to_string()).unwrap_or_default())
        .collect();
    artifact.set_attribute(AXIS_UNITS_ATTRIBUTE, &units);
    for axis in axes.axes() {
        artifact.insert_float(AXES_NAMESPACE, axis.name(), axis.values().clone());
    }
}

/// Reads the axes listed in the `axes` attribute of the given container.
pub fn axes_from_artifact(artifact: &GridArtifact) -> io::Result<ParameterSpace> {
    let names = match artifact.attribute(AXES_ATTRIBUTE) {
        Some(names) => names,
        None => return io_result!(InvalidData, "Grid has no {} attribute", AXES_ATTRIBUTE),
    };
    let units = artifact.attribute(AXIS_UNITS_ATTRIBUTE);
    if let Some(units) = units {
        if units.len() != names.len() {
            return io_result!(
                InvalidData,
                "Grid has {} axes but {} axis units",
                names.len(),
                units.len()
            );
        }
    }

    let axes = names
        .iter()
        .enumerate()
        .map(|(axis_index, name)| -> io::Result<Axis> {
            let values = match artifact.dataset(&format!("{}/{}", AXES_NAMESPACE, name)) {
                Some(Dataset::Float(values)) if values.ndim() == 1 => {
                    Array1::from_iter(values.iter().copied())
                }
                Some(_) => return io_result!(InvalidData, "Axis {} is not one-dimensional", name),
                None => return io_result!(InvalidData, "Values of axis {} not found", name),
            };
            let unit = match units.map(|units| units[axis_index].as_str()) {
                Some(symbol) if !symbol.is_empty() => Some(symbol.parse::<Unit>()?),
                _ => None,
            };
            Ok(Axis::new(name.as_str(), values, unit)?)
        })
        .collect::<io::Result<Vec<_>>>()?;
    Ok(ParameterSpace::new(axes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_data() -> GridData {
        let axes = ParameterSpace::new(vec![
            Axis::new("log10age", arr1(&[6.0, 7.0]), None).unwrap(),
            Axis::new("hydrogen_density", arr1(&[10.0, 100.0, 1000.0]), Some(Unit::PerCubicCentimeter))
                .unwrap(),
        ]);
        let valid = arr2(&[[true, true, false], [true, true, true]]).into_dyn();
        let luminosity = arr2(&[[1e40, 2e40, f64::NAN], [3e40, 4e40, 5e40]]).into_dyn();
        let continuum = LineContinuumData {
            incident: ArrayD::from_elem(IxDyn(&[2, 3]), 1e20),
            nebular: ArrayD::from_elem(IxDyn(&[2, 3]), 2e20),
            transmitted: ArrayD::from_elem(IxDyn(&[2, 3]), 3e20),
        };
        GridData::new(
            axes,
            vec![
                LineData {
                    id: "H 1 6562.80A".to_string(),
                    wavelength: 6562.80,
                    luminosity: luminosity.clone(),
                    continuum: Some(continuum),
                    valid: valid.clone(),
                },
                LineData {
                    id: "O 3 5006.84A".to_string(),
                    wavelength: 5006.84,
                    luminosity,
                    continuum: None,
                    valid,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn artifact_layout_reproduces_grid_data() {
        let data = example_data();
        let artifact = data.to_artifact();
        assert_eq!(
            artifact.attribute(AXES_ATTRIBUTE).unwrap(),
            &["log10age", "hydrogen_density"]
        );
        assert_eq!(artifact.attribute(AXIS_UNITS_ATTRIBUTE).unwrap(), &["", "cm**(-3)"]);

        let read = GridData::from_artifact::<&str>(&artifact, None).unwrap();
        assert_eq!(read.axes(), data.axes());
        assert_eq!(read.line_ids(), data.line_ids());
        let line = read.line("H 1 6562.80A").unwrap();
        assert!(line.luminosity[[0, 2]].is_nan());
        assert!(!line.valid[[0, 2]]);
        assert_eq!(line.luminosity[[1, 2]], 5e40);
        assert!(line.continuum.is_some());
        assert!(read.line("O 3 5006.84A").unwrap().continuum.is_none());
        assert!(!read.has_continuum());
    }

    #[test]
    fn requested_lines_must_exist() {
        let artifact = example_data().to_artifact();
        let read = GridData::from_artifact(&artifact, Some(&["O 3 5006.84A"][..])).unwrap();
        assert_eq!(read.line_ids(), vec!["O 3 5006.84A"]);

        let err = GridData::from_artifact(&artifact, Some(&["N 2 6583.45A"][..])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn missing_validity_is_derived_from_finiteness() {
        let mut artifact = GridArtifact::new();
        write_axes(&mut artifact, example_data().axes());
        artifact.insert_float(
            LUMINOSITY_NAMESPACE,
            "H 1 4861.32A",
            arr2(&[[1.0, f64::NAN, 2.0], [3.0, 4.0, 5.0]]),
        );
        let read = GridData::from_artifact::<&str>(&artifact, None).unwrap();
        let line = read.line("H 1 4861.32A").unwrap();
        assert_eq!(line.wavelength, 4861.32);
        assert!(!line.valid[[0, 1]]);
        assert!(line.valid[[1, 1]]);
    }

    #[test]
    fn subsets_keep_axes_and_requested_lines() {
        let data = example_data();
        let subset = data.subset(&["O 3 5006.84A"]).unwrap();
        assert_eq!(subset.axes(), data.axes());
        assert_eq!(subset.line_ids(), vec!["O 3 5006.84A"]);
        assert_eq!(
            data.subset(&["missing"]),
            Err(GridError::UnknownLine("missing".to_string()))
        );
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let data = example_data();
        let mut line = data.lines()[1].clone();
        line.luminosity = ArrayD::zeros(IxDyn(&[3, 2]));
        assert!(GridData::new(data.axes().clone(), vec![line]).is_err());
    }

    #[test]
    fn line_order_survives_the_container() {
        let data = example_data();
        let reversed = data.subset(&["O 3 5006.84A", "H 1 6562.80A"]).unwrap();
        let artifact = reversed.to_artifact();
        assert_eq!(
            artifact.attribute(LINES_ATTRIBUTE).unwrap(),
            &["O 3 5006.84A", "H 1 6562.80A"]
        );
        let read = GridData::from_artifact::<&str>(&artifact, None).unwrap();
        assert_eq!(read.line_ids(), vec!["O 3 5006.84A", "H 1 6562.80A"]);
    }

    #[test]
    fn line_ids_with_slashes_are_rejected() {
        let data = example_data();
        let mut line = data.lines()[1].clone();
        line.id = "Fe 2/3 1.64m".to_string();
        let err = GridData::new(data.axes().clone(), vec![line]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
