//! Assembly of dense grids from the outputs of individual simulation runs.
//!
//! Every combination of a photoionisation model (row `i`) and an incident
//! spectrum (row `j`) is one run. Its outputs fill the grid cell at the composite
//! index formed by the incident axis indices followed by the photoionisation
//! axis indices.

pub mod manifest;

use crate::{
    axes::ParameterSpace,
    grid::{
        data::{self, GridData, LineContinuumData, LineData},
        fgd,
    },
    io::{
        artifact::{Dataset, GridArtifact},
        cloudy::{CloudyOutputDirectory, CloudyVersion},
        utils, OverwriteMode, Verbosity,
    },
    io_result,
    line::wavelength_from_line_id,
    spectrum::{interp1d, ContinuumSample, ContinuumSpectrum, Spectrum},
};
use indicatif::ParallelProgressIterator;
use ndarray::prelude::*;
use rayon::prelude::*;
use std::{collections::HashMap, fs, io, iter, path::Path};

/// Dataset holding the wavelength grid of the continuum spectra artifact.
pub const SPECTRA_WAVELENGTH_DATASET: &str = "lam";
/// Dataset holding the nebular continuum spectra.
pub const SPECTRA_NEBULAR_DATASET: &str = "nebular_continuum";
/// Dataset holding the ratio of transmitted to incident continuum.
pub const SPECTRA_TRANSMISSION_DATASET: &str = "transmission";
/// Dataset flagging the cells whose spectra were produced.
pub const SPECTRA_VALID_DATASET: &str = "valid";

/// An emission line record of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct EmergentLine {
    pub id: String,
    /// Rest wavelength [Å].
    pub wavelength: fgd,
    /// Emergent luminosity [erg/s].
    pub luminosity: fgd,
}

/// Everything a successful simulation run produced.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputBundle {
    pub lines: Vec<EmergentLine>,
    pub continuum: ContinuumSpectrum,
}

/// Provider of the outputs of the simulation runs of a grid.
pub trait OutputBundleSource: Sync {
    /// Loads the outputs of the run for the given rows.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the run outputs, or `None` if the run failed to produce them.
    /// - `Err`: The outputs exist but could not be read.
    fn load_bundle(
        &self,
        photoionisation_row: usize,
        incident_row: usize,
    ) -> io::Result<Option<OutputBundle>>;

    /// Loads the upstream incident spectrum that was fed into the runs with the
    /// given incident row.
    fn load_original_incident(&self, incident_row: usize) -> io::Result<Spectrum>;
}

/// Options controlling grid assembly.
#[derive(Clone, Debug)]
pub struct AssemblyConfig {
    /// Whether to correct each run for the energy the simulator gained or lost
    /// relative to the upstream incident spectrum.
    pub normalise: bool,
    /// Whether to also collect the full continuum spectra of every run.
    pub save_continuum: bool,
    pub cloudy_version: CloudyVersion,
    pub verbosity: Verbosity,
}

impl AssemblyConfig {
    pub fn new(cloudy_version: CloudyVersion) -> Self {
        Self {
            normalise: true,
            save_continuum: false,
            cloudy_version,
            verbosity: Verbosity::Quiet,
        }
    }

    /// Returns the directory holding the Cloudy runs of the given model, read
    /// with the output layout of the configured Cloudy version.
    pub fn cloudy_outputs<P: AsRef<Path>>(
        &self,
        output_dir: P,
        model_name: &str,
    ) -> CloudyOutputDirectory {
        CloudyOutputDirectory::for_model(output_dir, model_name, self.cloudy_version)
    }
}

/// Values extracted for one line from one run.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LineSample {
    wavelength: fgd,
    luminosity: fgd,
    continuum: ContinuumSample,
}

/// Continuum spectra of one run.
#[derive(Clone, Debug, PartialEq)]
struct CellSpectra {
    wavelength: Vec<fgd>,
    nebular: Vec<fgd>,
    transmission: Option<Vec<fgd>>,
}

/// What a single run contributes to the grid.
#[derive(Clone, Debug, PartialEq)]
enum CellOutcome {
    Failed,
    Completed {
        /// One entry per grid line, `None` if the run lacks the line.
        lines: Vec<Option<LineSample>>,
        spectra: Option<CellSpectra>,
    },
}

/// Dense tables of one line under construction.
struct LineTables {
    wavelength: Option<fgd>,
    luminosity: ArrayD<fgd>,
    incident: ArrayD<fgd>,
    nebular: ArrayD<fgd>,
    transmitted: ArrayD<fgd>,
    valid: ArrayD<bool>,
}

impl LineTables {
    fn new(shape: &[usize]) -> Self {
        let empty = || ArrayD::from_elem(IxDyn(shape), fgd::NAN);
        Self {
            wavelength: None,
            luminosity: empty(),
            incident: empty(),
            nebular: empty(),
            transmitted: empty(),
            valid: ArrayD::from_elem(IxDyn(shape), false),
        }
    }

    /// Writes every quantity of the cell at once.
    fn write(&mut self, index: &[usize], sample: &LineSample) {
        self.wavelength.get_or_insert(sample.wavelength);
        self.luminosity[index] = sample.luminosity;
        self.incident[index] = sample.continuum.incident;
        self.nebular[index] = sample.continuum.nebular;
        self.transmitted[index] = sample.continuum.transmitted;
        self.valid[index] = true;
    }

    fn into_line_data(self, line_id: &str) -> io::Result<LineData> {
        let wavelength = match self.wavelength {
            Some(wavelength) => wavelength,
            None => wavelength_from_line_id(line_id)?,
        };
        Ok(LineData {
            id: line_id.to_string(),
            wavelength,
            luminosity: self.luminosity,
            continuum: Some(LineContinuumData {
                incident: self.incident,
                nebular: self.nebular,
                transmitted: self.transmitted,
            }),
            valid: self.valid,
        })
    }
}

/// Full continuum spectra over the grid, with a trailing wavelength dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuumSpectraGrid {
    pub axes: ParameterSpace,
    /// Wavelengths [Å].
    pub wavelength: Array1<fgd>,
    /// Nebular luminosity density [erg/s/Hz], NaN for failed cells.
    pub nebular_continuum: ArrayD<fgd>,
    /// Ratio of transmitted to incident luminosity density, NaN where undefined.
    pub transmission: ArrayD<fgd>,
    pub valid: ArrayD<bool>,
}

impl ContinuumSpectraGrid {
    fn new(axes: ParameterSpace, wavelength: Vec<fgd>) -> Self {
        let shape = axes.shape();
        let mut spectra_shape = shape.clone();
        spectra_shape.push(wavelength.len());
        Self {
            axes,
            wavelength: Array1::from_vec(wavelength),
            nebular_continuum: ArrayD::from_elem(IxDyn(&spectra_shape), fgd::NAN),
            transmission: ArrayD::from_elem(IxDyn(&spectra_shape), fgd::NAN),
            valid: ArrayD::from_elem(IxDyn(&shape), false),
        }
    }

    fn write_cell(&mut self, index: &[usize], spectra: &CellSpectra) {
        let wavelength = self.wavelength.to_vec();
        // Spectra are resampled onto the common wavelength grid when a run used another one
        let resample = |values: &[fgd]| -> Vec<fgd> {
            if spectra.wavelength == wavelength {
                values.to_vec()
            } else {
                wavelength
                    .iter()
                    .map(|&lam| interp1d(lam, &spectra.wavelength, values))
                    .collect()
            }
        };
        let has_samples = !spectra.wavelength.is_empty();

        let nebular = if has_samples && !spectra.nebular.is_empty() {
            resample(&spectra.nebular)
        } else {
            vec![0.0; wavelength.len()]
        };
        let transmission = match &spectra.transmission {
            Some(transmission) if has_samples => resample(transmission),
            _ => vec![fgd::NAN; wavelength.len()],
        };

        let mut spectrum_index = index.to_vec();
        spectrum_index.push(0);
        let last = spectrum_index.len() - 1;
        for (k, (nebular, transmission)) in nebular.into_iter().zip(transmission).enumerate() {
            spectrum_index[last] = k;
            self.nebular_continuum[spectrum_index.as_slice()] = nebular;
            self.transmission[spectrum_index.as_slice()] = transmission;
        }
        self.valid[index] = true;
    }

    /// Lays the spectra out in a storage container.
    pub fn to_artifact(&self) -> GridArtifact {
        let mut artifact = GridArtifact::new();
        data::write_axes(&mut artifact, &self.axes);
        artifact.insert_dataset(
            SPECTRA_WAVELENGTH_DATASET.to_string(),
            Dataset::Float(self.wavelength.clone().into_dyn()),
        );
        artifact.insert_dataset(
            SPECTRA_NEBULAR_DATASET.to_string(),
            Dataset::Float(self.nebular_continuum.clone()),
        );
        artifact.insert_dataset(
            SPECTRA_TRANSMISSION_DATASET.to_string(),
            Dataset::Float(self.transmission.clone()),
        );
        artifact.insert_dataset(
            SPECTRA_VALID_DATASET.to_string(),
            Dataset::Flags(self.valid.clone()),
        );
        artifact
    }

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

/// Result of assembling a grid.
#[derive(Clone, Debug)]
pub struct AssembledGrid {
    pub data: GridData,
    /// Present when continuum spectra were requested and at least one run succeeded.
    pub continuum_spectra: Option<ContinuumSpectraGrid>,
    /// `(photoionisation_row, incident_row)` of every failed run, in sweep order.
    pub failed_points: Vec<(usize, usize)>,
}

impl AssembledGrid {
    /// Writes the grid as `<model_name>.<extension>` in the given directory, along
    /// with `<model_name>-continuum.<extension>` if spectra were collected and the
    /// failed-point manifest if any run failed.
    ///
    /// Nothing is written unless every grid file may be written. A manifest left
    /// by an earlier assembly is removed when no run failed.
    pub fn write<P: AsRef<Path>>(
        &self,
        grid_dir: P,
        model_name: &str,
        extension: &str,
        overwrite_mode: OverwriteMode,
        verbosity: &Verbosity,
    ) -> io::Result<()> {
        let grid_dir = grid_dir.as_ref();
        let grid_path = grid_dir.join(format!("{}.{}", model_name, extension));
        let spectra_path = self
            .continuum_spectra
            .as_ref()
            .map(|_| grid_dir.join(format!("{}-continuum.{}", model_name, extension)));
        for target_path in iter::once(&grid_path).chain(spectra_path.as_ref()) {
            utils::ensure_write_allowed(target_path, overwrite_mode)?;
        }

        self.data.write(&grid_path, overwrite_mode, verbosity)?;
        if let (Some(continuum_spectra), Some(spectra_path)) =
            (&self.continuum_spectra, &spectra_path)
        {
            continuum_spectra.write(spectra_path, overwrite_mode, verbosity)?;
        }

        let manifest_path = manifest::manifest_path(grid_dir, model_name);
        if !self.failed_points.is_empty() {
            if verbosity.print_messages() {
                println!(
                    "Writing {} failed points to {}",
                    self.failed_points.len(),
                    utils::file_name_str(&manifest_path)
                );
            }
            manifest::write_failed_points(&self.failed_points, manifest_path)?;
        } else if manifest_path.is_file() {
            if verbosity.print_messages() {
                println!(
                    "Removing outdated {}",
                    utils::file_name_str(&manifest_path)
                );
            }
            fs::remove_file(manifest_path)?;
        }
        Ok(())
    }
}

/// Returns the name of the model combining the given incident grid and
/// photoionisation configuration.
pub fn model_name<P: AsRef<Path>, Q: AsRef<Path>>(incident_grid_path: P, config_path: Q) -> String {
    format!(
        "{}-{}",
        utils::file_stem_str(incident_grid_path.as_ref()),
        utils::file_stem_str(config_path.as_ref())
    )
}

/// Assembler of a dense grid from the runs over incident and photoionisation axes.
#[derive(Clone, Debug)]
pub struct GridAssembler {
    incident_axes: ParameterSpace,
    photoionisation_axes: ParameterSpace,
    total_axes: ParameterSpace,
    line_ids: Vec<String>,
}

impl GridAssembler {
    /// Creates an assembler for the given axes and lines.
    pub fn new(
        incident_axes: ParameterSpace,
        photoionisation_axes: ParameterSpace,
        line_ids: Vec<String>,
    ) -> io::Result<Self> {
        if line_ids.is_empty() {
            return io_result!(InvalidInput, "No lines to assemble");
        }
        if let Some(line_id) = line_ids.iter().find(|id| !data::is_valid_line_id(id)) {
            return io_result!(InvalidInput, "Invalid line identifier {:?}", line_id);
        }
        let total_axes = incident_axes.concatenated(&photoionisation_axes);
        Ok(Self {
            incident_axes,
            photoionisation_axes,
            total_axes,
            line_ids,
        })
    }

    /// Creates an assembler for the lines listed in the given Cloudy output directory.
    pub fn for_cloudy_outputs(
        incident_axes: ParameterSpace,
        photoionisation_axes: ParameterSpace,
        output_directory: &CloudyOutputDirectory,
    ) -> io::Result<Self> {
        Self::new(
            incident_axes,
            photoionisation_axes,
            output_directory.read_line_list()?,
        )
    }

    pub fn incident_axes(&self) -> &ParameterSpace {
        &self.incident_axes
    }

    pub fn photoionisation_axes(&self) -> &ParameterSpace {
        &self.photoionisation_axes
    }

    /// Returns the incident axes followed by the photoionisation axes.
    pub fn total_axes(&self) -> &ParameterSpace {
        &self.total_axes
    }

    pub fn line_ids(&self) -> &[String] {
        &self.line_ids
    }

    /// Returns the number of runs.
    pub fn n_cells(&self) -> usize {
        self.photoionisation_axes.n_models() * self.incident_axes.n_models()
    }

    /// Returns the grid index of the cell filled by the given run.
    pub fn composite_index(&self, photoionisation_row: usize, incident_row: usize) -> Vec<usize> {
        let mut index = self.incident_axes.index_of_model(incident_row);
        index.extend(self.photoionisation_axes.index_of_model(photoionisation_row));
        index
    }

    /// Assembles the grid from the runs provided by the given source.
    ///
    /// Failed runs do not abort assembly. Their cells are left invalid and they are
    /// listed in the returned failed points.
    pub fn assemble<B: OutputBundleSource>(
        &self,
        source: &B,
        config: &AssemblyConfig,
    ) -> io::Result<AssembledGrid> {
        let verbosity = &config.verbosity;
        let n_incident = self.incident_axes.n_models();
        let n_cells = self.n_cells();

        if verbosity.print_messages() {
            println!(
                "Assembling {} cells ({} photoionisation models x {} incident spectra)",
                n_cells,
                self.photoionisation_axes.n_models(),
                n_incident
            );
        }

        let original_luminosities = if config.normalise {
            Some(
                (0..n_incident)
                    .into_par_iter()
                    .map(|incident_row| {
                        source
                            .load_original_incident(incident_row)
                            .map(|spectrum| spectrum.bolometric_luminosity())
                    })
                    .collect::<io::Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        let outcomes = (0..n_cells)
            .into_par_iter()
            .progress_with(verbosity.create_progress_bar(n_cells))
            .map(|cell| {
                let (photoionisation_row, incident_row) = (cell / n_incident, cell % n_incident);
                self.process_cell(
                    source,
                    photoionisation_row,
                    incident_row,
                    original_luminosities
                        .as_ref()
                        .map(|luminosities| luminosities[incident_row]),
                    config.save_continuum,
                )
            })
            .collect::<io::Result<Vec<_>>>()?;

        let shape = self.total_axes.shape();
        let mut tables: Vec<LineTables> =
            self.line_ids.iter().map(|_| LineTables::new(&shape)).collect();
        let mut continuum_spectra: Option<ContinuumSpectraGrid> = None;
        let mut failed_points = Vec::new();

        for (cell, outcome) in outcomes.into_iter().enumerate() {
            let (photoionisation_row, incident_row) = (cell / n_incident, cell % n_incident);
            let index = self.composite_index(photoionisation_row, incident_row);
            match outcome {
                CellOutcome::Failed => {
                    if verbosity.print_messages() {
                        println!("Model {} {} failed", photoionisation_row, incident_row);
                    }
                    failed_points.push((photoionisation_row, incident_row));
                }
                CellOutcome::Completed { lines, spectra } => {
                    for ((sample, line_tables), line_id) in
                        lines.iter().zip(&mut tables).zip(&self.line_ids)
                    {
                        match sample {
                            Some(sample) => line_tables.write(&index, sample),
                            None => eprintln!(
                                "Warning: Line {} missing from model {} {}",
                                line_id, photoionisation_row, incident_row
                            ),
                        }
                    }
                    if let Some(spectra) = spectra {
                        continuum_spectra
                            .get_or_insert_with(|| {
                                ContinuumSpectraGrid::new(
                                    self.total_axes.clone(),
                                    spectra.wavelength.clone(),
                                )
                            })
                            .write_cell(&index, &spectra);
                    }
                }
            }
        }

        if config.save_continuum && continuum_spectra.is_none() {
            eprintln!("Warning: No successful runs, continuum spectra not saved");
        }
        if verbosity.print_messages() {
            println!(
                "{} of {} models failed",
                failed_points.len(),
                n_cells
            );
        }

        let lines = tables
            .into_iter()
            .zip(&self.line_ids)
            .map(|(line_tables, line_id)| line_tables.into_line_data(line_id))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(AssembledGrid {
            data: GridData::new(self.total_axes.clone(), lines)?,
            continuum_spectra,
            failed_points,
        })
    }

    fn process_cell<B: OutputBundleSource>(
        &self,
        source: &B,
        photoionisation_row: usize,
        incident_row: usize,
        original_luminosity: Option<fgd>,
        save_continuum: bool,
    ) -> io::Result<CellOutcome> {
        let bundle = match source.load_bundle(photoionisation_row, incident_row)? {
            Some(bundle) => bundle,
            None => return Ok(CellOutcome::Failed),
        };

        let normalisation = match original_luminosity {
            Some(original_luminosity) => match bundle.continuum.incident_spectrum() {
                Some(incident) => {
                    let normalisation = incident.bolometric_luminosity() / original_luminosity;
                    if !normalisation.is_finite() || normalisation <= 0.0 {
                        eprintln!(
                            "Warning: Invalid normalisation factor {} for model {} {}",
                            normalisation, photoionisation_row, incident_row
                        );
                        return Ok(CellOutcome::Failed);
                    }
                    normalisation
                }
                None => {
                    eprintln!(
                        "Warning: Model {} {} has no incident continuum to normalise with",
                        photoionisation_row, incident_row
                    );
                    return Ok(CellOutcome::Failed);
                }
            },
            None => 1.0,
        };

        let records: HashMap<&str, &EmergentLine> = bundle
            .lines
            .iter()
            .map(|record| (record.id.as_str(), record))
            .collect();

        let lines = self
            .line_ids
            .iter()
            .map(|line_id| {
                records.get(line_id.as_str()).map(|record| {
                    LineSample {
                        wavelength: record.wavelength,
                        luminosity: record.luminosity / normalisation,
                        continuum: bundle
                            .continuum
                            .sample_at(record.wavelength)
                            .scaled(1.0 / normalisation),
                    }
                })
            })
            .collect();

        let spectra = if save_continuum {
            Some(CellSpectra {
                nebular: bundle
                    .continuum
                    .nebular
                    .iter()
                    .map(|value| value / normalisation)
                    .collect(),
                transmission: bundle.continuum.transmission(),
                wavelength: bundle.continuum.wavelength,
            })
        } else {
            None
        };

        Ok(CellOutcome::Completed { lines, spectra })
    }
}
