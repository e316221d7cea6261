//! Reading of Cloudy output bundles.

use super::utils;
use crate::{
    assembly::{EmergentLine, OutputBundle, OutputBundleSource},
    constants::CLIGHT_ANGSTROM,
    grid::fgd,
    io_result,
    line::{normalise_line_id, wavelength_from_line_id},
    spectrum::{ContinuumSpectrum, Spectrum},
};
use ndarray::prelude::*;
use std::{
    fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Extension of the emergent line list file of a run.
pub const LINE_LIST_EXTENSION: &str = "emergent_elin";
/// Extension of the continuum file of a run.
pub const CONTINUUM_EXTENSION: &str = "cont";
/// Name of the file listing every line identifier of the grid.
pub const LINE_LIST_FILE_NAME: &str = "linelist.dat";

/// Supported Cloudy versions, which differ in their output file layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloudyVersion {
    /// C17.03: line records are `id <TAB> log10(L)`.
    C17,
    /// C23.01: line records are `id <TAB> wavelength <TAB> log10(L)`.
    C23,
}

impl CloudyVersion {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::C17 => "c17.03",
            Self::C23 => "c23.01",
        }
    }
}

impl fmt::Display for CloudyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for CloudyVersion {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "c17.03" => Ok(Self::C17),
            "c23.01" => Ok(Self::C23),
            other => io_result!(InvalidData, "Unsupported Cloudy version {}", other),
        }
    }
}

/// Directory holding the Cloudy runs of one model.
///
/// The run for photoionisation row `i` and incident row `j` has the path prefix
/// `<root>/<i+1>/<j>`, and the upstream incident spectrum fed into it is stored
/// in `<root>/<j>.ssed.npy`.
#[derive(Clone, Debug)]
pub struct CloudyOutputDirectory {
    root: PathBuf,
    version: CloudyVersion,
}

impl CloudyOutputDirectory {
    pub fn new<P: AsRef<Path>>(root: P, version: CloudyVersion) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            version,
        }
    }

    /// Creates the output directory of the given model under the given directory.
    pub fn for_model<P: AsRef<Path>>(
        output_dir: P,
        model_name: &str,
        version: CloudyVersion,
    ) -> Self {
        Self::new(output_dir.as_ref().join(model_name), version)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version(&self) -> CloudyVersion {
        self.version
    }

    /// Returns the path prefix of the run for the given rows.
    pub fn bundle_prefix(&self, photoionisation_row: usize, incident_row: usize) -> PathBuf {
        self.root
            .join((photoionisation_row + 1).to_string())
            .join(incident_row.to_string())
    }

    pub fn line_list_path(&self) -> PathBuf {
        self.root.join(LINE_LIST_FILE_NAME)
    }

    pub fn incident_snapshot_path(&self, incident_row: usize) -> PathBuf {
        self.root.join(format!("{}.ssed.npy", incident_row))
    }

    /// Reads the identifiers of every line the grid should contain.
    pub fn read_line_list(&self) -> io::Result<Vec<String>> {
        let text = utils::read_text_file(self.line_list_path())?;
        Ok(parse_line_list(&text))
    }
}

impl OutputBundleSource for CloudyOutputDirectory {
    fn load_bundle(
        &self,
        photoionisation_row: usize,
        incident_row: usize,
    ) -> io::Result<Option<OutputBundle>> {
        let prefix = self.bundle_prefix(photoionisation_row, incident_row);
        let line_path = prefix.with_extension(LINE_LIST_EXTENSION);
        let continuum_path = prefix.with_extension(CONTINUUM_EXTENSION);
        if !line_path.is_file() || !continuum_path.is_file() {
            return Ok(None);
        }
        let lines = parse_emergent_lines(&utils::read_text_file(&line_path)?, self.version)
            .map_err(|err| with_path(err, &line_path))?;
        let continuum = parse_continuum(&utils::read_text_file(&continuum_path)?)
            .map_err(|err| with_path(err, &continuum_path))?;
        Ok(Some(OutputBundle { lines, continuum }))
    }

    fn load_original_incident(&self, incident_row: usize) -> io::Result<Spectrum> {
        let path = self.incident_snapshot_path(incident_row);
        if !path.is_file() {
            return io_result!(
                NotFound,
                "Incident spectrum {} not found",
                path.to_string_lossy()
            );
        }
        let samples: Array2<fgd> = ndarray_npy::read_npy(&path).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Could not read {}: {}", path.to_string_lossy(), err),
            )
        })?;
        if samples.nrows() != 2 {
            return io_result!(
                InvalidData,
                "Incident spectrum {} must have two rows (wavelength and luminosity density)",
                path.to_string_lossy()
            );
        }
        Ok(Spectrum::new(samples.row(0).to_vec(), samples.row(1).to_vec()))
    }
}

fn with_path(err: io::Error, path: &Path) -> io::Error {
    io::Error::new(
        err.kind(),
        format!("Error in {}: {}", path.to_string_lossy(), err),
    )
}

/// Parses a line list with one identifier per line.
pub fn parse_line_list(text: &str) -> Vec<String> {
    text.lines()
        .map(normalise_line_id)
        .filter(|line_id| !line_id.is_empty())
        .collect()
}

/// Parses the emergent line records of a run.
pub fn parse_emergent_lines(text: &str, version: CloudyVersion) -> io::Result<Vec<EmergentLine>> {
    text.lines()
        .filter(|row| !row.trim().is_empty() && !row.trim_start().starts_with('#'))
        .map(|row| -> io::Result<EmergentLine> {
            let columns: Vec<&str> = row.split('\t').collect();
            let id = normalise_line_id(columns[0]);
            let (wavelength, log_luminosity) = match (version, columns.as_slice()) {
                (CloudyVersion::C17, [_, log_luminosity, ..]) => {
                    (wavelength_from_line_id(&id)?, *log_luminosity)
                }
                (CloudyVersion::C23, [_, wavelength, log_luminosity, ..]) => {
                    (parse_float(wavelength)?, *log_luminosity)
                }
                _ => {
                    return io_result!(InvalidData, "Too few columns in line record {:?}", row)
                }
            };
            Ok(EmergentLine {
                id,
                wavelength,
                luminosity: fgd::powf(10.0, parse_float(log_luminosity)?),
            })
        })
        .collect()
}

/// Parses a continuum file into luminosity densities per unit frequency,
/// sorted by ascending wavelength.
///
/// Columns are wavelength [Å] followed by the incident, transmitted and diffuse
/// emission as nu*L_nu [erg/s].
pub fn parse_continuum(text: &str) -> io::Result<ContinuumSpectrum> {
    let rows = text
        .lines()
        .filter(|row| !row.trim().is_empty() && !row.trim_start().starts_with('#'))
        .map(|row| {
            row.split_whitespace()
                .map(parse_float)
                .collect::<io::Result<Vec<_>>>()
        })
        .collect::<io::Result<Vec<_>>>()?;

    let n_columns = rows.iter().map(Vec::len).min().unwrap_or(0);
    if rows.is_empty() {
        return Ok(ContinuumSpectrum::default());
    }
    if n_columns == 0 {
        return io_result!(InvalidData, "Continuum has no wavelength column");
    }

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| rows[a][0].total_cmp(&rows[b][0]));

    let wavelength: Vec<fgd> = order.iter().map(|&k| rows[k][0]).collect();
    let column = |column_index: usize| -> Vec<fgd> {
        if n_columns > column_index {
            order
                .iter()
                .map(|&k| rows[k][column_index] * rows[k][0] / CLIGHT_ANGSTROM)
                .collect()
        } else {
            Vec::new()
        }
    };

    Ok(ContinuumSpectrum {
        incident: column(1),
        transmitted: column(2),
        nebular: column(3),
        wavelength,
    })
}

fn parse_float(s: &str) -> io::Result<fgd> {
    s.trim().parse::<fgd>().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid number {:?}", s),
        )
    })
}
