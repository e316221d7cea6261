#![allow(dead_code)]

use gaslight::{constants::CLIGHT_ANGSTROM, exit_on_error, grid::fgd};
use ndarray::prelude::*;
use std::{
    collections::HashSet,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

pub const HALPHA: &str = "H 1 6562.80A";
pub const HBETA: &str = "H 1 4861.32A";
pub const OIII: &str = "O 3 5006.84A";

/// Line identifiers with rest wavelengths and luminosity scales of the fixture runs.
pub const LINES: [(&str, fgd, fgd); 3] = [
    (HALPHA, 6562.80, 1e40),
    (HBETA, 4861.32, 3.5e39),
    (OIII, 5006.84, 8e39),
];

pub const INCIDENT_GRID_NAME: &str = "bpass";
pub const CONFIG_NAME: &str = "c23.01-test";
pub const MODEL_NAME: &str = "bpass-c23.01-test";

pub const INCIDENT_AXES: &str = "\
log10age: [6.0, 7.0]
metallicity: [0.01, 0.02]
";

pub const CONFIG: &str = "\
cloudy_version: c23.01
hydrogen_density: 100.0
abundance_scalings:
  nitrogen: 1.0
ionisation_parameter: [0.001, 0.01, 0.1]
";

/// Wavelengths [Å] of the fixture continua.
pub const CONTINUUM_WAVELENGTHS: [fgd; 5] = [1000.0, 3000.0, 5000.0, 7000.0, 9000.0];

#[cfg(feature = "cli")]
pub fn run<I, T>(args: I)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    gaslight::cli::run::run_with_args(gaslight::cli::build::build().get_matches_from(args));
}

pub fn assert_file_exists<P: AsRef<Path>>(file_path: P) {
    let file_path = file_path.as_ref();
    assert!(
        file_path.exists(),
        "File {} does not exist",
        file_path.to_string_lossy()
    );
}

/// Luminosity of the given line in the fixture run with the given rows.
pub fn run_luminosity(line_scale: fgd, photoionisation_row: usize, incident_row: usize) -> fgd {
    line_scale * (1.0 + 10.0 * photoionisation_row as fgd + incident_row as fgd)
}

/// Incident luminosity density [erg/s/Hz] of the upstream spectra.
pub fn original_incident() -> Vec<fgd> {
    CONTINUUM_WAVELENGTHS
        .iter()
        .map(|&lam| 1e20 * lam / 1000.0)
        .collect()
}

/// Scratch directory holding the inputs and outputs of one test.
#[derive(Debug)]
pub struct Test {
    dir: TempDir,
}

impl Test {
    pub fn new() -> Self {
        Self {
            dir: exit_on_error!(TempDir::new(), "Error: Could not create test directory: {}"),
        }
    }

    pub fn path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.dir.path().join(file_name.as_ref())
    }

    pub fn write_text<S: AsRef<str>>(&self, file_name: S, text: &str) -> PathBuf {
        let file_path = self.path(file_name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file_path, text).unwrap();
        file_path
    }

    pub fn incident_axes_path(&self) -> PathBuf {
        self.write_text(format!("{}.yaml", INCIDENT_GRID_NAME), INCIDENT_AXES)
    }

    pub fn config_path(&self) -> PathBuf {
        self.write_text(format!("{}.yaml", CONFIG_NAME), CONFIG)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("output")
    }

    pub fn grid_dir(&self) -> PathBuf {
        self.path("grids")
    }
}

/// Writes the Cloudy outputs of a small grid with 4 incident spectra and
/// 3 photoionisation models.
pub struct CloudyFixture {
    pub root: PathBuf,
    /// Runs whose continuum file is never written.
    pub failed: HashSet<(usize, usize)>,
    /// Factor between the incident continuum Cloudy reports and the upstream spectrum.
    pub incident_gain: fgd,
}

impl CloudyFixture {
    pub const N_INCIDENT: usize = 4;
    pub const N_PHOTOIONISATION: usize = 3;

    pub fn new(test: &Test) -> Self {
        Self {
            root: test.output_dir().join(MODEL_NAME),
            failed: HashSet::new(),
            incident_gain: 1.0,
        }
    }

    pub fn write(&self) {
        fs::create_dir_all(&self.root).unwrap();
        let line_list: String = LINES.iter().map(|(id, _, _)| format!("{}\n", id)).collect();
        fs::write(self.root.join("linelist.dat"), line_list).unwrap();

        for incident_row in 0..Self::N_INCIDENT {
            let samples = Array2::from_shape_fn((2, CONTINUUM_WAVELENGTHS.len()), |(row, k)| {
                if row == 0 {
                    CONTINUUM_WAVELENGTHS[k]
                } else {
                    original_incident()[k]
                }
            });
            ndarray_npy::write_npy(self.root.join(format!("{}.ssed.npy", incident_row)), &samples)
                .unwrap();
        }

        for photoionisation_row in 0..Self::N_PHOTOIONISATION {
            let run_dir = self.root.join((photoionisation_row + 1).to_string());
            fs::create_dir_all(&run_dir).unwrap();
            for incident_row in 0..Self::N_INCIDENT {
                let lines: String = LINES
                    .iter()
                    .map(|&(id, wavelength, scale)| {
                        format!(
                            "{}\t{}\t{}\n",
                            id,
                            wavelength,
                            run_luminosity(scale, photoionisation_row, incident_row).log10()
                        )
                    })
                    .collect();
                fs::write(
                    run_dir.join(format!("{}.emergent_elin", incident_row)),
                    format!("#lineslist\n{}", lines),
                )
                .unwrap();

                if self.failed.contains(&(photoionisation_row, incident_row)) {
                    continue;
                }
                fs::write(
                    run_dir.join(format!("{}.cont", incident_row)),
                    self.continuum_text(),
                )
                .unwrap();
            }
        }
    }

    /// Continuum columns in descending wavelength order, as Cloudy writes them.
    fn continuum_text(&self) -> String {
        let incident = original_incident();
        let mut text = String::from("#Cont  nu\tincident\ttrans\tDiffOut\n");
        for k in (0..CONTINUUM_WAVELENGTHS.len()).rev() {
            let lam = CONTINUUM_WAVELENGTHS[k];
            let nu = CLIGHT_ANGSTROM / lam;
            let incident = self.incident_gain * incident[k];
            let transmitted = 0.5 * incident;
            let nebular = 1e19;
            text.push_str(&format!(
                "{:e}\t{:e}\t{:e}\t{:e}\n",
                lam,
                nu * incident,
                nu * transmitted,
                nu * nebular
            ));
        }
        text
    }
}
