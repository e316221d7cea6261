//! Self-describing container of named N-dimensional datasets and string attributes.
//!
//! Datasets are addressed by paths of the form `namespace/name`, mirroring groups
//! and datasets in an HDF5 file. The same tree can be stored in the native binary
//! format or, with the `hdf5` feature, in an HDF5 file.

pub mod native;

#[cfg(feature = "hdf5")]
pub mod hdf5;

use super::{
    utils::{self, AtomicOutputPath},
    OverwriteMode, Verbosity,
};
use crate::io_result;
use ndarray::prelude::*;
use std::{
    collections::BTreeMap,
    fs,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

/// Canonical extension of grid files in native format.
pub const NATIVE_EXTENSION: &str = "glg";

/// Storage format of a container file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactFormat {
    Native,
    #[cfg(feature = "hdf5")]
    Hdf5,
}

impl ArtifactFormat {
    /// Determines the format from the extension of the given path.
    pub fn from_path(file_path: &Path) -> io::Result<Self> {
        let extension = file_path
            .extension()
            .map(|extension| extension.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    /// Determines the format from the given file extension.
    pub fn from_extension(extension: &str) -> io::Result<Self> {
        match extension {
            "hdf5" | "h5" => {
                #[cfg(feature = "hdf5")]
                {
                    Ok(Self::Hdf5)
                }
                #[cfg(not(feature = "hdf5"))]
                io_result!(
                    Unsupported,
                    "Compile with the hdf5 feature in order to read and write HDF5 files"
                )
            }
            _ => Ok(Self::Native),
        }
    }

    /// Returns the extension used for files of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Native => NATIVE_EXTENSION,
            #[cfg(feature = "hdf5")]
            Self::Hdf5 => "hdf5",
        }
    }
}

/// A single N-dimensional dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum Dataset {
    Float(ArrayD<f64>),
    Flags(ArrayD<bool>),
}

impl Dataset {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float(values) => values.shape(),
            Self::Flags(flags) => flags.shape(),
        }
    }
}

/// In-memory representation of a container file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridArtifact {
    attributes: Vec<(String, Vec<String>)>,
    datasets: BTreeMap<String, Dataset>,
}

impl GridArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the string list attribute with the given name, replacing any existing value.
    pub fn set_attribute<S: AsRef<str>>(&mut self, name: &str, values: &[S]) {
        let values = values.iter().map(|s| s.as_ref().to_string()).collect();
        match self.attributes.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, existing_values)) => *existing_values = values,
            None => self.attributes.push((name.to_string(), values)),
        }
    }

    /// Returns the string list attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attributes
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn insert_dataset(&mut self, path: String, dataset: Dataset) {
        self.datasets.insert(path, dataset);
    }

    pub fn insert_float<D: Dimension>(&mut self, namespace: &str, name: &str, values: Array<f64, D>) {
        self.insert_dataset(dataset_path(namespace, name), Dataset::Float(values.into_dyn()));
    }

    pub fn insert_flags<D: Dimension>(&mut self, namespace: &str, name: &str, flags: Array<bool, D>) {
        self.insert_dataset(dataset_path(namespace, name), Dataset::Flags(flags.into_dyn()));
    }

    pub fn dataset(&self, path: &str) -> Option<&Dataset> {
        self.datasets.get(path)
    }

    pub fn datasets(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.datasets
            .iter()
            .map(|(path, dataset)| (path.as_str(), dataset))
    }

    /// Returns the float dataset with the given namespace and name.
    pub fn float(&self, namespace: &str, name: &str) -> io::Result<&ArrayD<f64>> {
        match self.datasets.get(&dataset_path(namespace, name)) {
            Some(Dataset::Float(values)) => Ok(values),
            Some(Dataset::Flags(_)) => io_result!(
                InvalidData,
                "Dataset {} does not contain floating point values",
                dataset_path(namespace, name)
            ),
            None => io_result!(
                NotFound,
                "Dataset {} not found",
                dataset_path(namespace, name)
            ),
        }
    }

    /// Returns the flag dataset with the given namespace and name, if present.
    pub fn flags(&self, namespace: &str, name: &str) -> Option<&ArrayD<bool>> {
        match self.datasets.get(&dataset_path(namespace, name)) {
            Some(Dataset::Flags(flags)) => Some(flags),
            _ => None,
        }
    }

    /// Returns the names of all datasets directly inside the given namespace.
    pub fn members(&self, namespace: &str) -> Vec<&str> {
        let prefix = format!("{}/", namespace);
        self.datasets
            .keys()
            .filter_map(|path| path.strip_prefix(prefix.as_str()))
            .filter(|name| !name.contains('/'))
            .collect()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        !self.members(namespace).is_empty()
    }

    /// Reads the container file at the given path.
    pub fn read<P: AsRef<Path>>(file_path: P, verbosity: &Verbosity) -> io::Result<Self> {
        Self::read_namespaces(file_path, None, verbosity)
    }

    /// Reads the container file at the given path, keeping only datasets in the given
    /// namespaces (all datasets if `None`). Attributes are always read.
    pub fn read_namespaces<P: AsRef<Path>>(
        file_path: P,
        namespaces: Option<&[&str]>,
        verbosity: &Verbosity,
    ) -> io::Result<Self> {
        let file_path = file_path.as_ref();
        if verbosity.print_messages() {
            println!("Reading {}", utils::file_name_str(file_path));
        }
        match ArtifactFormat::from_path(file_path)? {
            ArtifactFormat::Native => {
                let file = utils::open_file_and_map_err(file_path)?;
                native::read_artifact(&mut BufReader::new(file), namespaces)
            }
            #[cfg(feature = "hdf5")]
            ArtifactFormat::Hdf5 => hdf5::read_artifact(file_path, namespaces),
        }
    }

    /// Writes the container to the given path.
    ///
    /// The data is first written to a temporary file which then replaces the target,
    /// so a partially written grid never appears under the target name.
    pub fn write<P: AsRef<Path>>(
        &self,
        file_path: P,
        overwrite_mode: OverwriteMode,
        verbosity: &Verbosity,
    ) -> io::Result<()> {
        let file_path = file_path.as_ref();
        let format = ArtifactFormat::from_path(file_path)?;

        let atomic_output_path = AtomicOutputPath::new(file_path)?;
        atomic_output_path.ensure_write_allowed(overwrite_mode)?;

        if verbosity.print_messages() {
            println!("Writing {}", utils::file_name_str(file_path));
        }

        match format {
            ArtifactFormat::Native => {
                let mut writer =
                    BufWriter::new(fs::File::create(atomic_output_path.temporary_path())?);
                native::write_artifact(&mut writer, self)?;
                writer.flush()?;
            }
            #[cfg(feature = "hdf5")]
            ArtifactFormat::Hdf5 => {
                hdf5::write_artifact(atomic_output_path.temporary_path(), self)?;
            }
        }
        atomic_output_path.perform_replace()
    }
}

/// Joins a namespace and a dataset name into a dataset path.
pub fn dataset_path(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

/// Whether the dataset with the given path should be kept when only the given
/// namespaces are requested.
fn is_in_namespaces(path: &str, namespaces: Option<&[&str]>) -> bool {
    match namespaces {
        None => true,
        Some(namespaces) => namespaces.iter().any(|namespace| {
            path == *namespace
                || path
                    .strip_prefix(namespace)
                    .map_or(false, |rest| rest.starts_with('/'))
        }),
    }
}
