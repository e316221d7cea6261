//! HDF5 backend for grid containers.
//!
//! Namespaces map to HDF5 groups, datasets to HDF5 datasets and string list
//! attributes to variable-length string attributes on the root group.

use super::{is_in_namespaces, Dataset, GridArtifact};
use hdf5_rs::{
    types::{TypeDescriptor, VarLenAscii, VarLenUnicode},
    Extents, File, Group,
};
use ndarray::{ArrayD, IxDyn};
use std::{io, path::Path, str::FromStr};

fn to_io_err(err: hdf5_rs::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("HDF5 error: {}", err))
}

/// Writes the given container to a new HDF5 file at the given path.
pub fn write_artifact(file_path: &Path, artifact: &GridArtifact) -> io::Result<()> {
    let file = File::create(file_path).map_err(to_io_err)?;

    for (name, values) in artifact.attributes() {
        let values = values
            .iter()
            .map(|value| {
                VarLenUnicode::from_str(value)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))
            })
            .collect::<io::Result<Vec<_>>>()?;
        file.new_attr::<VarLenUnicode>()
            .shape((values.len(),))
            .create(name)
            .and_then(|attr| attr.write_raw(&values))
            .map_err(to_io_err)?;
    }

    for (path, dataset) in artifact.datasets() {
        let (group, name) = match path.rsplit_once('/') {
            Some((group_path, name)) => (require_group(&file, group_path)?, name),
            None => ((*file).clone(), path),
        };
        let shape = dataset.shape();
        let extents: Extents = if shape.is_empty() {
            ().into()
        } else {
            shape.to_vec().into()
        };
        match dataset {
            Dataset::Float(values) => {
                let values: Vec<f64> = values.iter().copied().collect();
                group
                    .new_dataset::<f64>()
                    .shape(extents)
                    .create(name)
                    .and_then(|dataset| dataset.write_raw(&values))
                    .map_err(to_io_err)?;
            }
            Dataset::Flags(flags) => {
                let flags: Vec<bool> = flags.iter().copied().collect();
                group
                    .new_dataset::<bool>()
                    .shape(extents)
                    .create(name)
                    .and_then(|dataset| dataset.write_raw(&flags))
                    .map_err(to_io_err)?;
            }
        }
    }
    file.close().map_err(to_io_err)
}

/// Reads the HDF5 file at the given path into a container.
///
/// Datasets that are neither floating point nor boolean, and attributes that are
/// not string lists, are ignored.
pub fn read_artifact(file_path: &Path, namespaces: Option<&[&str]>) -> io::Result<GridArtifact> {
    let file = File::open(file_path).map_err(to_io_err)?;
    let mut artifact = GridArtifact::new();

    for name in file.attr_names().map_err(to_io_err)? {
        let attr = file.attr(&name).map_err(to_io_err)?;
        let values = if let Ok(values) = attr.read_raw::<VarLenUnicode>() {
            values.iter().map(|value| value.as_str().to_string()).collect()
        } else if let Ok(values) = attr.read_raw::<VarLenAscii>() {
            values.iter().map(|value| value.as_str().to_string()).collect()
        } else {
            continue;
        };
        artifact.set_attribute::<String>(&name, &values);
    }

    read_group(&file, "", namespaces, &mut artifact)?;
    Ok(artifact)
}

fn read_group(
    group: &Group,
    prefix: &str,
    namespaces: Option<&[&str]>,
    artifact: &mut GridArtifact,
) -> io::Result<()> {
    for member in group.member_names().map_err(to_io_err)? {
        let path = if prefix.is_empty() {
            member.clone()
        } else {
            format!("{}/{}", prefix, member)
        };
        if let Ok(dataset) = group.dataset(&member) {
            if !is_in_namespaces(&path, namespaces) {
                continue;
            }
            let shape = dataset.shape();
            let descriptor = dataset
                .dtype()
                .and_then(|dtype| dtype.to_descriptor())
                .map_err(to_io_err)?;
            let dataset = match descriptor {
                TypeDescriptor::Float(_) => {
                    let values = dataset.read_raw::<f64>().map_err(to_io_err)?;
                    Dataset::Float(array_from_buffer(&path, &shape, values)?)
                }
                TypeDescriptor::Boolean => {
                    let flags = dataset.read_raw::<bool>().map_err(to_io_err)?;
                    Dataset::Flags(array_from_buffer(&path, &shape, flags)?)
                }
                _ => continue,
            };
            artifact.insert_dataset(path, dataset);
        } else if let Ok(subgroup) = group.group(&member) {
            read_group(&subgroup, &path, namespaces, artifact)?;
        }
    }
    Ok(())
}

fn require_group(file: &File, group_path: &str) -> io::Result<Group> {
    match file.group(group_path) {
        Ok(group) => Ok(group),
        Err(_) => file.create_group(group_path).map_err(to_io_err),
    }
}

fn array_from_buffer<T>(path: &str, shape: &[usize], buffer: Vec<T>) -> io::Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(shape), buffer).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid shape for dataset {}: {}", path, err),
        )
    })
}
