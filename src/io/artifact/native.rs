//! Native binary container format.
//!
//! Layout (all integers and floats little endian):
//!
//! ```text
//! magic "GASLIGHT" | u32 format version
//! u32 attribute count | per attribute: string name, u32 value count, strings
//! u32 dataset count   | per dataset: string path, u8 kind, u32 rank, u64 extents, values
//! ```
//!
//! Strings are a `u32` byte length followed by UTF-8 bytes. Float values are
//! `f64`, flag values one byte each, both in row-major order.

use super::{is_in_namespaces, Dataset, GridArtifact};
use crate::io_result;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{ArrayD, IxDyn};
use std::io::{self, Read, Write};

const MAGIC: &[u8; 8] = b"GASLIGHT";
const FORMAT_VERSION: u32 = 1;

const FLOAT_KIND: u8 = 0;
const FLAGS_KIND: u8 = 1;

/// Serializes the given container to the given writer.
pub fn write_artifact<W: Write>(writer: &mut W, artifact: &GridArtifact) -> io::Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;

    let attributes: Vec<_> = artifact.attributes().collect();
    write_count(writer, attributes.len())?;
    for (name, values) in attributes {
        write_string(writer, name)?;
        write_count(writer, values.len())?;
        for value in values {
            write_string(writer, value)?;
        }
    }

    let datasets: Vec<_> = artifact.datasets().collect();
    write_count(writer, datasets.len())?;
    for (path, dataset) in datasets {
        write_string(writer, path)?;
        writer.write_u8(match dataset {
            Dataset::Float(_) => FLOAT_KIND,
            Dataset::Flags(_) => FLAGS_KIND,
        })?;
        let shape = dataset.shape();
        write_count(writer, shape.len())?;
        for &extent in shape {
            writer.write_u64::<LittleEndian>(extent as u64)?;
        }
        match dataset {
            Dataset::Float(values) => {
                for &value in values.iter() {
                    writer.write_f64::<LittleEndian>(value)?;
                }
            }
            Dataset::Flags(flags) => {
                let bytes: Vec<u8> = flags.iter().map(|&flag| u8::from(flag)).collect();
                writer.write_all(&bytes)?;
            }
        }
    }
    Ok(())
}

/// Deserializes a container from the given reader, keeping only datasets in the
/// given namespaces (all if `None`).
pub fn read_artifact<R: Read>(
    reader: &mut R,
    namespaces: Option<&[&str]>,
) -> io::Result<GridArtifact> {
    let mut magic = [0_u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return io_result!(InvalidData, "Not a gaslight grid file");
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return io_result!(
            InvalidData,
            "Unsupported grid file format version {} (expected {})",
            version,
            FORMAT_VERSION
        );
    }

    let mut artifact = GridArtifact::new();

    let n_attributes = read_count(reader)?;
    for _ in 0..n_attributes {
        let name = read_string(reader)?;
        let n_values = read_count(reader)?;
        let values = (0..n_values)
            .map(|_| read_string(reader))
            .collect::<io::Result<Vec<_>>>()?;
        artifact.set_attribute(&name, &values);
    }

    let n_datasets = read_count(reader)?;
    for _ in 0..n_datasets {
        let path = read_string(reader)?;
        let kind = reader.read_u8()?;
        let rank = read_count(reader)?;
        let shape = (0..rank)
            .map(|_| {
                let extent = reader.read_u64::<LittleEndian>()?;
                usize::try_from(extent).map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Extent {} of dataset {} is too large", extent, path),
                    )
                })
            })
            .collect::<io::Result<Vec<_>>>()?;
        let size = element_count(&path, &shape)?;
        let keep = is_in_namespaces(&path, namespaces);

        let dataset = match kind {
            FLOAT_KIND => {
                let n_bytes = payload_size(&path, size, 8)?;
                if !keep {
                    skip_bytes(reader, n_bytes)?;
                    continue;
                }
                let bytes = read_payload(reader, n_bytes)?;
                let mut buffer = vec![0.0; size];
                LittleEndian::read_f64_into(&bytes, &mut buffer);
                Dataset::Float(array_from_buffer(&path, &shape, buffer)?)
            }
            FLAGS_KIND => {
                let n_bytes = payload_size(&path, size, 1)?;
                if !keep {
                    skip_bytes(reader, n_bytes)?;
                    continue;
                }
                let flags = read_payload(reader, n_bytes)?
                    .into_iter()
                    .map(|byte| byte != 0)
                    .collect();
                Dataset::Flags(array_from_buffer(&path, &shape, flags)?)
            }
            other => {
                return io_result!(
                    InvalidData,
                    "Invalid data kind {} for dataset {}",
                    other,
                    path
                )
            }
        };
        artifact.insert_dataset(path, dataset);
    }
    Ok(artifact)
}

fn element_count(path: &str, shape: &[usize]) -> io::Result<usize> {
    shape
        .iter()
        .try_fold(1_usize, |count, &extent| count.checked_mul(extent))
        .map_or_else(
            || io_result!(InvalidData, "Shape {:?} of dataset {} is too large", shape, path),
            Ok,
        )
}

fn payload_size(path: &str, size: usize, element_bytes: u64) -> io::Result<u64> {
    (size as u64).checked_mul(element_bytes).map_or_else(
        || io_result!(InvalidData, "Dataset {} is too large", path),
        Ok,
    )
}

/// Reads exactly `n_bytes` bytes, growing the buffer only as data arrives.
fn read_payload<R: Read>(reader: &mut R, n_bytes: u64) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.by_ref().take(n_bytes).read_to_end(&mut bytes)?;
    if bytes.len() as u64 == n_bytes {
        Ok(bytes)
    } else {
        io_result!(UnexpectedEof, "Grid file ended unexpectedly")
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

fn write_count<W: Write>(writer: &mut W, count: usize) -> io::Result<()> {
    let count = u32::try_from(count).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "Count too large for grid file")
    })?;
    writer.write_u32::<LittleEndian>(count)
}

fn read_count<R: Read>(reader: &mut R) -> io::Result<usize> {
    reader.read_u32::<LittleEndian>().map(|count| count as usize)
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    write_count(writer, s.len())?;
    writer.write_all(s.as_bytes())
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let length = read_count(reader)?;
    let bytes = read_payload(reader, length as u64)?;
    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

fn skip_bytes<R: Read>(reader: &mut R, n_bytes: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(n_bytes), &mut io::sink())?;
    if skipped == n_bytes {
        Ok(())
    } else {
        io_result!(UnexpectedEof, "Grid file ended unexpectedly")
    }
}
