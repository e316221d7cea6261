//! Utilities for input/output.

use super::OverwriteMode;
use crate::io_result;
use std::{
    fs,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// Reads and returns the content of the specified text file.
pub fn read_text_file<P: AsRef<Path>>(file_path: P) -> io::Result<String> {
    let file = open_file_and_map_err(file_path)?;
    let mut text = String::new();
    let _ = io::BufReader::new(file).read_to_string(&mut text)?;
    Ok(text)
}

/// Opens the given file, including the path in the error message on failure.
pub fn open_file_and_map_err<P: AsRef<Path>>(file_path: P) -> io::Result<fs::File> {
    let file_path = file_path.as_ref();
    fs::File::open(file_path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!(
                "Could not open {}: {}",
                file_path.to_string_lossy(),
                err
            ),
        )
    })
}

/// Returns the file name of the given path as a string, or an empty string.
pub fn file_name_str(file_path: &Path) -> String {
    file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns the file stem of the given path as a string, or an empty string.
pub fn file_stem_str(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Output path that is written through a temporary file in the same directory
/// and only moved into place once writing has completed.
#[derive(Debug)]
pub struct AtomicOutputPath {
    target_path: PathBuf,
    temp_file: NamedTempFile,
}

impl AtomicOutputPath {
    /// Prepares writing to the given target path.
    pub fn new<P: AsRef<Path>>(target_path: P) -> io::Result<Self> {
        let target_path = target_path.as_ref().to_path_buf();
        let directory = match target_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory)?;
        let temp_file = NamedTempFile::new_in(&directory)?;
        Ok(Self {
            target_path,
            temp_file,
        })
    }

    pub fn temporary_path(&self) -> &Path {
        self.temp_file.path()
    }

    /// Fails if the target exists and overwriting is not allowed.
    pub fn ensure_write_allowed(&self, overwrite_mode: OverwriteMode) -> io::Result<()> {
        ensure_write_allowed(&self.target_path, overwrite_mode)
    }

    /// Moves the temporary file to the target path.
    pub fn perform_replace(self) -> io::Result<()> {
        self.temp_file
            .persist(&self.target_path)
            .map(|_| ())
            .map_err(|err| err.error)
    }
}

/// Fails if the given file exists and overwriting is not allowed.
pub fn ensure_write_allowed<P: AsRef<Path>>(
    file_path: P,
    overwrite_mode: OverwriteMode,
) -> io::Result<()> {
    let file_path = file_path.as_ref();
    if overwrite_mode == OverwriteMode::Never && file_path.exists() {
        io_result!(
            AlreadyExists,
            "{} already exists (grids are write-once, request overwriting to replace it)",
            file_path.to_string_lossy()
        )
    } else {
        Ok(())
    }
}

/// Writes the given text to the given path, replacing any existing file.
pub fn write_text_file<P: AsRef<Path>>(text: &str, file_path: P) -> io::Result<()> {
    let atomic_output_path = AtomicOutputPath::new(file_path)?;
    {
        let mut writer = BufWriter::new(fs::File::create(atomic_output_path.temporary_path())?);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
    }
    atomic_output_path.perform_replace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_output_refuses_existing_file_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.glg");
        write_text_file("first", &path).unwrap();

        let atomic_output_path = AtomicOutputPath::new(&path).unwrap();
        assert!(atomic_output_path
            .ensure_write_allowed(OverwriteMode::Never)
            .is_err());
        assert!(atomic_output_path
            .ensure_write_allowed(OverwriteMode::Always)
            .is_ok());
    }

    #[test]
    fn written_text_can_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.txt");
        write_text_file("0 1\n2 3\n", &path).unwrap();
        assert_eq!(read_text_file(&path).unwrap(), "0 1\n2 3\n");
    }
}
