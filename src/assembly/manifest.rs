//! Manifest of grid cells whose simulation run failed.

use crate::{
    io::utils,
    io_result,
};
use std::{
    io,
    path::{Path, PathBuf},
};

/// Extension of failed-point manifest files.
pub const MANIFEST_EXTENSION: &str = "failed_models";

/// Returns the manifest path for the given model in the given directory.
pub fn manifest_path<P: AsRef<Path>>(directory: P, model_name: &str) -> PathBuf {
    directory
        .as_ref()
        .join(format!("{}.{}", model_name, MANIFEST_EXTENSION))
}

/// Formats failed `(photoionisation_row, incident_row)` pairs, one per line.
pub fn format_failed_points(failed_points: &[(usize, usize)]) -> String {
    failed_points
        .iter()
        .map(|(photoionisation_row, incident_row)| {
            format!("{} {}\n", photoionisation_row, incident_row)
        })
        .collect()
}

/// Parses a failed-point manifest.
pub fn parse_failed_points(text: &str) -> io::Result<Vec<(usize, usize)>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| -> io::Result<(usize, usize)> {
            let rows: Vec<&str> = line.split_whitespace().collect();
            match rows.as_slice() {
                [photoionisation_row, incident_row] => {
                    match (photoionisation_row.parse(), incident_row.parse()) {
                        (Ok(photoionisation_row), Ok(incident_row)) => {
                            Ok((photoionisation_row, incident_row))
                        }
                        _ => io_result!(InvalidData, "Invalid failed point entry {:?}", line),
                    }
                }
                _ => io_result!(InvalidData, "Invalid failed point entry {:?}", line),
            }
        })
        .collect()
}

/// Writes the failed points to the manifest file at the given path.
pub fn write_failed_points<P: AsRef<Path>>(
    failed_points: &[(usize, usize)],
    file_path: P,
) -> io::Result<()> {
    utils::write_text_file(&format_failed_points(failed_points), file_path)
}

/// Reads the failed points from the manifest file at the given path.
pub fn read_failed_points<P: AsRef<Path>>(file_path: P) -> io::Result<Vec<(usize, usize)>> {
    parse_failed_points(&utils::read_text_file(file_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_lists_one_pair_per_line() {
        let failed_points = vec![(0, 3), (2, 1)];
        let text = format_failed_points(&failed_points);
        assert_eq!(text, "0 3\n2 1\n");
        assert_eq!(parse_failed_points(&text).unwrap(), failed_points);
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert!(parse_failed_points("0 1 2\n").is_err());
        assert!(parse_failed_points("a b\n").is_err());
        assert!(parse_failed_points("\n\n").unwrap().is_empty());
    }

    #[test]
    fn manifests_are_named_by_model() {
        assert_eq!(
            manifest_path("grids", "bpass-c17"),
            Path::new("grids").join("bpass-c17.failed_models")
        );
    }
}
