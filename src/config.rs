//! Configuration of the photoionisation parameters and the incident grid axes.

use crate::{
    axes::{Axis, ParameterSpace},
    grid::{data::axes_from_artifact, fgd},
    io::{artifact::GridArtifact, cloudy::CloudyVersion, utils, Verbosity},
    io_result,
};
use ndarray::prelude::*;
use serde_yaml::{Mapping, Value};
use std::{io, path::Path};

/// Name of the fixed parameter selecting the simulator version.
pub const CLOUDY_VERSION_KEY: &str = "cloudy_version";

/// Photoionisation parameters declared in a YAML document.
///
/// Top-level lists are swept axes and top-level scalars fixed parameters. A
/// top-level mapping is a parameter group whose members are named `group.key`
/// and are swept or fixed in the same way.
#[derive(Clone, Debug, PartialEq)]
pub struct PhotoionisationConfig {
    name: String,
    fixed_parameters: Vec<(String, Value)>,
    axes: ParameterSpace,
}

impl PhotoionisationConfig {
    /// Reads the configuration from the given YAML file, naming it after the file stem.
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> io::Result<Self> {
        let file_path = file_path.as_ref();
        let text = utils::read_text_file(file_path)?;
        Self::from_yaml_str(utils::file_stem_str(file_path), &text)
    }

    /// Parses the configuration from a YAML document.
    pub fn from_yaml_str<S: Into<String>>(name: S, text: &str) -> io::Result<Self> {
        let document: Value = serde_yaml::from_str(text).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid configuration document: {}", err),
            )
        })?;
        let entries = match document {
            Value::Mapping(entries) => entries,
            Value::Null => Mapping::new(),
            _ => return io_result!(InvalidData, "Configuration document must be a mapping"),
        };

        let mut fixed_parameters = Vec::new();
        let mut axes = Vec::new();

        let mut add_entry = |name: String, value: Value| -> io::Result<()> {
            match value {
                Value::Sequence(values) => axes.push(axis_from_sequence(name, &values)?),
                value => fixed_parameters.push((name, value)),
            }
            Ok(())
        };

        for (key, value) in entries {
            let key = key_to_string(&key)?;
            match value {
                Value::Mapping(members) => {
                    for (member_key, member_value) in members {
                        let member_key = key_to_string(&member_key)?;
                        add_entry(format!("{}.{}", key, member_key), member_value)?;
                    }
                }
                value => add_entry(key, value)?,
            }
        }

        Ok(Self {
            name: name.into(),
            fixed_parameters,
            axes: ParameterSpace::new(axes),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the swept photoionisation axes in document order.
    pub fn axes(&self) -> &ParameterSpace {
        &self.axes
    }

    pub fn fixed_parameters(&self) -> &[(String, Value)] {
        &self.fixed_parameters
    }

    pub fn fixed_parameter(&self, name: &str) -> Option<&Value> {
        self.fixed_parameters
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Returns the simulator version selected by the configuration.
    pub fn cloudy_version(&self) -> io::Result<CloudyVersion> {
        match self.fixed_parameter(CLOUDY_VERSION_KEY) {
            Some(Value::String(tag)) => tag.parse(),
            Some(other) => io_result!(
                InvalidData,
                "Invalid {} in configuration: {:?}",
                CLOUDY_VERSION_KEY,
                other
            ),
            None => io_result!(
                InvalidData,
                "Configuration {} does not specify {}",
                self.name,
                CLOUDY_VERSION_KEY
            ),
        }
    }

    /// Returns every parameter of the photoionisation model with the given row in
    /// enumeration order, with `group.key` parameters nested under their group.
    pub fn model_parameters(&self, photoionisation_row: usize) -> Mapping {
        let indices = self.axes.index_of_model(photoionisation_row);
        let swept = self
            .axes
            .axes()
            .iter()
            .zip(indices)
            .map(|(axis, index)| (axis.name().to_string(), Value::from(axis.values()[index])));

        let mut parameters = Mapping::new();
        for (name, value) in self.fixed_parameters.iter().cloned().chain(swept) {
            insert_nested(&mut parameters, &name, value);
        }
        parameters
    }
}

/// Inserts a value into a mapping, placing `group.key` names in a nested mapping.
pub fn insert_nested(parameters: &mut Mapping, name: &str, value: Value) {
    match name.split_once('.') {
        Some((group, key)) => {
            let group = parameters
                .entry(Value::from(group))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !group.is_mapping() {
                *group = Value::Mapping(Mapping::new());
            }
            if let Value::Mapping(members) = group {
                members.insert(Value::from(key), value);
            }
        }
        None => {
            parameters.insert(Value::from(name), value);
        }
    }
}

/// Reads the axes of the upstream incident grid.
///
/// YAML files (`.yaml`/`.yml`) map axis names to value lists; any other file is
/// read as a grid container with an `axes` attribute and `axes/<name>` datasets.
pub fn read_incident_axes<P: AsRef<Path>>(
    file_path: P,
    verbosity: &Verbosity,
) -> io::Result<ParameterSpace> {
    let file_path = file_path.as_ref();
    match file_path.extension().and_then(|extension| extension.to_str()) {
        Some("yaml") | Some("yml") => {
            let text = utils::read_text_file(file_path)?;
            incident_axes_from_yaml_str(&text)
        }
        _ => {
            let artifact = GridArtifact::read_namespaces(file_path, Some(&["axes"]), verbosity)?;
            axes_from_artifact(&artifact)
        }
    }
}

/// Parses incident axes from a YAML mapping of axis name to value list.
pub fn incident_axes_from_yaml_str(text: &str) -> io::Result<ParameterSpace> {
    let document: Value = serde_yaml::from_str(text).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid incident axes document: {}", err),
        )
    })?;
    let entries = match document {
        Value::Mapping(entries) => entries,
        _ => return io_result!(InvalidData, "Incident axes document must be a mapping"),
    };
    let axes = entries
        .into_iter()
        .map(|(key, value)| {
            let name = key_to_string(&key)?;
            match value {
                Value::Sequence(values) => axis_from_sequence(name, &values),
                _ => io_result!(InvalidData, "Incident axis {} must be a list", name),
            }
        })
        .collect::<io::Result<Vec<_>>>()?;
    Ok(ParameterSpace::new(axes))
}

fn axis_from_sequence(name: String, values: &[Value]) -> io::Result<Axis> {
    let values = values
        .iter()
        .map(|value| value_to_float(&name, value))
        .collect::<io::Result<Vec<_>>>()?;
    Ok(Axis::new(name, Array1::from_vec(values), None)?)
}

fn value_to_float(name: &str, value: &Value) -> io::Result<fgd> {
    let float = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(s) => s.trim().parse::<fgd>().ok(),
        _ => None,
    };
    match float {
        Some(float) => Ok(float),
        None => io_result!(
            InvalidData,
            "Value {:?} of axis {} is not a number",
            value,
            name
        ),
    }
}

fn key_to_string(key: &Value) -> io::Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => io_result!(InvalidData, "Invalid configuration key {:?}", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "\
cloudy_version: c23.01
reference_abundance: Asplund2009
depletion_model: null
ionisation_parameter: [0.001, 0.01, 0.1]
hydrogen_density: 1.0e+3
abundance_scalings:
  nitrogen: GalacticConcordance
  carbon: [0.5, '1.0']
";

    #[test]
    fn lists_become_axes_in_document_order() {
        let config = PhotoionisationConfig::from_yaml_str("test", CONFIG).unwrap();
        assert_eq!(
            config.axes().axis_names(),
            vec!["ionisation_parameter", "abundance_scalings.carbon"]
        );
        assert_eq!(config.axes().shape(), vec![3, 2]);
        assert_eq!(
            config.axes().axis("abundance_scalings.carbon").unwrap().values(),
            &arr1(&[0.5, 1.0])
        );
        assert_eq!(
            config.fixed_parameter("abundance_scalings.nitrogen"),
            Some(&Value::from("GalacticConcordance"))
        );
        assert_eq!(config.fixed_parameter("depletion_model"), Some(&Value::Null));
        assert_eq!(config.cloudy_version().unwrap(), CloudyVersion::C23);
    }

    #[test]
    fn model_parameters_are_nested_by_group() {
        let config = PhotoionisationConfig::from_yaml_str("test", CONFIG).unwrap();
        let parameters = config.model_parameters(4);
        assert_eq!(parameters["ionisation_parameter"], Value::from(0.01));
        let scalings = parameters["abundance_scalings"].as_mapping().unwrap();
        assert_eq!(scalings["carbon"], Value::from(1.0));
        assert_eq!(scalings["nitrogen"], Value::from("GalacticConcordance"));
        assert_eq!(parameters["hydrogen_density"], Value::from(1000.0));
    }

    #[test]
    fn unknown_cloudy_versions_are_configuration_errors() {
        let config =
            PhotoionisationConfig::from_yaml_str("test", "cloudy_version: c08.00\n").unwrap();
        assert!(config.cloudy_version().is_err());
        let config = PhotoionisationConfig::from_yaml_str("test", "alpha: 0.0\n").unwrap();
        assert!(config.cloudy_version().is_err());
    }

    #[test]
    fn malformed_axes_are_configuration_errors() {
        assert!(PhotoionisationConfig::from_yaml_str("test", "metallicity: []\n").is_err());
        assert!(PhotoionisationConfig::from_yaml_str("test", "metallicity: [a, b]\n").is_err());
        assert!(PhotoionisationConfig::from_yaml_str("test", "- 1\n- 2\n").is_err());
        assert!(PhotoionisationConfig::from_yaml_str("test", "a: [1\n").is_err());
    }

    #[test]
    fn incident_axes_are_read_from_yaml() {
        let axes =
            incident_axes_from_yaml_str("log10age: [6.0, 7.0]\nmetallicity: [0.01, 0.02, 0.03]\n")
                .unwrap();
        assert_eq!(axes.axis_names(), vec!["log10age", "metallicity"]);
        assert_eq!(axes.shape(), vec![2, 3]);
    }
}
