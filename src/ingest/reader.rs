//! Per-entity value file reader
//!
//! A value file maps each parameter to its raw value per version label plus
//! an `Applicable` flag:
//!
//! ```yaml
//! focal_length:
//!   Applicable: true
//!   default: 2800.
//!   2020-06-28: 2800.
//! ```

use indexmap::IndexMap;
use serde_yaml::Value as YamlValue;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::types::{LoaderError, Result};

/// Key of the applicability flag inside a parameter entry
pub const APPLICABLE_KEY: &str = "Applicable";

/// One value as read from a value file.
///
/// `number` keeps the YAML-typed number so `2.0` under an integer type
/// converts without a round trip through text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawValue {
    pub text: String,
    pub number: Option<serde_yaml::Number>,
}

impl RawValue {
    pub fn from_yaml(value: &YamlValue) -> Self {
        Self {
            text: render_raw(value),
            number: yaml_number(value),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_string(),
            number: None,
        }
    }
}

fn yaml_number(value: &YamlValue) -> Option<serde_yaml::Number> {
    match value {
        YamlValue::Number(n) => Some(n.clone()),
        YamlValue::Tagged(tagged) => yaml_number(&tagged.value),
        _ => None,
    }
}

/// Raw values of one parameter, by version label in file order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterValues {
    pub applicable: bool,
    pub versions: IndexMap<String, RawValue>,
}

impl ParameterValues {
    pub fn get(&self, version: &str) -> Option<&RawValue> {
        self.versions.get(version)
    }
}

/// Parsed value file of one telescope family or of the site group
#[derive(Clone, Debug, Default)]
pub struct EntityValues {
    pub name: String,
    pub source: PathBuf,
    parameters: IndexMap<String, ParameterValues>,
}

impl EntityValues {
    /// Parse a value file body
    pub fn from_yaml(name: &str, source: &Path, yaml: &str) -> Result<Self> {
        let raw: Option<IndexMap<String, YamlValue>> =
            serde_yaml::from_str(yaml).map_err(|e| LoaderError::yaml_at(source, e))?;

        let mut parameters = IndexMap::new();
        for (parameter, entry) in raw.unwrap_or_default() {
            let mapping = entry.as_mapping().ok_or_else(|| {
                LoaderError::InvalidInput(format!(
                    "{}: parameter {} is not a version mapping",
                    source.display(),
                    parameter
                ))
            })?;

            let mut values = ParameterValues::default();
            for (key, value) in mapping {
                let label = render_raw(key);
                if label == APPLICABLE_KEY {
                    values.applicable = value.as_bool().unwrap_or(false);
                } else {
                    values.versions.insert(label, RawValue::from_yaml(value));
                }
            }
            parameters.insert(parameter, values);
        }

        Ok(Self {
            name: name.to_string(),
            source: source.to_path_buf(),
            parameters,
        })
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &ParameterValues)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn get(&self, parameter: &str) -> Option<&ParameterValues> {
        self.parameters.get(parameter)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Ordered version labels, taken from the reference parameter.
    ///
    /// Every parameter of a file shares the same version set except for
    /// sparse entries, so one reference parameter defines the list.
    pub fn version_labels(&self, reference: &str) -> Result<Vec<String>> {
        let values = self.parameters.get(reference).ok_or_else(|| {
            LoaderError::InvalidInput(format!(
                "{}: reference parameter {} missing, cannot derive version list",
                self.source.display(),
                reference
            ))
        })?;
        Ok(values.versions.keys().cloned().collect())
    }
}

/// Render a YAML node as the raw string value stored for it.
///
/// Booleans render capitalised (`True` / `False`), the spelling the model
/// database already holds for untyped flags.
pub fn render_raw(value: &YamlValue) -> String {
    match value {
        YamlValue::Null => String::new(),
        YamlValue::Bool(true) => "True".to_string(),
        YamlValue::Bool(false) => "False".to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::String(s) => s.clone(),
        YamlValue::Tagged(tagged) => render_raw(&tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => serde_json::to_string(value)
            .unwrap_or_else(|_| {
                serde_yaml::to_string(value)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default()
            }),
    }
}

/// Resolve `name` through the alias table and parse its value file
pub fn read_entity_values(root: &Path, name: &str, layout: &LayoutConfig) -> Result<EntityValues> {
    let path = layout.value_file_path(root, name);
    let content = std::fs::read_to_string(&path).map_err(|e| LoaderError::io_at(&path, e))?;
    let values = EntityValues::from_yaml(name, &path, &content)?;
    debug!(entity = name, path = %path.display(), parameters = values.len(), "Read value file");
    Ok(values)
}
