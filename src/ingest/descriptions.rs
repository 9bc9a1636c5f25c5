//! Parameter description loading
//!
//! Section files are merged in order (later sections overwrite earlier keys);
//! the catch-all file only fills parameters no section described.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::config::LayoutConfig;
use crate::db::schemas::{DescriptionText, ValueAttributes};
use crate::types::{LoaderError, Result};

/// Description of one simulation parameter
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Description {
    /// Declared type (string, double, int, uint, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    #[serde(flatten)]
    pub attributes: ValueAttributes,

    #[serde(flatten)]
    pub text: DescriptionText,
}

/// Parameter name -> description, in load order
#[derive(Clone, Debug, Default)]
pub struct Descriptions {
    entries: IndexMap<String, Description>,
}

impl Descriptions {
    pub fn get(&self, parameter: &str) -> Option<&Description> {
        self.entries.get(parameter)
    }

    pub fn contains(&self, parameter: &str) -> bool {
        self.entries.contains_key(parameter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite
    pub fn insert(&mut self, parameter: impl Into<String>, description: Description) {
        self.entries.insert(parameter.into(), description);
    }

    /// Insert only when the parameter is not yet described; returns whether it was added
    pub fn insert_missing(&mut self, parameter: String, description: Description) -> bool {
        if self.entries.contains_key(&parameter) {
            return false;
        }
        self.entries.insert(parameter, description);
        true
    }
}

impl FromIterator<(String, Description)> for Descriptions {
    fn from_iter<I: IntoIterator<Item = (String, Description)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn read_description_file(path: &Path) -> Result<IndexMap<String, Description>> {
    let content = std::fs::read_to_string(path).map_err(|e| LoaderError::io_at(path, e))?;
    let entries: Option<IndexMap<String, Description>> =
        serde_yaml::from_str(&content).map_err(|e| LoaderError::yaml_at(path, e))?;
    Ok(entries.unwrap_or_default())
}

/// Read and merge all description files under `root`
pub fn load_descriptions(root: &Path, layout: &LayoutConfig) -> Result<Descriptions> {
    let mut descriptions = Descriptions::default();

    for section in &layout.description_sections {
        let path = layout.description_path(root, section);
        let entries = read_description_file(&path)?;
        debug!(section = %section, count = entries.len(), "Read description section");
        descriptions.entries.extend(entries);
    }

    // Raw simulation parameters that are not part of any report section
    let other_path = layout.description_path(root, &layout.other_descriptions);
    let mut filled = 0;
    for (parameter, description) in read_description_file(&other_path)? {
        if descriptions.insert_missing(parameter, description) {
            filled += 1;
        }
    }

    info!(
        total = descriptions.len(),
        from_catch_all = filled,
        "Loaded parameter descriptions"
    );
    Ok(descriptions)
}
