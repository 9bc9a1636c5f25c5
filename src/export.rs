//! Nested JSON export of telescope models for the UI
//!
//! Output shape, one entry per telescope replica:
//!
//! ```json
//! { "Lx01": { "Optics": { "id": "Optics", "title": "Optics", "val": 0,
//!                         "children": [{ "id": "focal_length", "title": "focal_length", "val": 2800.0 }] } } }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::config::{ExportConfig, ExportKind};
use crate::db::{CollectionKind, ModelStore, ParameterValue, ValueQuery, ValueRecord};
use crate::types::{LoaderError, Result};

/// Section name -> parameters shown in it, in display order
pub type SectionTaxonomy = IndexMap<String, Vec<String>>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExportChild {
    pub id: String,
    pub title: String,
    pub val: ParameterValue,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExportSection {
    pub id: String,
    pub title: String,
    pub val: i64,
    pub children: Vec<ExportChild>,
}

/// Sections of one telescope
pub type TelescopeSections = IndexMap<String, ExportSection>;

/// Replica name -> sections
pub type ModelExport = IndexMap<String, TelescopeSections>;

/// Read the section taxonomy; sections without parameters are kept empty
pub fn read_taxonomy(path: &Path) -> Result<SectionTaxonomy> {
    let content = std::fs::read_to_string(path).map_err(|e| LoaderError::io_at(path, e))?;
    let raw: Option<IndexMap<String, Option<Vec<String>>>> =
        serde_yaml::from_str(&content).map_err(|e| LoaderError::yaml_at(path, e))?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(section, parameters)| (section, parameters.unwrap_or_default()))
        .collect())
}

fn sections_for(
    parameters: &IndexMap<String, ValueRecord>,
    taxonomy: &SectionTaxonomy,
    excluded: &[String],
) -> TelescopeSections {
    taxonomy
        .iter()
        .filter(|(section, _)| !excluded.contains(section))
        .map(|(section, names)| {
            let children = names
                .iter()
                .filter_map(|name| {
                    parameters.get(name).map(|record| ExportChild {
                        id: name.clone(),
                        title: name.clone(),
                        val: record.value.clone(),
                    })
                })
                .collect();
            let node = ExportSection {
                id: section.clone(),
                title: section.clone(),
                val: 0,
                children,
            };
            (section.clone(), node)
        })
        .collect()
}

async fn kind_sections<S>(
    store: &S,
    config: &ExportConfig,
    kind: &ExportKind,
    taxonomy: &SectionTaxonomy,
    version: &str,
    only_applicable: bool,
) -> Result<TelescopeSections>
where
    S: ModelStore + ?Sized,
{
    if kind.entities.is_empty() {
        return Ok(TelescopeSections::new());
    }

    // Later identities of a kind override earlier ones parameter by parameter
    let mut parameters: IndexMap<String, ValueRecord> = IndexMap::new();
    for entity in &kind.entities {
        let query = ValueQuery {
            collection: CollectionKind::Telescopes,
            entity: entity.clone(),
            version: version.to_string(),
            applicable_only: only_applicable || config.applicable_only_entities.contains(entity),
        };
        let records = store.find_values(&query).await?;
        debug!(kind = %kind.name, entity = %entity, count = records.len(), "Read export values");
        for record in records {
            parameters.insert(record.parameter.clone(), record);
        }
    }

    Ok(sections_for(&parameters, taxonomy, &config.excluded_sections))
}

/// Build the export document for every configured kind and replica
pub async fn build_export<S>(
    store: &S,
    config: &ExportConfig,
    taxonomy: &SectionTaxonomy,
    version: &str,
    only_applicable: bool,
) -> Result<ModelExport>
where
    S: ModelStore + ?Sized,
{
    let mut export = ModelExport::new();
    for kind in &config.kinds {
        let sections =
            kind_sections(store, config, kind, taxonomy, version, only_applicable).await?;
        for index in 1..=kind.replicas {
            export.insert(format!("{}{:02}", kind.json_prefix, index), sections.clone());
        }
    }
    info!(telescopes = export.len(), version, "Built model export");
    Ok(export)
}

/// Pretty-print the export with a four-space indent
pub fn render_export(export: &ModelExport) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    export.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|e| LoaderError::Json(e.to_string()))
}

pub fn write_export(path: &Path, export: &ModelExport) -> Result<()> {
    let rendered = render_export(export)?;
    std::fs::write(path, rendered).map_err(|e| LoaderError::io_at(path, e))?;
    info!(path = %path.display(), "Wrote model export");
    Ok(())
}
