//! Configuration for the simulation model loader
//!
//! Two layers: CLI arguments / environment variables handled by clap, and a
//! `ModelConfig` describing the telescope layout, database names and export
//! kinds. The model config has built-in defaults and can be overridden from a
//! YAML file.

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::db::CollectionKind;
use crate::types::{LoaderError, Result};

/// simmodel-db - load the telescope simulation model into MongoDB
#[derive(Parser, Debug, Clone)]
#[command(name = "simmodel-db")]
#[command(about = "Load, update and export the telescope simulation model database")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// Root of the simulation model description checkout
    /// (contains descriptionsYml/, configReports/ and datFiles/)
    #[arg(long, env = "INPUT_ROOT", default_value = ".")]
    pub input_root: PathBuf,

    /// Optional YAML file overriding the built-in model configuration
    #[arg(long, env = "MODEL_CONFIG")]
    pub model_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Entry points
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Drop and fully reload all databases from the input root
    Load {
        /// Run the pipeline against an in-memory store and only report counts
        #[arg(long)]
        dry_run: bool,

        /// Do not apply the configured post-load updates
        #[arg(long)]
        skip_post_updates: bool,
    },

    /// Overwrite the value of a single (entity, version, parameter) record
    Update {
        /// Telescope identity (e.g. North-LST-1) or site name with --site
        #[arg(long)]
        entity: String,

        /// Model version label
        #[arg(long)]
        version: String,

        /// Parameter name
        #[arg(long)]
        parameter: String,

        /// New value, stored as text
        #[arg(long)]
        value: String,

        /// Update the sites collection instead of telescopes
        #[arg(long)]
        site: bool,
    },

    /// Write the nested JSON model export for the UI
    Export {
        /// Model version to export (defaults to the configured export version)
        #[arg(long)]
        version: Option<String>,

        /// Only export parameters marked applicable
        #[arg(long)]
        only_applicable: bool,

        /// Section taxonomy YAML (overrides the model config)
        #[arg(long)]
        taxonomy: Option<PathBuf>,

        /// Output path (overrides the model config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Download a tabulated data file from blob storage
    FetchFile {
        /// File name as stored in blob storage
        #[arg(long)]
        filename: String,

        /// Destination directory
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },
}

impl Args {
    /// Validate arguments that clap cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.mongodb_uri.trim().is_empty() {
            return Err(LoaderError::Config("MONGODB_URI must not be empty".into()));
        }
        if let Command::Load { .. } = self.command {
            if !self.input_root.is_dir() {
                return Err(LoaderError::Config(format!(
                    "input root {} is not a directory",
                    self.input_root.display()
                )));
            }
        }
        Ok(())
    }
}

/// Database names used by the loader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseNames {
    /// Blob storage for tabulated data files
    pub tabulated_data: String,
    /// Parameter values and metadata
    pub simulation_model: String,
    /// Parameter descriptions
    pub descriptions: String,
}

impl Default for DatabaseNames {
    fn default() -> Self {
        Self {
            tabulated_data: "CTA-Simulation-Model".to_string(),
            simulation_model: "CTA-Simulation-Model".to_string(),
            descriptions: "CTA-Simulation-Model-Descriptions".to_string(),
        }
    }
}

/// One telescope family deployed at a site, with its design variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelescopeFamily {
    pub family: String,
    pub variants: Vec<String>,
}

impl TelescopeFamily {
    pub fn new(family: &str, variants: &[&str]) -> Self {
        Self {
            family: family.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Telescope families of one site, in processing order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteLayout {
    pub site: String,
    pub telescopes: Vec<TelescopeFamily>,
}

/// Input layout: file locations, naming tables and the array layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub descriptions_dir: String,
    pub value_files_dir: String,
    pub data_files_dir: String,

    /// Description section files, merged in this order
    pub description_sections: Vec<String>,

    /// Catch-all description file, only fills gaps
    pub other_descriptions: String,

    /// Array layout, processed in order
    pub sites: Vec<SiteLayout>,

    /// Telescope family -> value file name
    pub file_aliases: IndexMap<String, String>,

    /// Value file name holding all site parameters
    pub site_group: String,

    /// Site parameter prefix -> site name
    pub site_prefixes: IndexMap<String, String>,

    /// Parameter whose versions define the version list of a telescope file
    pub telescope_version_reference: String,

    /// Parameter whose versions define the version list of the site file
    pub site_version_reference: String,

    pub telescope_file_extensions: Vec<String>,
    pub site_file_extensions: Vec<String>,

    /// Version label whose file references are never uploaded
    pub default_version: String,

    /// Content type attached to uploaded data files
    pub blob_content_type: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            descriptions_dir: "descriptionsYml".to_string(),
            value_files_dir: "configReports".to_string(),
            data_files_dir: "datFiles".to_string(),
            description_sections: [
                "Telescope_optics",
                "Camera",
                "Photon_conversion",
                "Trigger",
                "Readout_electronics",
                "Sites_DB",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            other_descriptions: "otherDescriptions".to_string(),
            sites: vec![
                SiteLayout {
                    site: "North".to_string(),
                    telescopes: vec![
                        TelescopeFamily::new("LST", &["1", "D234"]),
                        TelescopeFamily::new("MST-Structure", &["D"]),
                        TelescopeFamily::new("MST-FlashCam", &["D"]),
                        TelescopeFamily::new("MST-NectarCam", &["D"]),
                    ],
                },
                SiteLayout {
                    site: "South".to_string(),
                    telescopes: vec![
                        TelescopeFamily::new("LST", &["D"]),
                        TelescopeFamily::new("MST-Structure", &["D"]),
                        TelescopeFamily::new("MST-FlashCam", &["D"]),
                        TelescopeFamily::new("SCT", &["D"]),
                        TelescopeFamily::new("SST-Structure", &["D"]),
                        TelescopeFamily::new("SST-Camera", &["D"]),
                        TelescopeFamily::new("SST-ASTRI", &["D"]),
                        TelescopeFamily::new("SST-1M", &["D"]),
                        TelescopeFamily::new("SST-GCT", &["D"]),
                    ],
                },
            ],
            file_aliases: [
                ("MST-Structure", "MST-optics"),
                ("SST-ASTRI", "SST-2M-ASTRI"),
                ("SST-1M", "SST-1M"),
                ("SST-GCT", "SST-2M-GCT-S"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            site_group: "Sites".to_string(),
            site_prefixes: [("lapalma", "North"), ("paranal", "South")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            telescope_version_reference: "fadc_amplitude".to_string(),
            site_version_reference: "paranal_altitude".to_string(),
            telescope_file_extensions: vec![".dat".to_string(), ".txt".to_string()],
            site_file_extensions: vec![".dat".to_string(), ".txt".to_string(), ".lis".to_string()],
            default_version: "default".to_string(),
            blob_content_type: "ascii/dat".to_string(),
        }
    }
}

impl LayoutConfig {
    /// Value file name for a telescope family or the site group
    pub fn value_file_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.file_aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn value_file_path(&self, root: &Path, name: &str) -> PathBuf {
        root.join(&self.value_files_dir)
            .join(format!("parValues-{}.yml", self.value_file_name(name)))
    }

    pub fn description_path(&self, root: &Path, section: &str) -> PathBuf {
        root.join(&self.descriptions_dir).join(format!("{}.yml", section))
    }

    pub fn data_file_path(&self, root: &Path, file: &str) -> PathBuf {
        root.join(&self.data_files_dir).join(file)
    }
}

/// One telescope kind in the JSON export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportKind {
    pub name: String,
    /// Stored telescope identities, later ones override earlier ones
    pub entities: Vec<String>,
    /// Prefix of the replica names (e.g. "Lx" -> Lx01, Lx02, ...)
    pub json_prefix: String,
    pub replicas: usize,
}

/// JSON exporter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub kinds: Vec<ExportKind>,
    pub taxonomy_path: PathBuf,
    pub output_path: PathBuf,
    pub version: String,
    /// Taxonomy sections never exported
    pub excluded_sections: Vec<String>,
    /// Identities always queried with the applicable filter on
    pub applicable_only_entities: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            kinds: vec![
                ExportKind {
                    name: "LST".to_string(),
                    entities: vec!["North-LST-D234".to_string()],
                    json_prefix: "Lx".to_string(),
                    replicas: 4,
                },
                ExportKind {
                    name: "MST".to_string(),
                    entities: vec![
                        "North-MST-Structure-D".to_string(),
                        "North-MST-NectarCam-D".to_string(),
                    ],
                    json_prefix: "Mx".to_string(),
                    replicas: 15,
                },
            ],
            taxonomy_path: PathBuf::from("sections.yml"),
            output_path: PathBuf::from("telescopeModel.json"),
            version: "prod4".to_string(),
            excluded_sections: vec![
                "Sites".to_string(),
                "Sections".to_string(),
                "Unnecessary".to_string(),
            ],
            applicable_only_entities: vec!["North-MST-FlashCam-D".to_string()],
        }
    }
}

/// A model version tag stored in the metadata record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelTag {
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Label")]
    pub label: String,
}

/// Current and latest model version tags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelTags {
    #[serde(rename = "Current")]
    pub current: ModelTag,
    #[serde(rename = "Latest")]
    pub latest: ModelTag,
}

impl Default for ModelTags {
    fn default() -> Self {
        let prod5 = ModelTag {
            value: "2020-06-28".to_string(),
            label: "Prod5".to_string(),
        };
        Self {
            current: prod5.clone(),
            latest: prod5,
        }
    }
}

/// A single-field update applied after a full load
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterUpdate {
    #[serde(default)]
    pub collection: CollectionKind,
    pub entity: String,
    pub version: String,
    pub parameter: String,
    pub value: String,
}

/// Which parameters get a description document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DescriptionScope {
    /// Parameters of the last telescope family processed
    #[default]
    LastEntity,
    /// Union of the parameters of every telescope family
    AllEntities,
}

/// Full model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub databases: DatabaseNames,
    pub layout: LayoutConfig,
    pub export: ExportConfig,
    pub model_tags: ModelTags,
    pub post_load_updates: Vec<ParameterUpdate>,
    pub description_scope: DescriptionScope,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            databases: DatabaseNames::default(),
            layout: LayoutConfig::default(),
            export: ExportConfig::default(),
            model_tags: ModelTags::default(),
            post_load_updates: vec![
                ParameterUpdate {
                    collection: CollectionKind::Telescopes,
                    entity: "North-LST-1".to_string(),
                    version: "2020-06-28".to_string(),
                    parameter: "mirror_list".to_string(),
                    value: "mirror_CTA-N-LST1_v2019-03-31.dat".to_string(),
                },
                ParameterUpdate {
                    collection: CollectionKind::Telescopes,
                    entity: "North-LST-D234".to_string(),
                    version: "2020-06-28".to_string(),
                    parameter: "mirror_list".to_string(),
                    value: "mirror_CTA-N-LST2_v2020-04-07.dat".to_string(),
                },
            ],
            description_scope: DescriptionScope::default(),
        }
    }
}

impl ModelConfig {
    /// Parse a config from YAML; missing fields take their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config from `path`, or fall back to the built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| LoaderError::io_at(path, e))?;
                let config = Self::from_yaml(&content)?;
                info!(path = %path.display(), "Loaded model config");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let dbs = &self.databases;
        if [&dbs.tabulated_data, &dbs.simulation_model, &dbs.descriptions]
            .iter()
            .any(|name| name.trim().is_empty())
        {
            return Err(LoaderError::Config("database names must not be empty".into()));
        }
        if self.layout.sites.is_empty() {
            return Err(LoaderError::Config("layout has no sites".into()));
        }
        for site in &self.layout.sites {
            for family in &site.telescopes {
                if family.variants.is_empty() {
                    return Err(LoaderError::Config(format!(
                        "telescope family {} at {} has no variants",
                        family.family, site.site
                    )));
                }
            }
        }
        if let Some(kind) = self.export.kinds.iter().find(|k| k.replicas == 0) {
            return Err(LoaderError::Config(format!(
                "export kind {} has zero replicas",
                kind.name
            )));
        }
        Ok(())
    }
}
