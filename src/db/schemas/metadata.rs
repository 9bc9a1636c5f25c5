//! Model metadata document
//!
//! Holds the current and latest model version tags.

use serde::{Deserialize, Serialize};

use crate::config::ModelTags;

/// Collection name for metadata in the model database
pub const METADATA_COLLECTION: &str = "metadata";

/// Entry name of the model version tag record
pub const MODEL_TAGS_ENTRY: &str = "Simulation-Model-Tags";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetadataRecord {
    #[serde(rename = "Entry")]
    pub entry: String,

    #[serde(rename = "Tags")]
    pub tags: ModelTags,
}

impl MetadataRecord {
    pub fn model_tags(tags: ModelTags) -> Self {
        Self {
            entry: MODEL_TAGS_ENTRY.to_string(),
            tags,
        }
    }
}
