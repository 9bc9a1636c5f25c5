//! Storage seams
//!
//! The loader talks to the model database and to blob storage through these
//! traits. `MongoStore` is the production implementation; `MemoryStore`
//! backs dry runs and tests.

use async_trait::async_trait;
use bson::Document;
use serde::{Deserialize, Serialize};

use crate::db::schemas::{DescriptionRecord, MetadataRecord, ParameterValue, ValueRecord};
use crate::types::Result;

/// Collection pair a record belongs to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    #[default]
    Telescopes,
    Sites,
}

impl CollectionKind {
    /// Collection name, shared by the value and description databases
    pub fn name(&self) -> &'static str {
        match self {
            Self::Telescopes => "telescopes",
            Self::Sites => "sites",
        }
    }

    /// Field carrying the entity identity in value records
    pub fn entity_field(&self) -> &'static str {
        match self {
            Self::Telescopes => "Telescope",
            Self::Sites => "Site",
        }
    }

    fn entity_of<'a>(&self, record: &'a ValueRecord) -> Option<&'a str> {
        match self {
            Self::Telescopes => record.telescope.as_deref(),
            Self::Sites => record.site.as_deref(),
        }
    }
}

/// Identifies a single value record: (entity, version, parameter)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordKey {
    pub collection: CollectionKind,
    pub entity: String,
    pub version: String,
    pub parameter: String,
}

impl RecordKey {
    pub fn telescope(entity: &str, version: &str, parameter: &str) -> Self {
        Self {
            collection: CollectionKind::Telescopes,
            entity: entity.to_string(),
            version: version.to_string(),
            parameter: parameter.to_string(),
        }
    }

    pub fn filter(&self) -> Document {
        let mut filter = Document::new();
        filter.insert(self.collection.entity_field(), self.entity.as_str());
        filter.insert("Version", self.version.as_str());
        filter.insert("Parameter", self.parameter.as_str());
        filter
    }

    pub fn matches(&self, record: &ValueRecord) -> bool {
        self.collection.entity_of(record) == Some(self.entity.as_str())
            && record.version == self.version
            && record.parameter == self.parameter
    }
}

/// All values of one entity at one version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueQuery {
    pub collection: CollectionKind,
    pub entity: String,
    pub version: String,
    pub applicable_only: bool,
}

impl ValueQuery {
    pub fn filter(&self) -> Document {
        let mut filter = Document::new();
        filter.insert(self.collection.entity_field(), self.entity.as_str());
        filter.insert("Version", self.version.as_str());
        if self.applicable_only {
            filter.insert("Applicable", true);
        }
        filter
    }

    pub fn matches(&self, record: &ValueRecord) -> bool {
        self.collection.entity_of(record) == Some(self.entity.as_str())
            && record.version == self.version
            && (!self.applicable_only || record.applicable)
    }
}

/// Model value, description and metadata storage
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Drop the tabulated-data, model and description databases
    async fn drop_databases(&self) -> Result<()>;

    /// Bulk insert value records; returns the number inserted
    async fn insert_values(
        &self,
        collection: CollectionKind,
        records: Vec<ValueRecord>,
    ) -> Result<usize>;

    /// Bulk insert description records; returns the number inserted
    async fn insert_descriptions(
        &self,
        collection: CollectionKind,
        records: Vec<DescriptionRecord>,
    ) -> Result<usize>;

    async fn insert_metadata(&self, record: MetadataRecord) -> Result<()>;

    async fn find_values(&self, query: &ValueQuery) -> Result<Vec<ValueRecord>>;

    async fn find_value(&self, key: &RecordKey) -> Result<Option<ValueRecord>>;

    /// Overwrite the `Value` field of an existing record
    async fn set_value(&self, key: &RecordKey, value: &ParameterValue) -> Result<()>;
}

/// Filename-keyed blob storage for tabulated data files
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn blob_exists(&self, filename: &str) -> Result<bool>;

    async fn put_blob(&self, filename: &str, content_type: &str, data: Vec<u8>) -> Result<()>;

    /// Read a blob; not-found error if no blob has this filename
    async fn get_blob(&self, filename: &str) -> Result<Vec<u8>>;
}
