//! In-memory model and blob store
//!
//! Mirrors the MongoDB semantics the loader relies on: unordered bulk
//! inserts, filename-keyed blobs, and update-without-upsert. Used for
//! `load --dry-run` and in tests.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::db::schemas::{DescriptionRecord, MetadataRecord, ParameterValue, ValueRecord};
use crate::db::store::{BlobStore, CollectionKind, ModelStore, RecordKey, ValueQuery};
use crate::types::{LoaderError, Result};

/// A blob kept in memory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<CollectionKind, Vec<ValueRecord>>>,
    descriptions: Mutex<HashMap<CollectionKind, Vec<DescriptionRecord>>>,
    metadata: Mutex<Vec<MetadataRecord>>,
    blobs: Mutex<IndexMap<String, StoredBlob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn values(&self, collection: CollectionKind) -> Vec<ValueRecord> {
        self.values
            .lock()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn descriptions(&self, collection: CollectionKind) -> Vec<DescriptionRecord> {
        self.descriptions
            .lock()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn metadata(&self) -> Vec<MetadataRecord> {
        self.metadata.lock().await.clone()
    }

    pub async fn blob_names(&self) -> Vec<String> {
        self.blobs.lock().await.keys().cloned().collect()
    }

    pub async fn blob(&self, filename: &str) -> Option<StoredBlob> {
        self.blobs.lock().await.get(filename).cloned()
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn drop_databases(&self) -> Result<()> {
        self.values.lock().await.clear();
        self.descriptions.lock().await.clear();
        self.metadata.lock().await.clear();
        self.blobs.lock().await.clear();
        Ok(())
    }

    async fn insert_values(
        &self,
        collection: CollectionKind,
        records: Vec<ValueRecord>,
    ) -> Result<usize> {
        let count = records.len();
        self.values
            .lock()
            .await
            .entry(collection)
            .or_default()
            .extend(records);
        Ok(count)
    }

    async fn insert_descriptions(
        &self,
        collection: CollectionKind,
        records: Vec<DescriptionRecord>,
    ) -> Result<usize> {
        let count = records.len();
        self.descriptions
            .lock()
            .await
            .entry(collection)
            .or_default()
            .extend(records);
        Ok(count)
    }

    async fn insert_metadata(&self, record: MetadataRecord) -> Result<()> {
        self.metadata.lock().await.push(record);
        Ok(())
    }

    async fn find_values(&self, query: &ValueQuery) -> Result<Vec<ValueRecord>> {
        let values = self.values.lock().await;
        Ok(values
            .get(&query.collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| query.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_value(&self, key: &RecordKey) -> Result<Option<ValueRecord>> {
        let values = self.values.lock().await;
        Ok(values
            .get(&key.collection)
            .and_then(|records| records.iter().find(|r| key.matches(r)))
            .cloned())
    }

    async fn set_value(&self, key: &RecordKey, value: &ParameterValue) -> Result<()> {
        let mut values = self.values.lock().await;
        let record = values
            .get_mut(&key.collection)
            .and_then(|records| records.iter_mut().find(|r| key.matches(r)))
            .ok_or_else(|| {
                LoaderError::NotFound(format!(
                    "no {} record for {} / {} / {}",
                    key.collection.name(),
                    key.entity,
                    key.version,
                    key.parameter
                ))
            })?;
        record.value = value.clone();
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn blob_exists(&self, filename: &str) -> Result<bool> {
        Ok(self.blobs.lock().await.contains_key(filename))
    }

    async fn put_blob(&self, filename: &str, content_type: &str, data: Vec<u8>) -> Result<()> {
        // GridFS would keep both revisions; callers check existence first
        self.blobs.lock().await.insert(
            filename.to_string(),
            StoredBlob {
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(())
    }

    async fn get_blob(&self, filename: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .await
            .get(filename)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| LoaderError::NotFound(format!("file {} does not exist", filename)))
    }
}
