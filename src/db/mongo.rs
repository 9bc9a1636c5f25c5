//! MongoDB implementation of the model and blob stores
//!
//! Values and descriptions live in typed collections with schema-defined
//! indexes; tabulated data files live in a GridFS bucket.

use async_trait::async_trait;
use bson::{doc, Document};
use futures::io::{AsyncReadExt, AsyncWriteExt};
use futures::TryStreamExt;
use mongodb::{gridfs::GridFsBucket, options::IndexOptions, Client, Collection, IndexModel};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::config::DatabaseNames;
use crate::db::schemas::{
    DescriptionRecord, MetadataRecord, ParameterValue, ValueRecord, METADATA_COLLECTION,
};
use crate::db::store::{BlobStore, CollectionKind, ModelStore, RecordKey, ValueQuery};
use crate::types::{LoaderError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices(collection: CollectionKind) -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB-backed store for the three model databases
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    databases: DatabaseNames,
}

impl MongoStore {
    /// Connect and verify the server answers a ping
    pub async fn connect(uri: &str, databases: DatabaseNames) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast on an unreachable server instead of hanging
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| LoaderError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(&databases.simulation_model)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| LoaderError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB");

        Ok(Self { client, databases })
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Typed collection with its schema indexes applied
    async fn collection<T>(&self, db_name: &str, kind: CollectionKind) -> Result<Collection<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + IntoIndexes,
    {
        let collection = self.client.database(db_name).collection::<T>(kind.name());

        let indices: Vec<IndexModel> = T::into_indices(kind)
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        if !indices.is_empty() {
            collection
                .create_indexes(indices)
                .await
                .map_err(|e| LoaderError::Database(format!("Failed to create indexes: {}", e)))?;
        }

        Ok(collection)
    }

    fn values(&self, kind: CollectionKind) -> Collection<ValueRecord> {
        self.client
            .database(&self.databases.simulation_model)
            .collection(kind.name())
    }

    fn bucket(&self) -> GridFsBucket {
        self.client
            .database(&self.databases.tabulated_data)
            .gridfs_bucket(None)
    }
}

#[async_trait]
impl ModelStore for MongoStore {
    async fn drop_databases(&self) -> Result<()> {
        let names = [
            &self.databases.tabulated_data,
            &self.databases.simulation_model,
            &self.databases.descriptions,
        ];
        for name in names {
            info!(database = %name, "Dropping database");
            self.client.database(name).drop().await?;
        }
        Ok(())
    }

    async fn insert_values(
        &self,
        collection: CollectionKind,
        records: Vec<ValueRecord>,
    ) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let target = self
            .collection::<ValueRecord>(&self.databases.simulation_model, collection)
            .await?;
        let result = target
            .insert_many(records)
            .await
            .map_err(LoaderError::bulk_write)?;
        Ok(result.inserted_ids.len())
    }

    async fn insert_descriptions(
        &self,
        collection: CollectionKind,
        records: Vec<DescriptionRecord>,
    ) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let target = self
            .collection::<DescriptionRecord>(&self.databases.descriptions, collection)
            .await?;
        let result = target
            .insert_many(records)
            .await
            .map_err(LoaderError::bulk_write)?;
        Ok(result.inserted_ids.len())
    }

    async fn insert_metadata(&self, record: MetadataRecord) -> Result<()> {
        self.client
            .database(&self.databases.simulation_model)
            .collection::<MetadataRecord>(METADATA_COLLECTION)
            .insert_many(vec![record])
            .await
            .map_err(LoaderError::bulk_write)?;
        Ok(())
    }

    async fn find_values(&self, query: &ValueQuery) -> Result<Vec<ValueRecord>> {
        let cursor = self.values(query.collection).find(query.filter()).await?;
        let records: Vec<ValueRecord> = cursor.try_collect().await?;
        debug!(entity = %query.entity, version = %query.version, count = records.len(), "Fetched values");
        Ok(records)
    }

    async fn find_value(&self, key: &RecordKey) -> Result<Option<ValueRecord>> {
        Ok(self.values(key.collection).find_one(key.filter()).await?)
    }

    async fn set_value(&self, key: &RecordKey, value: &ParameterValue) -> Result<()> {
        let update = doc! { "$set": { "Value": value.to_bson() } };
        let result = self
            .values(key.collection)
            .update_one(key.filter(), update)
            .await?;
        if result.matched_count == 0 {
            return Err(LoaderError::NotFound(format!(
                "no {} record for {} / {} / {}",
                key.collection.name(),
                key.entity,
                key.version,
                key.parameter
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MongoStore {
    async fn blob_exists(&self, filename: &str) -> Result<bool> {
        let found = self
            .bucket()
            .find_one(doc! { "filename": filename })
            .await?;
        Ok(found.is_some())
    }

    async fn put_blob(&self, filename: &str, content_type: &str, data: Vec<u8>) -> Result<()> {
        let mut upload = self
            .bucket()
            .open_upload_stream(filename)
            .metadata(doc! { "contentType": content_type })
            .await?;
        upload.write_all(&data).await?;
        upload.close().await?;
        debug!(filename, bytes = data.len(), "Stored blob");
        Ok(())
    }

    async fn get_blob(&self, filename: &str) -> Result<Vec<u8>> {
        if !self.blob_exists(filename).await? {
            return Err(LoaderError::NotFound(format!(
                "file {} does not exist in database {}",
                filename, self.databases.tabulated_data
            )));
        }
        let mut download = self.bucket().open_download_stream_by_name(filename).await?;
        let mut data = Vec::new();
        download.read_to_end(&mut data).await?;
        Ok(data)
    }
}
