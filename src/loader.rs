//! Full database reload
//!
//! One linear pass: drop, read descriptions, build and insert telescope
//! records, upload their data files, repeat for sites, write the metadata
//! record and apply the configured post-load updates. Any failure aborts the
//! pass; databases dropped earlier stay empty.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ModelConfig;
use crate::db::{BlobStore, CollectionKind, MetadataRecord, ModelStore, ParameterValue, RecordKey};
use crate::ingest::{load_descriptions, upload_files, BuiltRecords, RecordBuilder, UploadReport};
use crate::types::Result;
use crate::update::update_parameter;

/// Counts of one collection pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub values: usize,
    pub descriptions: usize,
    pub files: UploadReport,
}

/// Summary of a load pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub descriptions_read: usize,
    pub telescopes: CollectionReport,
    pub sites: CollectionReport,
    pub post_load_updates: usize,
}

pub struct DatabaseLoader<'a, S>
where
    S: ModelStore + BlobStore + ?Sized,
{
    store: &'a S,
    config: &'a ModelConfig,
    root: PathBuf,
}

impl<'a, S> DatabaseLoader<'a, S>
where
    S: ModelStore + BlobStore + ?Sized,
{
    pub fn new(store: &'a S, config: &'a ModelConfig, root: impl AsRef<Path>) -> Self {
        Self {
            store,
            config,
            root: root.as_ref().to_path_buf(),
        }
    }

    async fn fill(&self, collection: CollectionKind, built: BuiltRecords) -> Result<CollectionReport> {
        let databases = &self.config.databases;

        info!(database = %databases.simulation_model, collection = collection.name(), "Filling values");
        let values = self.store.insert_values(collection, built.values).await?;

        info!(database = %databases.tabulated_data, files = built.files.len(), "Adding files");
        let files = upload_files(
            self.store,
            &built.files,
            &self.config.layout.blob_content_type,
        )
        .await?;

        info!(database = %databases.descriptions, collection = collection.name(), "Filling descriptions");
        let descriptions = self
            .store
            .insert_descriptions(collection, built.descriptions)
            .await?;

        Ok(CollectionReport {
            values,
            descriptions,
            files,
        })
    }

    /// Apply the configured post-load updates in order
    pub async fn apply_post_load_updates(&self) -> Result<usize> {
        for update in &self.config.post_load_updates {
            let key = RecordKey {
                collection: update.collection,
                entity: update.entity.clone(),
                version: update.version.clone(),
                parameter: update.parameter.clone(),
            };
            update_parameter(self.store, &key, ParameterValue::Text(update.value.clone())).await?;
        }
        Ok(self.config.post_load_updates.len())
    }

    /// Drop and rebuild every database
    pub async fn load(&self, apply_post_updates: bool) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        self.store.drop_databases().await?;

        let descriptions = load_descriptions(&self.root, &self.config.layout)?;
        report.descriptions_read = descriptions.len();

        let builder = RecordBuilder::new(&self.root, &self.config.layout, &descriptions);

        let telescopes = builder.build_telescopes(self.config.description_scope)?;
        report.telescopes = self.fill(CollectionKind::Telescopes, telescopes).await?;

        let sites = builder.build_sites()?;
        report.sites = self.fill(CollectionKind::Sites, sites).await?;

        info!("Adding metadata");
        self.store
            .insert_metadata(MetadataRecord::model_tags(self.config.model_tags.clone()))
            .await?;

        if apply_post_updates {
            report.post_load_updates = self.apply_post_load_updates().await?;
        }

        info!(
            telescope_values = report.telescopes.values,
            site_values = report.sites.values,
            files_uploaded = report.telescopes.files.uploaded + report.sites.files.uploaded,
            post_load_updates = report.post_load_updates,
            "Load complete"
        );
        Ok(report)
    }
}
