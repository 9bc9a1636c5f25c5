//! End-to-end load / update / export against the demo model tree

use async_trait::async_trait;
use std::path::PathBuf;

use simmodel_db::{
    config::ModelConfig,
    db::{
        BlobStore, CollectionKind, DescriptionRecord, MemoryStore, MetadataRecord, ModelStore,
        ParameterValue, RecordKey, ValueQuery, ValueRecord,
    },
    export::{build_export, read_taxonomy},
    update::update_parameter,
    DatabaseLoader, LoaderError, Result,
};

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos")
}

fn demo_config() -> ModelConfig {
    ModelConfig::load(Some(&demos().join("model-config.yml"))).expect("demo config loads")
}

async fn loaded_store(config: &ModelConfig, post_updates: bool) -> MemoryStore {
    let store = MemoryStore::new();
    DatabaseLoader::new(&store, config, demos().join("model"))
        .load(post_updates)
        .await
        .expect("demo tree loads");
    store
}

#[tokio::test]
async fn test_full_load_counts() {
    let config = demo_config();
    let store = MemoryStore::new();
    let report = DatabaseLoader::new(&store, &config, demos().join("model"))
        .load(true)
        .await
        .expect("demo tree loads");

    assert_eq!(report.descriptions_read, 12);

    // LST: 15 records x 2 variants, MST-Structure: 5 records x 2 sites
    assert_eq!(report.telescopes.values, 40);
    // Descriptions come from the last family processed (South MST-Structure)
    assert_eq!(report.telescopes.descriptions, 3);
    assert_eq!(report.telescopes.files.uploaded, 4);

    assert_eq!(report.sites.values, 7);
    assert_eq!(report.sites.descriptions, 4);
    assert_eq!(report.sites.files.uploaded, 1);

    assert_eq!(report.post_load_updates, 2);
    assert_eq!(store.metadata().await.len(), 1);
    assert_eq!(store.blob_names().await.len(), 5);
}

#[tokio::test]
async fn test_reload_starts_from_empty_state() {
    let config = demo_config();
    let store = loaded_store(&config, false).await;

    let report = DatabaseLoader::new(&store, &config, demos().join("model"))
        .load(false)
        .await
        .unwrap();

    assert_eq!(store.values(CollectionKind::Telescopes).await.len(), 40);
    assert_eq!(store.metadata().await.len(), 1);
    assert_eq!(report.telescopes.files.skipped, 0);
    assert_eq!(store.blob_names().await.len(), 5);
}

#[tokio::test]
async fn test_point_read_returns_inferred_value() {
    let config = demo_config();
    let store = loaded_store(&config, false).await;

    let key = RecordKey::telescope("North-LST-D234", "2020-06-28", "focal_length");
    let record = store.find_value(&key).await.unwrap().expect("record exists");
    assert_eq!(record.value, ParameterValue::Float(2923.7));
    assert_eq!(record.value_type, "<class 'float'>");
    assert_eq!(record.attributes.unit, Some(serde_json::json!("cm")));

    let gains = store
        .find_value(&RecordKey::telescope("North-LST-1", "default", "num_gains"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(gains.value, ParameterValue::Int(2));
    assert_eq!(gains.attributes.maximum, Some(serde_json::json!(2)));

    let shape = store
        .find_value(&RecordKey::telescope("North-LST-1", "2020-06-28", "camera_body_shape"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shape.value, ParameterValue::from("hexagonal"));
    assert!(!shape.applicable);

    // quantum_efficiency only exists for 2020-06-28
    let sparse = store
        .find_value(&RecordKey::telescope("North-LST-1", "default", "quantum_efficiency"))
        .await
        .unwrap();
    assert!(sparse.is_none());
}

#[tokio::test]
async fn test_site_records() {
    let config = demo_config();
    let store = loaded_store(&config, false).await;

    let key = RecordKey {
        collection: CollectionKind::Sites,
        entity: "North".into(),
        version: "prod4".into(),
        parameter: "altitude".into(),
    };
    let altitude = store.find_value(&key).await.unwrap().unwrap();
    assert_eq!(altitude.value, ParameterValue::Float(2156.0));
    assert_eq!(altitude.attributes.unit, Some(serde_json::json!("m")));

    let descriptions = store.descriptions(CollectionKind::Sites).await;
    assert!(descriptions.iter().any(|d| d.parameter == "array_layout"));
}

#[tokio::test]
async fn test_post_load_updates_applied() {
    let config = demo_config();
    let store = loaded_store(&config, true).await;

    let lst1 = store
        .find_value(&RecordKey::telescope("North-LST-1", "2020-06-28", "mirror_list"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lst1.value, ParameterValue::from("mirror_CTA-N-LST1_v2019-03-31.dat"));

    let lst2 = store
        .find_value(&RecordKey::telescope("North-LST-D234", "2020-06-28", "mirror_list"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lst2.value, ParameterValue::from("mirror_CTA-N-LST2_v2020-04-07.dat"));
}

#[tokio::test]
async fn test_update_unknown_record_fails() {
    let config = demo_config();
    let store = loaded_store(&config, false).await;

    let key = RecordKey::telescope("North-SCT-D", "prod4", "focal_length");
    let err = update_parameter(&store, &key, "1.0".into()).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(store.find_value(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_export_after_load() {
    let config = demo_config();
    let store = loaded_store(&config, false).await;

    let taxonomy = read_taxonomy(&demos().join("sections.yml")).unwrap();
    let export = build_export(&store, &config.export, &taxonomy, "prod4", false)
        .await
        .unwrap();

    let names: Vec<_> = export.keys().cloned().collect();
    assert_eq!(names, vec!["Lx01", "Lx02", "Mx01", "Mx02", "Mx03"]);

    let lst = &export["Lx01"];
    let sections: Vec<_> = lst.keys().cloned().collect();
    assert_eq!(sections, vec!["Optics", "Camera", "Electronics"]);

    let optics: Vec<_> = lst["Optics"].children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(optics, vec!["focal_length", "mirror_list"]);
    assert_eq!(lst["Camera"].children[0].val, ParameterValue::Int(2));

    let mst_focal = &export["Mx03"]["Optics"].children[0];
    assert_eq!(mst_focal.val, ParameterValue::Float(1600.0));
}

/// In-memory store whose bulk value insert fails for one collection
struct RejectingStore {
    inner: MemoryStore,
    reject: CollectionKind,
}

#[async_trait]
impl ModelStore for RejectingStore {
    async fn drop_databases(&self) -> Result<()> {
        self.inner.drop_databases().await
    }

    async fn insert_values(
        &self,
        collection: CollectionKind,
        records: Vec<ValueRecord>,
    ) -> Result<usize> {
        if collection == self.reject {
            return Err(LoaderError::BulkWrite(format!(
                "duplicate key inserting into {}",
                collection.name()
            )));
        }
        self.inner.insert_values(collection, records).await
    }

    async fn insert_descriptions(
        &self,
        collection: CollectionKind,
        records: Vec<DescriptionRecord>,
    ) -> Result<usize> {
        self.inner.insert_descriptions(collection, records).await
    }

    async fn insert_metadata(&self, record: MetadataRecord) -> Result<()> {
        self.inner.insert_metadata(record).await
    }

    async fn find_values(&self, query: &ValueQuery) -> Result<Vec<ValueRecord>> {
        self.inner.find_values(query).await
    }

    async fn find_value(&self, key: &RecordKey) -> Result<Option<ValueRecord>> {
        self.inner.find_value(key).await
    }

    async fn set_value(&self, key: &RecordKey, value: &ParameterValue) -> Result<()> {
        self.inner.set_value(key, value).await
    }
}

#[async_trait]
impl BlobStore for RejectingStore {
    async fn blob_exists(&self, filename: &str) -> Result<bool> {
        self.inner.blob_exists(filename).await
    }

    async fn put_blob(&self, filename: &str, content_type: &str, data: Vec<u8>) -> Result<()> {
        self.inner.put_blob(filename, content_type, data).await
    }

    async fn get_blob(&self, filename: &str) -> Result<Vec<u8>> {
        self.inner.get_blob(filename).await
    }
}

#[tokio::test]
async fn test_bulk_write_failure_aborts_load() {
    let config = demo_config();
    let store = RejectingStore {
        inner: MemoryStore::new(),
        reject: CollectionKind::Sites,
    };

    let err = DatabaseLoader::new(&store, &config, demos().join("model"))
        .load(true)
        .await
        .unwrap_err();
    assert!(matches!(err, LoaderError::BulkWrite(_)));

    // Telescopes went in before the failure, nothing after it did
    assert_eq!(store.inner.values(CollectionKind::Telescopes).await.len(), 40);
    assert!(store.inner.values(CollectionKind::Sites).await.is_empty());
    assert!(store.inner.descriptions(CollectionKind::Sites).await.is_empty());
    assert!(store.inner.metadata().await.is_empty());
    assert!(!store.inner.blob_names().await.iter().any(|name| name.ends_with(".lis")));

    let lst1 = store
        .inner
        .find_value(&RecordKey::telescope("North-LST-1", "2020-06-28", "mirror_list"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lst1.value, ParameterValue::from("mirror_CTA-N-LST2_v2020-04-07.dat"));
}

#[tokio::test]
async fn test_yaml_float_under_integer_type() {
    let config = demo_config();
    let store = loaded_store(&config, false).await;

    let gains = store
        .find_value(&RecordKey::telescope("North-LST-D234", "2020-06-28", "num_gains"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(gains.value, ParameterValue::Int(2));
    assert_eq!(gains.value_type, "<class 'int'>");
}
