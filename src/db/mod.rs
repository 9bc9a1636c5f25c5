//! Database layer
//!
//! Storage traits plus MongoDB and in-memory implementations for parameter
//! values, descriptions, metadata and tabulated data files.

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use schemas::{DescriptionRecord, MetadataRecord, ParameterValue, ValueRecord};
pub use store::{BlobStore, CollectionKind, ModelStore, RecordKey, ValueQuery};
