//! Database schemas
//!
//! Document structures for parameter values, parameter descriptions and
//! model metadata.

mod description;
mod metadata;
mod value;

pub use description::{DescriptionRecord, DescriptionText};
pub use metadata::{MetadataRecord, METADATA_COLLECTION, MODEL_TAGS_ENTRY};
pub use value::{ParameterValue, ValueAttributes, ValueRecord};
