//! Ingestion of the simulation model description tree
//!
//! Reads description and value files from the input root and turns them into
//! flat database records plus the set of data files they reference.

pub mod descriptions;
pub mod files;
pub mod inference;
pub mod reader;
pub mod records;

pub use descriptions::{load_descriptions, Description, Descriptions};
pub use files::{fetch_file, upload_files, FileCollector, UploadReport};
pub use inference::{infer_type, ValueType};
pub use reader::{read_entity_values, EntityValues, ParameterValues, RawValue};
pub use records::{BuiltRecords, RecordBuilder};
