//! Parameter value document schema
//!
//! One document per (entity, version, parameter). Field names are the ones
//! existing consumers of the model database read, hence the capitalization.

use bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::IntoIndexes;
use crate::db::CollectionKind;

/// A stored parameter value: text, double or 64-bit integer
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ParameterValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl ParameterValue {
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::Text(s) => Bson::String(s.clone()),
            Self::Int(i) => Bson::Int64(*i),
            Self::Float(f) => Bson::Double(*f),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Unit, allowed items and bounds copied from a parameter description
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ValueAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Value>,
}

/// Parameter value document stored in the `telescopes` / `sites` collections
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValueRecord {
    /// Telescope identity, e.g. `North-LST-1` (telescope collection only)
    #[serde(rename = "Telescope", default, skip_serializing_if = "Option::is_none")]
    pub telescope: Option<String>,

    /// Site name, e.g. `South` (site collection only)
    #[serde(rename = "Site", default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    #[serde(rename = "Parameter")]
    pub parameter: String,

    #[serde(rename = "Applicable")]
    pub applicable: bool,

    #[serde(rename = "Version")]
    pub version: String,

    /// Inferred type tag; can disagree with `value` when coercion failed
    #[serde(rename = "Type")]
    pub value_type: String,

    #[serde(rename = "Value")]
    pub value: ParameterValue,

    /// Whether the value names an external data file
    #[serde(rename = "File")]
    pub file: bool,

    #[serde(flatten)]
    pub attributes: ValueAttributes,
}

impl ValueRecord {
    /// Entity identity regardless of collection
    pub fn entity(&self) -> &str {
        self.telescope
            .as_deref()
            .or(self.site.as_deref())
            .unwrap_or_default()
    }
}

impl IntoIndexes for ValueRecord {
    fn into_indices(collection: CollectionKind) -> Vec<(Document, Option<IndexOptions>)> {
        let entity = collection.entity_field();
        vec![
            // Point lookups by (entity, version, parameter); not unique
            (
                doc! { entity: 1, "Version": 1, "Parameter": 1 },
                Some(
                    IndexOptions::builder()
                        .name(format!("{}_version_parameter", entity.to_lowercase()))
                        .build(),
                ),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValueRecord {
        ValueRecord {
            telescope: Some("North-LST-1".to_string()),
            site: None,
            parameter: "focal_length".to_string(),
            applicable: true,
            version: "2020-06-28".to_string(),
            value_type: "<class 'float'>".to_string(),
            value: ParameterValue::Float(2800.0),
            file: false,
            attributes: ValueAttributes {
                unit: Some(serde_json::json!("cm")),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_record_field_names() {
        let doc = bson::to_document(&sample()).expect("encodes");
        assert_eq!(doc.get_str("Telescope").unwrap(), "North-LST-1");
        assert_eq!(doc.get_str("Parameter").unwrap(), "focal_length");
        assert_eq!(doc.get_f64("Value").unwrap(), 2800.0);
        assert_eq!(doc.get_str("unit").unwrap(), "cm");
        assert!(!doc.contains_key("Site"));
        assert!(!doc.contains_key("minimum"));
    }

    #[test]
    fn test_value_keeps_numeric_kind_from_bson() {
        let mut doc = bson::to_document(&sample()).expect("encodes");
        doc.insert("Value", Bson::Int32(7));
        doc.insert("_id", bson::oid::ObjectId::new());
        let record: ValueRecord = bson::from_document(doc).expect("decodes");
        assert_eq!(record.value, ParameterValue::Int(7));
        assert_eq!(record.entity(), "North-LST-1");
    }

    #[test]
    fn test_text_value_display() {
        let value = ParameterValue::from("mirror_list.dat");
        assert_eq!(value.to_string(), "mirror_list.dat");
        assert_eq!(value.to_bson(), Bson::String("mirror_list.dat".into()));
    }
}
