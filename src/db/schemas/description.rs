//! Parameter description document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::CollectionKind;

/// Human-readable description and display directives of a parameter
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub par_or_alg: Option<serde_json::Value>,

    // Print only if parameter A is in a list: { A: [1, 2, 3] }
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_if: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_if_not: Option<serde_json::Value>,

    // Skip based on the parameter's own value (e.g. zero)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_if_value: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_if_not_value: Option<serde_json::Value>,

    // Skip based on the value of another parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_if_value_equal_to: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_if_value_not_equal_to: Option<serde_json::Value>,
}

/// Description document stored in the description database
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DescriptionRecord {
    #[serde(rename = "Parameter")]
    pub parameter: String,

    #[serde(flatten)]
    pub text: DescriptionText,
}

impl DescriptionRecord {
    pub fn new(parameter: impl Into<String>, text: DescriptionText) -> Self {
        Self {
            parameter: parameter.into(),
            text,
        }
    }
}

impl IntoIndexes for DescriptionRecord {
    fn into_indices(_collection: CollectionKind) -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "Parameter": 1 },
            Some(
                IndexOptions::builder()
                    .name("parameter_index".to_string())
                    .build(),
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_directives() {
        let record = DescriptionRecord::new(
            "nsb_rate",
            DescriptionText {
                short_description: Some(serde_json::json!("NSB rate")),
                print_if_value_not_equal_to: Some(serde_json::json!({"trigger": 0})),
                ..Default::default()
            },
        );
        let doc = bson::to_document(&record).expect("encodes");
        assert_eq!(doc.get_str("Parameter").unwrap(), "nsb_rate");
        assert_eq!(doc.get_str("shortDescription").unwrap(), "NSB rate");
        assert!(doc.contains_key("printIfValueNotEqualTo"));
        assert!(!doc.contains_key("description"));
    }
}
