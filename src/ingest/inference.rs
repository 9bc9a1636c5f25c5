//! Type inference for raw parameter values

use crate::db::schemas::ParameterValue;
use crate::ingest::descriptions::Descriptions;
use crate::ingest::reader::RawValue;

/// Storage type decided for a raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Float,
    Int,
}

impl ValueType {
    /// Tag written to the `Type` field of value records.
    ///
    /// Existing readers of the model database match on these exact strings.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Text => "<class 'str'>",
            Self::Float => "<class 'float'>",
            Self::Int => "<class 'int'>",
        }
    }

    /// Convert a raw value, keeping the raw string when it does not convert.
    ///
    /// The caller still records `self.tag()`, so a failed coercion leaves a
    /// declared type that differs from the stored value.
    pub fn coerce(&self, raw: &RawValue) -> ParameterValue {
        let coerced = match self {
            Self::Text => None,
            Self::Float => to_float(raw).map(ParameterValue::Float),
            Self::Int => to_int(raw).map(ParameterValue::Int),
        };
        coerced.unwrap_or_else(|| ParameterValue::Text(raw.text.clone()))
    }
}

fn to_float(raw: &RawValue) -> Option<f64> {
    match &raw.number {
        Some(n) => n.as_f64(),
        None => raw.text.trim().parse().ok(),
    }
}

/// YAML floats truncate toward zero; text must be an integer literal
fn to_int(raw: &RawValue) -> Option<i64> {
    match &raw.number {
        Some(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        None => raw.text.trim().parse().ok(),
    }
}

/// Decide how `raw` should be stored given the description of `parameter`
pub fn infer_type(descriptions: &Descriptions, parameter: &str, raw: &RawValue) -> ValueType {
    let Some(declared) = descriptions
        .get(parameter)
        .and_then(|d| d.value_type.as_deref())
    else {
        return ValueType::Text;
    };

    let declared = declared.to_lowercase();
    match declared.as_str() {
        "string" | "text" | "unknown" => ValueType::Text,
        "double" if to_float(raw).is_some() => ValueType::Float,
        "double" => ValueType::Text,
        // int, uint, integer, ...
        t if t.contains("int") => {
            if to_int(raw).is_some() {
                ValueType::Int
            } else {
                ValueType::Text
            }
        }
        _ => ValueType::Text,
    }
}
