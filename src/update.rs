//! Single-field updates of stored parameter values

use tracing::info;

use crate::db::{ModelStore, ParameterValue, RecordKey};
use crate::types::{LoaderError, Result};

/// Old and new value of an applied update
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateOutcome {
    pub old_value: ParameterValue,
    pub new_value: ParameterValue,
}

/// Overwrite the `Value` of an existing record.
///
/// Only `Value` changes; `Type`, unit and bounds are left as stored and the
/// new value is not checked against them. A missing record is an error, no
/// record is ever created here.
pub async fn update_parameter<S>(
    store: &S,
    key: &RecordKey,
    new_value: ParameterValue,
) -> Result<UpdateOutcome>
where
    S: ModelStore + ?Sized,
{
    let record = store.find_value(key).await?.ok_or_else(|| {
        LoaderError::NotFound(format!(
            "no {} record for {} / {} / {}",
            key.collection.name(),
            key.entity,
            key.version,
            key.parameter
        ))
    })?;

    info!(
        entity = %key.entity,
        version = %key.version,
        parameter = %key.parameter,
        old = %record.value,
        new = %new_value,
        "Replacing parameter value"
    );

    store.set_value(key, &new_value).await?;

    Ok(UpdateOutcome {
        old_value: record.value,
        new_value,
    })
}
