use serde::Serialize;

use crate::error::DrugDashError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, DrugDashError> {
    Ok(serde_json::to_string_pretty(value)?)
}
