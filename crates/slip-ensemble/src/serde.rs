use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use slip_core::errors::{EnsembleError, ErrorInfo};

fn serde_error(code: &str, err: impl ToString) -> EnsembleError {
    EnsembleError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Recursively orders object keys so equal values encode to equal bytes.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, nested)| (key, sort_keys(nested)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        scalar => scalar,
    }
}

/// Pretty JSON with sorted keys and a trailing newline.
///
/// Manifests and hashed values both go through here, so two builds of the
/// same table produce byte-identical output.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, EnsembleError> {
    let tree = serde_json::to_value(value).map_err(|err| serde_error("json-encode", err))?;
    let mut bytes = serde_json::to_vec_pretty(&sort_keys(tree))
        .map_err(|err| serde_error("json-encode", err))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decodes JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, EnsembleError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json-decode", err))
}

/// Decodes a YAML document, reporting the offending line when known.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, EnsembleError> {
    serde_yaml::from_slice(data).map_err(|err| {
        let mut info = ErrorInfo::new("yaml-decode", err.to_string());
        if let Some(location) = err.location() {
            info = info.with_context("line", location.line().to_string());
        }
        EnsembleError::Serde(info)
    })
}
