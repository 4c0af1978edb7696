//! Dispatch payload decoding.
//!
//! When the `tracing` feature is enabled, fields the remote sends that the
//! target type does not model are reported at `debug` level, and a failed
//! decode logs the JSON path and value that broke it.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a dispatch payload into `T`, reporting unknown fields.
///
/// Unknown fields never fail the decode. The remote adds fields over time
/// and the types in [`crate::types`] only model a subset.
#[cfg(feature = "tracing")]
pub(crate) fn deserialize_payload<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    use std::any::type_name;

    tracing::trace!(type_name = %type_name::<T>(), json = %value, "decoding payload");

    let original = value.clone();
    let mut unknown_paths: Vec<String> = Vec::new();

    let result: T = serde_ignored::deserialize(value, |path| {
        unknown_paths.push(path.to_string());
    })
    .inspect_err(|_| {
        let json = original.to_string();
        let de = &mut serde_json::Deserializer::from_str(&json);
        let path_result: Result<T, _> = serde_path_to_error::deserialize(de);
        if let Err(path_err) = path_result {
            let path = path_err.path().to_string();
            tracing::warn!(
                type_name = %type_name::<T>(),
                path = %path,
                value = %format_value(lookup_value(&original, &path)),
                error = %path_err.inner(),
                "payload decode failed"
            );
        }
    })?;

    for path in unknown_paths {
        tracing::debug!(
            type_name = %type_name::<T>(),
            field = %path,
            value = %format_value(lookup_value(&original, &path)),
            "unknown field in payload"
        );
    }

    Ok(result)
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn deserialize_payload<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Look up a value by a `serde_ignored` or `serde_path_to_error` path such as
/// `guilds[3].id`, `author.?.bot` or `items.0`.
#[cfg(feature = "tracing")]
fn lookup_value<'value>(value: &'value Value, path: &str) -> Option<&'value Value> {
    let mut current = value;

    for segment in parse_path_segments(path) {
        if segment == "?" {
            continue;
        }

        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

#[cfg(feature = "tracing")]
fn parse_path_segments(path: &str) -> Vec<String> {
    path.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(feature = "tracing")]
fn format_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "<unable to retrieve>".to_owned(), Value::to_string)
}
