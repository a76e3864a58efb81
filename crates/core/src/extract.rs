//! Response decoding and field-path lookup.

use serde_json::{Map, Value};

use crate::error::ExtractError;
use crate::request::ResponseFormat;
use crate::value::to_text;
use crate::xml;

/// Extract the result from a response body.
///
/// With [`ResponseFormat::Raw`] or an empty `field_path` the body is returned
/// as text verbatim. Otherwise the body is decoded into a mapping and
/// `field_path` is walked left to right:
///
/// - a missing key fails with [`ExtractError::FieldNotFound`] naming that key;
/// - a key whose value is not a mapping but still has keys after it fails
///   with [`ExtractError::FieldNotObject`] naming that key.
///
/// The resolved value is rendered with [`to_text`].
pub fn extract<S: AsRef<str>>(
    body: &[u8],
    format: ResponseFormat,
    field_path: &[S],
) -> Result<String, ExtractError> {
    if format == ResponseFormat::Raw || field_path.is_empty() {
        return Ok(String::from_utf8_lossy(body).into_owned());
    }

    let document = decode(body, format)?;
    let value = walk(&document, field_path)?;
    Ok(to_text(value))
}

/// Like [`extract`], with the format given by name.
pub fn extract_str<S: AsRef<str>>(
    body: &[u8],
    format: &str,
    field_path: &[S],
) -> Result<String, ExtractError> {
    extract(body, format.parse()?, field_path)
}

fn decode(body: &[u8], format: ResponseFormat) -> Result<Map<String, Value>, ExtractError> {
    match format {
        ResponseFormat::Json => match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ExtractError::Decode {
                format: "json",
                message: format!("expected an object at the top level, got {}", kind(&other)),
            }),
            Err(e) => Err(ExtractError::Decode {
                format: "json",
                message: e.to_string(),
            }),
        },
        ResponseFormat::Xml => xml::decode(body),
        ResponseFormat::Raw => Err(ExtractError::Decode {
            format: "raw",
            message: "raw bodies have no structure".to_owned(),
        }),
    }
}

fn walk<'a, S: AsRef<str>>(
    document: &'a Map<String, Value>,
    field_path: &[S],
) -> Result<&'a Value, ExtractError> {
    let mut current = document;
    let mut previous: Option<&str> = None;
    let mut resolved: Option<&'a Value> = None;

    for key in field_path {
        let key = key.as_ref();
        if let Some(value) = resolved {
            current = value.as_object().ok_or_else(|| {
                ExtractError::FieldNotObject(previous.unwrap_or_default().to_owned())
            })?;
        }
        let value = current
            .get(key)
            .ok_or_else(|| ExtractError::FieldNotFound(key.to_owned()))?;
        resolved = Some(value);
        previous = Some(key);
    }

    resolved.ok_or_else(|| ExtractError::FieldNotFound(String::new()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
