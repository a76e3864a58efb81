use std::collections::BTreeMap;

use ianua_core::{Params, render};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::Value;

/// Characters escaped in query names and values: everything except the RFC
/// 3986 unreserved set.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Parameter name the header format template sees the signature under.
pub const SIGNATURE_PARAM: &str = "signature";

/// Where a method puts the signature its signer produced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum SignaturePlacement {
    /// The signature is computed but not sent.
    #[default]
    None,
    /// Sent as header `name`, its value rendered from `format` with the
    /// single parameter `signature`, e.g. `Bearer {{signature}}`.
    Header {
        name: String,
        #[serde(default = "default_header_format")]
        format: String,
    },
    /// Appended to the URL as query parameter `name`.
    Query { name: String },
    /// Exposed to the body template as parameter `param`.
    Body { param: String },
}

fn default_header_format() -> String {
    "{{signature}}".to_owned()
}

impl SignaturePlacement {
    pub fn header(name: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            format: default_header_format(),
        }
    }

    /// Merge `signature` into the request parts. An empty signature leaves
    /// everything untouched.
    pub(crate) fn apply(
        &self,
        signature: &str,
        url: &mut String,
        headers: &mut BTreeMap<String, String>,
        params: &mut Params,
    ) {
        if signature.is_empty() {
            return;
        }
        match self {
            Self::None => {}
            Self::Header { name, format } => {
                let mut only_signature = Params::new();
                only_signature.insert(
                    SIGNATURE_PARAM.to_owned(),
                    Value::String(signature.to_owned()),
                );
                headers.insert(name.clone(), render(format, &only_signature));
            }
            Self::Query { name } => append_query(url, name, signature),
            Self::Body { param } => {
                params.insert(param.clone(), Value::String(signature.to_owned()));
            }
        }
    }
}

fn append_query(url: &mut String, name: &str, value: &str) {
    let fragment = url.find('#').map(|pos| url.split_off(pos));
    if !url.contains('?') {
        url.push('?');
    } else if !url.ends_with('?') && !url.ends_with('&') {
        url.push('&');
    }
    url.push_str(&format!(
        "{}={}",
        utf8_percent_encode(name, QUERY),
        utf8_percent_encode(value, QUERY)
    ));
    if let Some(fragment) = fragment {
        url.push_str(&fragment);
    }
}
