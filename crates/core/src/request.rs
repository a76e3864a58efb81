use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// HTTP verb of a templated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[serde(alias = "get")]
    Get,
    #[default]
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
}

impl HttpMethod {
    /// Returns the method name as an uppercase string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared encoding of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Body is returned as text, no decoding.
    #[default]
    Raw,
    Json,
    Xml,
}

impl ResponseFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "raw" => Ok(Self::Raw),
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            _ => Err(ExtractError::UnknownFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One templated HTTP operation: what to send and how to read the answer.
///
/// Used for gateway methods and for the auth request of token signers.
/// Immutable once built and shared read-only between concurrent calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    pub method: HttpMethod,
    /// URL template.
    pub url: String,
    /// Header name to value template. Ordered so requests are reproducible.
    pub headers: BTreeMap<String, String>,
    /// Body template.
    pub body: String,
    /// The only status code treated as success.
    pub expected_status: u16,
    pub response_format: ResponseFormat,
    /// Keys walked through the decoded response to reach the result.
    pub field_path: Vec<String>,
}

impl RequestTemplate {
    /// A `POST` to `url` expecting `200` and returning the raw body.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: BTreeMap::new(),
            body: String::new(),
            expected_status: 200,
            response_format: ResponseFormat::Raw,
            field_path: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Set the response format and the field path to extract.
    #[must_use]
    pub fn with_response(mut self, format: ResponseFormat, field_path: &[&str]) -> Self {
        self.response_format = format;
        self.field_path = field_path.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    /// Whether the result is the raw body rather than an extracted field.
    pub fn returns_raw_body(&self) -> bool {
        self.response_format == ResponseFormat::Raw || self.field_path.is_empty()
    }
}
