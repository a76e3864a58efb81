use thiserror::Error;

/// Errors raised while reading a result out of a response body.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The body is not a well-formed document of the declared format, or its
    /// top level is not a mapping.
    #[error("failed to decode {format} response: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    /// A path step expected a mapping but found a scalar or array. Names the
    /// key whose value was not a mapping.
    #[error("field with name \"{0}\" does not contain child nodes")]
    FieldNotObject(String),

    /// A path key is absent.
    #[error("field with name \"{0}\" not found in response")]
    FieldNotFound(String),

    /// The declared response format is not one of `raw`, `json`, `xml`.
    #[error("response format \"{0}\" is unknown")]
    UnknownFormat(String),
}
