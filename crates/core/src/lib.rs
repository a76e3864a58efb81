//! Core building blocks shared by every Ianua crate.
//!
//! - [`template`]: `{{name}}` placeholder substitution used for URLs, headers,
//!   bodies and the byte sequences that get signed.
//! - [`request`]: the immutable shape of one templated HTTP operation.
//! - [`extract`]: decoding of raw/JSON/XML response bodies and field-path
//!   lookup.
//! - [`cache`]: the expiring key-value store used by repositories.

pub mod cache;
pub mod error;
pub mod extract;
pub mod request;
pub mod template;
pub mod value;

mod xml;

pub use cache::TtlCache;
pub use error::ExtractError;
pub use extract::{extract, extract_str};
pub use request::{HttpMethod, RequestTemplate, ResponseFormat};
pub use template::{placeholders, render};
pub use value::{Params, to_text};
