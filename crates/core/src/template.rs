//! Placeholder substitution.
//!
//! A template is plain text with `{{name}}` placeholders. The text between the
//! tags is the parameter name, taken literally. Unknown names render as the
//! empty string: this is a substitution engine, not a validator, so callers
//! that need required parameters check them with [`placeholders`].

use crate::value::{Params, to_text};

const START_TAG: &str = "{{";
const END_TAG: &str = "}}";

/// Render `template` against `params`.
///
/// The output is never re-scanned, so parameter values that themselves contain
/// `{{...}}` are emitted unchanged. An opening tag with no closing tag is
/// copied through verbatim.
pub fn render(template: &str, params: &Params) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(START_TAG) {
        let after_start = &rest[start + START_TAG.len()..];
        let Some(end) = after_start.find(END_TAG) else {
            break;
        };

        out.push_str(&rest[..start]);
        let name = &after_start[..end];
        if let Some(value) = params.get(name) {
            out.push_str(&to_text(value));
        }
        rest = &after_start[end + END_TAG.len()..];
    }

    out.push_str(rest);
    out
}

/// Parameter names referenced by `template`, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(START_TAG) {
        let after_start = &rest[start + START_TAG.len()..];
        let Some(end) = after_start.find(END_TAG) else {
            break;
        };
        let name = &after_start[..end];
        if !names.contains(&name) {
            names.push(name);
        }
        rest = &after_start[end + END_TAG.len()..];
    }

    names
}
