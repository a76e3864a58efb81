//! The request/response half shared by method execution and token refresh.

use std::collections::BTreeMap;

use ianua_core::{Params, RequestTemplate, extract, render};
use ianua_transport::{HttpRequest, HttpTransport};
use tracing::debug;

use crate::error::GatewayError;

/// Render every header value template of `template`.
pub(crate) fn render_headers(template: &RequestTemplate, params: &Params) -> BTreeMap<String, String> {
    template
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), render(value, params)))
        .collect()
}

/// Send an already rendered request and read the result out of the response.
///
/// The status must equal the template's expected status exactly. The result
/// is the raw body when the template asks for it, the extracted field
/// otherwise.
pub(crate) async fn exchange(
    transport: &dyn HttpTransport,
    template: &RequestTemplate,
    url: String,
    headers: BTreeMap<String, String>,
    body: String,
) -> Result<String, GatewayError> {
    let request = HttpRequest {
        method: template.method,
        url,
        headers: headers.into_iter().collect(),
        body: body.into(),
    };

    let response = transport.execute(request).await?;
    if response.status != template.expected_status {
        debug!(
            status = response.status,
            expected = template.expected_status,
            "unexpected status code"
        );
        return Err(GatewayError::UnexpectedStatusCode {
            status: response.status,
            body: response.text(),
        });
    }

    if template.returns_raw_body() {
        return Ok(response.text());
    }
    Ok(extract(
        &response.body,
        template.response_format,
        template.field_path.as_slice(),
    )?)
}
