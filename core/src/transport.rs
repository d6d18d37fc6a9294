//! Default blocking transport backed by ureq.

use std::time::Duration;

use tracing::debug;
use ureq::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use ureq::{Agent, RequestBuilder};

use crate::error::PhaxioError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Sends requests through a shared ureq `Agent`, which pools connections and
/// is safe to use from several threads.
///
/// The agent is configured so that 3xx/4xx/5xx statuses come back as
/// responses and redirects are never followed. Only I/O, TLS, DNS and
/// timeout failures become `PhaxioError::Connection`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Some(crate::config::DEFAULT_TIMEOUT))
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        // ureq computes Content-Length from the body itself.
        if name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, PhaxioError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let body = request.body.as_slice();

        // Phaxio accepts a form body on every verb, so GET and DELETE are
        // forced to carry one as well.
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url).force_send_body(), headers).send(body),
            HttpMethod::Delete => {
                with_headers(self.agent.delete(url).force_send_body(), headers).send(body)
            }
            HttpMethod::Post => with_headers(self.agent.post(url), headers).send(body),
            HttpMethod::Put => with_headers(self.agent.put(url), headers).send(body),
            HttpMethod::Patch => with_headers(self.agent.patch(url), headers).send(body),
        };

        let mut response = result.map_err(|e| {
            debug!(method = %request.method, url, error = %e, "transport failure");
            PhaxioError::Connection(e.to_string())
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| PhaxioError::Connection(e.to_string()))?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
