//! Authenticated request pipeline for the Phaxio API.
//!
//! # Design
//! `PhaxioClient` holds immutable configuration and a shared transport, so a
//! single instance can serve many threads. Each call goes through three
//! steps that are also exposed on their own:
//! `build_request` (address, Basic auth, multipart body) → `Transport::send`
//! → `parse_response` (envelope parsing and status classification).

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::config::{ClientConfig, Credentials};
use crate::error::PhaxioError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::multipart::{self, Params};
use crate::resources::{Atas, Faxes};
use crate::response::{classify, parse_envelope, OperationResult};
use crate::transport::UreqTransport;
use crate::types::{Ata, Fax, Page};

/// What a call produced: a classified envelope, or the untouched response
/// when the envelope was bypassed.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(OperationResult),
    Raw(HttpResponse),
}

impl Outcome {
    pub fn into_result(self) -> Option<OperationResult> {
        match self {
            Outcome::Result(result) => Some(result),
            Outcome::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<HttpResponse> {
        match self {
            Outcome::Raw(response) => Some(response),
            Outcome::Result(_) => None,
        }
    }
}

/// Client for the Phaxio v2.1 REST API.
#[derive(Clone)]
pub struct PhaxioClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for PhaxioClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaxioClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PhaxioClient {
    /// Client against the public API host with default settings.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(api_key, api_secret))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn credentials(&self) -> &Credentials {
        &self.config.credentials
    }

    pub fn faxes(&self) -> Faxes<'_> {
        Faxes::new(self)
    }

    pub fn atas(&self) -> Atas<'_> {
        Atas::new(self)
    }

    /// Shorthand for `faxes().create(params)`.
    pub fn send_fax(&self, params: &Params) -> Result<Fax, PhaxioError> {
        self.faxes().create(params)
    }

    /// Shorthand for `faxes().list(params)`.
    pub fn list_faxes(&self, params: &Params) -> Result<Page<Fax>, PhaxioError> {
        self.faxes().list(params)
    }

    /// Shorthand for `atas().list()`.
    pub fn list_atas(&self) -> Result<Page<Ata>, PhaxioError> {
        self.atas().list()
    }

    /// Build the full request for `path` relative to the configured host.
    pub fn build_request(&self, method: HttpMethod, path: &str, params: &Params) -> HttpRequest {
        let url = format!("{}{}", self.config.host, path);
        let encoded = multipart::encode(params);

        debug!(%method, url = %url, "dispatching request");
        if self.config.debug {
            debug!(
                credentials = ?self.config.credentials,
                "authenticating with api key"
            );
            debug!(
                payload = %String::from_utf8_lossy(encoded.body()),
                "request payload"
            );
        }

        let mut headers = vec![(
            "Authorization".to_string(),
            basic_auth(&self.config.credentials),
        )];
        headers.extend(encoded.headers());

        HttpRequest {
            method,
            url,
            headers,
            body: encoded.into_body(),
        }
    }

    /// Turn a raw response into an outcome. With `wrap` set the body must be
    /// an envelope; without it a 2xx response is returned untouched and only
    /// failures are parsed and classified.
    pub fn parse_response(&self, response: HttpResponse, wrap: bool) -> Result<Outcome, PhaxioError> {
        if wrap {
            self.classify_envelope(response).map(Outcome::Result)
        } else {
            self.classify_raw(response).map(Outcome::Raw)
        }
    }

    /// Run one request. See `parse_response` for the meaning of `wrap`.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
        wrap: bool,
    ) -> Result<Outcome, PhaxioError> {
        let response = self.dispatch(method, path, params)?;
        self.parse_response(response, wrap)
    }

    /// Run a structured call and return its envelope.
    pub fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> Result<OperationResult, PhaxioError> {
        let response = self.dispatch(method, path, params)?;
        self.classify_envelope(response)
    }

    /// Run a call whose successful body is not JSON, such as a file download.
    pub fn execute_raw(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> Result<HttpResponse, PhaxioError> {
        let response = self.dispatch(method, path, params)?;
        self.classify_raw(response)
    }

    fn dispatch(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> Result<HttpResponse, PhaxioError> {
        let request = self.build_request(method, path, params);
        let response = self.transport.send(&request)?;

        debug!(status = response.status, "response received");
        if self.config.debug {
            debug!(
                content_type = ?response.content_type,
                body = %response.text(),
                "raw response"
            );
        }
        Ok(response)
    }

    fn classify_envelope(&self, response: HttpResponse) -> Result<OperationResult, PhaxioError> {
        let envelope = parse_envelope(response.status, &response.body)?;
        classify(response.status, envelope)
    }

    fn classify_raw(&self, response: HttpResponse) -> Result<HttpResponse, PhaxioError> {
        if response.is_success() {
            return Ok(response);
        }
        let envelope = parse_envelope(response.status, &response.body)?;
        classify(response.status, envelope)?;
        Ok(response)
    }
}

fn basic_auth(credentials: &Credentials) -> String {
    let pair = format!("{}:{}", credentials.api_key(), credentials.api_secret());
    format!("Basic {}", STANDARD.encode(pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::multipart::Upload;
    use std::sync::Mutex;

    const HOST: &str = "https://api.phaxio.com/v2.1/";

    fn respond(status: u16, body: &str) -> impl Transport + 'static {
        let body = body.as_bytes().to_vec();
        move |_: &HttpRequest| -> Result<HttpResponse, PhaxioError> {
            Ok(HttpResponse {
                status,
                content_type: Some("application/json".to_string()),
                body: body.clone(),
            })
        }
    }

    fn client_with(transport: impl Transport + 'static) -> PhaxioClient {
        PhaxioClient::with_transport(ClientConfig::new("key", "secret"), transport)
    }

    #[test]
    fn build_request_concatenates_host_and_path() {
        let client = PhaxioClient::new("key", "secret");
        let req = client.build_request(HttpMethod::Get, "faxes/123", &Params::new());
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("{HOST}faxes/123"));
    }

    #[test]
    fn build_request_does_not_normalize_slashes() {
        let config = ClientConfig::new("key", "secret").with_host("http://localhost:3000/");
        let client = PhaxioClient::with_transport(config, respond(200, "{}"));
        let req = client.build_request(HttpMethod::Get, "/faxes", &Params::new());
        assert_eq!(req.url, "http://localhost:3000//faxes");
    }

    #[test]
    fn build_request_sets_basic_auth_and_multipart_headers() {
        let client = PhaxioClient::new("key", "secret");
        let params = Params::new().field("to", "+15555550100");
        let req = client.build_request(HttpMethod::Post, "faxes", &params);

        // base64("key:secret")
        assert_eq!(req.header("authorization"), Some("Basic a2V5OnNlY3JldA=="));
        assert_eq!(req.header("expect"), Some("100-continue"));
        assert_eq!(
            req.header("content-length"),
            Some(req.body.len().to_string().as_str())
        );
        let content_type = req.header("content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary=-"));
        let boundary = content_type.trim_start_matches("multipart/form-data; boundary=");
        assert!(req.body.starts_with(format!("--{boundary}\r\n").as_bytes()));
    }

    #[test]
    fn empty_params_still_send_a_valid_body() {
        let client = PhaxioClient::new("key", "secret");
        let req = client.build_request(HttpMethod::Get, "atas/1", &Params::new());
        let body = String::from_utf8(req.body).unwrap();
        assert!(body.starts_with("------------------------------"));
        assert!(body.ends_with("--\r\n"));
    }

    #[test]
    fn execute_wraps_success_envelope() {
        let client = client_with(respond(
            200,
            r#"{"success":true,"message":"ok","data":{"id":123}}"#,
        ));
        let result = client
            .execute(HttpMethod::Get, "faxes/123", &Params::new())
            .unwrap();
        assert!(result.success);
        assert_eq!(result.message, "ok");
        assert_eq!(result.data, Some(serde_json::json!({"id": 123})));
        assert_eq!(result.paging, None);
    }

    #[test]
    fn execute_classifies_errors() {
        let client = client_with(respond(
            422,
            r#"{"success":false,"message":"Phone number is not formatted correctly"}"#,
        ));
        let err = client
            .execute(HttpMethod::Post, "faxes", &Params::new())
            .unwrap_err();
        assert_eq!(
            err,
            PhaxioError::InvalidRequest("Phone number is not formatted correctly".to_string())
        );
    }

    #[test]
    fn execute_with_malformed_body_is_general() {
        let client = client_with(respond(200, "not json"));
        let err = client
            .execute(HttpMethod::Get, "faxes/1", &Params::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::General);
    }

    #[test]
    fn raw_success_is_returned_unparsed() {
        let pdf = b"%PDF-1.4 binary \xff\xfe".to_vec();
        let body = pdf.clone();
        let client = client_with(move |_: &HttpRequest| -> Result<HttpResponse, PhaxioError> {
            Ok(HttpResponse {
                status: 200,
                content_type: Some("application/pdf".to_string()),
                body: body.clone(),
            })
        });
        let response = client
            .execute_raw(HttpMethod::Get, "faxes/1/file", &Params::new())
            .unwrap();
        assert_eq!(response.body, pdf);
        assert_eq!(response.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn raw_failure_is_classified() {
        let client = client_with(respond(
            404,
            r#"{"success":false,"message":"Fax file not found"}"#,
        ));
        let err = client
            .execute_raw(HttpMethod::Get, "faxes/1/file", &Params::new())
            .unwrap_err();
        assert_eq!(err, PhaxioError::NotFound("Fax file not found".to_string()));
    }

    #[test]
    fn request_honours_wrap_flag() {
        let client = client_with(respond(200, r#"{"success":true,"message":"ok"}"#));
        let wrapped = client
            .request(HttpMethod::Get, "account/status", &Params::new(), true)
            .unwrap();
        assert!(wrapped.into_result().is_some());

        let raw = client
            .request(HttpMethod::Get, "account/status", &Params::new(), false)
            .unwrap();
        assert_eq!(raw.into_raw().unwrap().text(), r#"{"success":true,"message":"ok"}"#);
    }

    #[test]
    fn transport_failure_propagates_as_connection() {
        let client = client_with(|_: &HttpRequest| -> Result<HttpResponse, PhaxioError> {
            Err(PhaxioError::Connection("Connection refused (os error 111)".to_string()))
        });
        let err = client
            .execute(HttpMethod::Get, "faxes", &Params::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.message().contains("Connection refused"));
    }

    #[test]
    fn transport_receives_built_request() {
        let seen: Arc<Mutex<Vec<HttpRequest>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let client = client_with(move |req: &HttpRequest| -> Result<HttpResponse, PhaxioError> {
            sink.lock().unwrap().push(req.clone());
            Ok(HttpResponse {
                status: 200,
                content_type: None,
                body: br#"{"success":true,"message":"Fax queued for sending","data":{"id":9}}"#
                    .to_vec(),
            })
        });
        let params = Params::new()
            .field("to", "+15555550100")
            .file("file", Upload::from_string("hello", "txt"));
        client.execute(HttpMethod::Post, "faxes", &params).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, format!("{HOST}faxes"));
        let body = String::from_utf8_lossy(&seen[0].body);
        assert!(body.contains("name=\"file\"; filename=\"string.txt\""));
    }

    #[test]
    fn client_is_shareable_across_threads() {
        let client = client_with(respond(200, r#"{"success":true,"message":"ok"}"#));
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let client = &client;
                scope.spawn(move || {
                    client
                        .execute(HttpMethod::Get, "account/status", &Params::new())
                        .unwrap();
                });
            }
        });
    }

    #[test]
    fn debug_output_hides_secret() {
        let client = PhaxioClient::new("key", "top-secret");
        assert!(!format!("{client:?}").contains("top-secret"));
    }

    /// Collects everything the fmt layer writes.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run one fax send with `debug` set and return the emitted log text.
    fn logs_for(debug: bool) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let config = ClientConfig::new("key", "top-secret").with_debug(debug);
        let client = PhaxioClient::with_transport(
            config,
            respond(200, r#"{"success":true,"message":"queued","data":{"id":1}}"#),
        );
        tracing::subscriber::with_default(subscriber, || {
            client
                .send_fax(&Params::new().field("to", "+15555550100"))
                .unwrap();
        });

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn debug_mode_logs_payload_and_response_without_secret() {
        let logs = logs_for(true);
        assert!(logs.contains("request payload"));
        assert!(logs.contains("+15555550100"));
        assert!(logs.contains("raw response"));
        assert!(logs.contains("queued"));
        assert!(logs.contains("<redacted>"));
        assert!(!logs.contains("top-secret"));
        // Nor the Authorization header value.
        assert!(!logs.contains(&basic_auth(&Credentials::new("key", "top-secret"))));
    }

    #[test]
    fn payload_is_not_logged_without_debug_mode() {
        let logs = logs_for(false);
        assert!(logs.contains("dispatching request"));
        assert!(!logs.contains("request payload"));
        assert!(!logs.contains("+15555550100"));
        assert!(!logs.contains("raw response"));
        assert!(!logs.contains("top-secret"));
    }
}
