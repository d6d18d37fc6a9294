//! Client configuration.

use std::fmt;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "https://api.phaxio.com/v2.1/";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// API key and secret, sent as HTTP Basic credentials on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Everything a `PhaxioClient` needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    /// Prefix every request path is appended to, verbatim.
    pub host: String,
    /// Applied by the default transport; `None` disables the timeout.
    pub timeout: Option<Duration>,
    /// Log request bodies and raw responses at debug level.
    pub debug: bool,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(api_key, api_secret),
            host: DEFAULT_HOST.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            debug: false,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
