use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::fmt;
use std::time::Duration;

use crate::config::load_config;
use crate::error::{format_erddap_error, parse_erddap_error};

/// Credentials for a protected ERDDAP server, sent as HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

impl Auth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// The HTTP side of a dataset: one blocking GET returning the body as text.
///
/// Implementations must fail on non-2xx responses.
pub trait Transport: fmt::Debug {
    fn get_text(&self, url: &str, auth: Option<&Auth>) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Default credentials, used when a dataset carries none of its own.
    pub auth: Option<Auth>,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth: None,
            verify: true,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Blocking `reqwest` implementation of [`Transport`].
#[derive(Debug, Clone)]
pub struct Client {
    auth: Option<Auth>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("erddap-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("erddap-rs")),
        );

        let mut builder = HttpClient::builder().default_headers(default_headers);
        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            auth: cfg.auth,
            timeout: cfg.timeout,
            http,
        })
    }

    /// Creates a client using environment variables and/or `.erddaprc`.
    ///
    /// Precedence: `ERDDAP_USERNAME` / `ERDDAP_PASSWORD` / `ERDDAP_VERIFY`,
    /// then the file named by `ERDDAP_RC`, `./.erddaprc` or `~/.erddaprc`.
    pub fn from_env() -> Result<Self> {
        Self::new(load_config(None, None, None)?)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }
}

impl Transport for Client {
    fn get_text(&self, url: &str, auth: Option<&Auth>) -> Result<String> {
        log::debug!("GET {}", url);

        let mut req = self.http.get(url).timeout(self.timeout);
        if let Some(auth) = auth.or(self.auth.as_ref()) {
            req = req.basic_auth(&auth.username, Some(&auth.password));
        }

        let resp = req
            .send()
            .with_context(|| format!("request to {} failed", url))?;
        let status = resp.status();
        let text = resp
            .text()
            .with_context(|| format!("failed to read response body from {}", url))?;

        if !status.is_success() {
            if let Some(err) = parse_erddap_error(&text) {
                return Err(format_erddap_error(status, url, &err));
            }

            bail!(
                "ERDDAP request failed: HTTP {} for url ({})\n{}",
                status,
                url,
                text
            );
        }

        log::debug!("GET {} -> {} ({} bytes)", url, status, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_debug_hides_password() {
        let auth = Auth::new("alice", "hunter2");
        let shown = format!("{:?}", auth);
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn builds_with_defaults() {
        let client = Client::new(ClientConfig::default()).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(60));
        assert!(client.auth.is_none());

        let client = client
            .with_timeout(Duration::from_secs(5))
            .with_auth(Auth::new("u", "p"));
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.auth, Some(Auth::new("u", "p")));
    }
}
