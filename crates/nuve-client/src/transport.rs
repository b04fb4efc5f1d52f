//! HTTP transport seam.
//!
//! [`NuveClient`](crate::NuveClient) signs requests and interprets replies;
//! moving bytes is left to a [`Transport`]. [`HttpTransport`] is the blocking
//! `reqwest` implementation used in production.

use std::fmt;
use std::io::{Cursor, Read};
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Method;

use crate::Error;

/// A fully signed request, ready to put on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body. `None` for GET and DELETE.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status line plus an unread body.
///
/// The body is a reader so callers can decide not to consume it.
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Build a response around an in-memory body.
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: Box::new(Cursor::new(body.into())),
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Executes signed requests.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// Blocking HTTP transport.
///
/// The underlying `reqwest` client is built on first use and shared by every
/// later request. It keeps no idle connections, so each request still opens
/// its own. With no timeout configured a stalled server blocks the caller
/// indefinitely.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    timeout: Option<Duration>,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            client: OnceLock::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, Error> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(self.client.get_or_init(|| client))
    }
}

/// Reason phrase as sent by the server, falling back to the canonical one.
fn reason_phrase(response: &reqwest::blocking::Response) -> String {
    match response.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string(),
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let client = self.client()?;

        let mut builder = client.request(request.method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send()?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            reason: reason_phrase(&response),
            body: Box::new(response),
        })
    }
}
