//! Signed request client for the Nuve REST API.
//!
//! [`NuveClient`] holds the service credentials and the endpoint. Every
//! resource method is a thin parameterization of [`NuveClient::send`], which
//! signs the request, ships it through the configured [`Transport`] and
//! interprets the reply.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use nuve_mauth::{sign_request, Actor, Credentials};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::transport::{HttpRequest, HttpTransport, Transport};
use crate::{Error, Result};

/// Default Nuve listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Where the service lives. Fixed for the lifetime of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: "http".to_string(),
            host: host.into(),
            port,
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Absolute URL for a request path such as `/rooms/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

/// Successful reply: parsed JSON when the body is valid JSON, the raw text
/// otherwise. Bodies that are not even UTF-8 are kept as raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl ResponseBody {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        if let Ok(value) = serde_json::from_slice(&bytes) {
            return ResponseBody::Json(value);
        }
        match String::from_utf8(bytes) {
            Ok(text) => ResponseBody::Text(text),
            Err(e) => ResponseBody::Bytes(e.into_bytes()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Raw body bytes for every variant except parsed JSON.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text.as_bytes()),
            ResponseBody::Bytes(bytes) => Some(bytes),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Client for the Nuve REST API.
///
/// Holds no mutable state, so a single instance can be shared across threads.
/// Each resource method accepts an optional [`Credentials`] override; when it
/// is `None` the client's own credentials sign the request.
///
/// # Example
///
/// ```rust,no_run
/// use nuve_client::NuveClient;
/// use serde_json::json;
///
/// # fn example() -> nuve_client::Result<()> {
/// let nuve = NuveClient::new("svc1", "secret", "localhost", 3000);
///
/// let room = nuve.create_room("standup", &json!({"p2p": true}), None)?;
/// let rooms = nuve.get_rooms(None)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NuveClient {
    credentials: Credentials,
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
}

impl NuveClient {
    /// Store credentials and endpoint. No network activity, no validation.
    pub fn new(
        service: impl Into<String>,
        key: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            credentials: Credentials::new(service, key),
            endpoint: Endpoint::new(host, port),
            transport: Arc::new(HttpTransport::default()),
        }
    }

    pub fn builder() -> NuveClientBuilder {
        NuveClientBuilder::default()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Sign and issue a single request.
    ///
    /// A 401 reply becomes [`Error::Unauthorized`] and its body is left
    /// unread. Any other status is returned as a [`ResponseBody`].
    pub fn send(
        &self,
        method: Method,
        body: Option<&Value>,
        path: &str,
        credentials: Option<&Credentials>,
        actor: Option<&Actor>,
    ) -> Result<ResponseBody> {
        let credentials = credentials.unwrap_or(&self.credentials);
        let signed = sign_request(credentials, actor);

        let body = body.map(serde_json::to_vec).transpose()?;
        let mut headers = signed.headers();
        headers.push(("Content-Type".to_string(), "application/json".to_string()));

        debug!(
            method = %method,
            path,
            service = %credentials.service_id,
            nonce = signed.nonce,
            timestamp = signed.timestamp,
            "sending signed request"
        );

        let request = HttpRequest {
            method: method.clone(),
            url: self.endpoint.url(path),
            headers,
            body,
        };
        let mut response = self.transport.execute(request)?;

        if response.status == 401 {
            warn!(
                method = %method,
                path,
                service = %credentials.service_id,
                reason = %response.reason,
                "request unauthorized"
            );
            return Err(Error::Unauthorized {
                status: response.status,
                reason: response.reason,
            });
        }

        if !(200..300).contains(&response.status) {
            warn!(method = %method, path, status = response.status, "non-success status");
        } else {
            debug!(method = %method, path, status = response.status, "request completed");
        }

        let mut bytes = Vec::new();
        response
            .body
            .read_to_end(&mut bytes)
            .map_err(Error::from_body_read)?;
        Ok(ResponseBody::from_bytes(bytes))
    }

    // -- Rooms --

    pub fn create_room(
        &self,
        name: &str,
        options: &Value,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        let body = json!({"name": name, "options": options});
        self.send(Method::POST, Some(&body), "/rooms/", credentials, None)
    }

    pub fn get_rooms(&self, credentials: Option<&Credentials>) -> Result<ResponseBody> {
        self.send(Method::GET, None, "/rooms/", credentials, None)
    }

    pub fn get_room(&self, room: &str, credentials: Option<&Credentials>) -> Result<ResponseBody> {
        self.send(Method::GET, None, &format!("/rooms/{room}"), credentials, None)
    }

    /// Replace a room's name and options.
    pub fn update_room(
        &self,
        room: &str,
        name: &str,
        options: &Value,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        let body = json!({"name": name, "options": options});
        self.send(
            Method::PUT,
            Some(&body),
            &format!("/rooms/{room}"),
            credentials,
            None,
        )
    }

    /// Merge new options into a room.
    pub fn patch_room(
        &self,
        room: &str,
        name: &str,
        options: &Value,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        let body = json!({"name": name, "options": options});
        self.send(
            Method::PATCH,
            Some(&body),
            &format!("/rooms/{room}"),
            credentials,
            None,
        )
    }

    pub fn delete_room(
        &self,
        room: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        self.send(Method::DELETE, None, &format!("/rooms/{room}"), credentials, None)
    }

    // -- Tokens --

    /// Create an access token for `username` acting as `role` in `room`.
    ///
    /// The only operation that signs an acting user.
    pub fn create_token(
        &self,
        room: &str,
        username: &str,
        role: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        let actor = Actor::new(username, role);
        self.send(
            Method::POST,
            Some(&json!({})),
            &format!("/rooms/{room}/tokens"),
            credentials,
            Some(&actor),
        )
    }

    // -- Services --

    pub fn create_service(
        &self,
        name: &str,
        key: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        let body = json!({"name": name, "key": key});
        self.send(Method::POST, Some(&body), "/services/", credentials, None)
    }

    pub fn get_services(&self, credentials: Option<&Credentials>) -> Result<ResponseBody> {
        self.send(Method::GET, None, "/services/", credentials, None)
    }

    pub fn get_service(
        &self,
        service: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        self.send(
            Method::GET,
            None,
            &format!("/services/{service}"),
            credentials,
            None,
        )
    }

    pub fn delete_service(
        &self,
        service: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        self.send(
            Method::DELETE,
            None,
            &format!("/services/{service}"),
            credentials,
            None,
        )
    }

    // -- Users --

    pub fn get_users(&self, room: &str, credentials: Option<&Credentials>) -> Result<ResponseBody> {
        self.send(
            Method::GET,
            None,
            &format!("/rooms/{room}/users/"),
            credentials,
            None,
        )
    }

    pub fn get_user(
        &self,
        room: &str,
        user: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        self.send(
            Method::GET,
            None,
            &format!("/rooms/{room}/users/{user}"),
            credentials,
            None,
        )
    }

    pub fn delete_user(
        &self,
        room: &str,
        user: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ResponseBody> {
        self.send(
            Method::DELETE,
            None,
            &format!("/rooms/{room}/users/{user}"),
            credentials,
            None,
        )
    }
}

/// Builder for [`NuveClient`].
///
/// Credentials and host are required; the port defaults to [`DEFAULT_PORT`].
#[derive(Default)]
pub struct NuveClientBuilder {
    credentials: Option<Credentials>,
    host: Option<String>,
    port: Option<u16>,
    scheme: Option<String>,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
}

impl NuveClientBuilder {
    pub fn credentials(mut self, service: impl Into<String>, key: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(service, key));
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// URL scheme, `http` unless set.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Per-request timeout for the default transport. Unset means none.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the default blocking HTTP transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<NuveClient> {
        let credentials = self
            .credentials
            .ok_or_else(|| Error::Config("credentials are required".to_string()))?;
        let host = self
            .host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config("host is required".to_string()))?;

        let mut endpoint = Endpoint::new(host, self.port.unwrap_or(DEFAULT_PORT));
        if let Some(scheme) = self.scheme {
            endpoint = endpoint.with_scheme(scheme);
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.timeout)),
        };

        Ok(NuveClient {
            credentials,
            endpoint,
            transport,
        })
    }
}
