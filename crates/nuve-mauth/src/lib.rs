//! Client-side MAuth signing for the Nuve REST API.
//!
//! Every request to Nuve carries an `Authorization` header in the `MAuth`
//! scheme. The header names the calling service, a millisecond timestamp,
//! a client nonce and a signature computed with the service's shared key.
//!
//! # Signing a request
//!
//! ```rust
//! use nuve_mauth::{sign_request, Actor, Credentials};
//!
//! let credentials = Credentials::new("svc1", "secret");
//! let signed = sign_request(&credentials, None);
//! assert!(signed.authorization.contains("mauth_serviceid=svc1"));
//!
//! // Token creation also signs the acting user and role
//! let actor = Actor::new("alice", "presenter");
//! let signed = sign_request(&credentials, Some(&actor));
//! assert!(signed.authorization.contains("mauth_username=alice"));
//! ```
//!
//! # Signature encoding
//!
//! The signature is `base64(hex(HMAC_SHA1(key, canonical)))`: the digest is
//! rendered as lowercase hex first and the hex *text* is base64 encoded.
//! Deployed verifiers recompute exactly this, so the double encoding is part
//! of the wire format.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::Sha1;

pub mod header;

pub use header::{verify_client_signature, MauthError, MauthParams};

/// Authentication scheme name that prefixes the header value.
pub const SCHEME: &str = "MAuth";

/// Realm announced in every client header.
pub const REALM: &str = "http://marte3.dit.upm.es";

/// The only signature method Nuve accepts.
pub const SIGNATURE_METHOD: &str = "HMAC_SHA1";

/// Exclusive upper bound of the client nonce.
pub const NONCE_BOUND: u32 = 99_999;

/// Service identity and shared key used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Service id sent as `mauth_serviceid`.
    pub service_id: String,
    /// Shared HMAC key. Never sent on the wire.
    pub key: String,
}

impl Credentials {
    pub fn new(service_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            key: key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("service_id", &self.service_id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// User and role a request acts on behalf of.
///
/// Only signed when both parts are non-empty; otherwise the header and the
/// canonical string omit them entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
    pub role: String,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
        }
    }

    /// Whether this actor takes part in the signature.
    pub fn is_signed(&self) -> bool {
        !self.username.is_empty() && !self.role.is_empty()
    }
}

/// Result of signing a single request.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Client nonce (`mauth_cnonce`).
    pub nonce: u32,
    /// Actor included in the signature, if any.
    pub actor: Option<Actor>,
    /// Encoded signature (`mauth_signature`).
    pub signature: String,
    /// Full `Authorization` header value.
    pub authorization: String,
}

impl SignedHeaders {
    /// Header key/value pairs to attach to the HTTP request.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![("Authorization".to_string(), self.authorization.clone())]
    }
}

/// Sign a request with the current time and a fresh nonce.
///
/// The nonce comes from a thread-local pseudo-random generator and is not
/// cryptographically secure.
pub fn sign_request(credentials: &Credentials, actor: Option<&Actor>) -> SignedHeaders {
    sign_request_at(credentials, actor, now_millis(), random_nonce())
}

/// Sign a request with an explicit timestamp and nonce.
pub fn sign_request_at(
    credentials: &Credentials,
    actor: Option<&Actor>,
    timestamp: i64,
    nonce: u32,
) -> SignedHeaders {
    let actor = actor.filter(|a| a.is_signed());
    let signature = client_signature(timestamp, nonce, actor, &credentials.key);
    let authorization =
        authorization_header(&credentials.service_id, timestamp, nonce, actor, &signature);

    SignedHeaders {
        timestamp,
        nonce,
        actor: actor.cloned(),
        signature,
        authorization,
    }
}

/// Build the text that gets signed: `"{ts},{nonce}"`, followed by
/// `",{username},{role}"` when the actor is signed.
pub fn canonical_string(
    timestamp: impl fmt::Display,
    nonce: impl fmt::Display,
    actor: Option<&Actor>,
) -> String {
    let mut to_sign = format!("{timestamp},{nonce}");
    if let Some(actor) = actor.filter(|a| a.is_signed()) {
        to_sign.push(',');
        to_sign.push_str(&actor.username);
        to_sign.push(',');
        to_sign.push_str(&actor.role);
    }
    to_sign
}

/// Signature a client attaches to a request.
pub fn client_signature(timestamp: i64, nonce: u32, actor: Option<&Actor>, key: &str) -> String {
    calculate_signature(&canonical_string(timestamp, nonce, actor), key)
}

/// Signature Nuve computes over a bare timestamp when signing its replies.
pub fn server_signature(timestamp: impl fmt::Display, key: &str) -> String {
    calculate_signature(&timestamp.to_string(), key)
}

/// `base64(hex(HMAC_SHA1(key, to_sign)))`, standard alphabet with padding.
pub fn calculate_signature(to_sign: &str, key: &str) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).expect("hmac key");
    mac.update(to_sign.as_bytes());
    let digest_hex = hex::encode(mac.finalize().into_bytes());
    STANDARD.encode(digest_hex.as_bytes())
}

/// Assemble the `Authorization` header value.
///
/// Field values are inserted verbatim; commas inside them are not escaped.
pub fn authorization_header(
    service_id: &str,
    timestamp: i64,
    nonce: u32,
    actor: Option<&Actor>,
    signature: &str,
) -> String {
    let mut header = format!("{SCHEME} realm={REALM},mauth_signature_method={SIGNATURE_METHOD}");

    if let Some(actor) = actor.filter(|a| a.is_signed()) {
        header.push_str(",mauth_username=");
        header.push_str(&actor.username);
        header.push_str(",mauth_role=");
        header.push_str(&actor.role);
    }

    header.push_str(",mauth_serviceid=");
    header.push_str(service_id);
    header.push_str(&format!(",mauth_cnonce={nonce},mauth_timestamp={timestamp}"));
    header.push_str(",mauth_signature=");
    header.push_str(signature);
    header
}

/// Wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Uniform nonce in `[0, NONCE_BOUND)`.
pub fn random_nonce() -> u32 {
    rand::thread_rng().gen_range(0..NONCE_BOUND)
}

/// Constant-time comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
