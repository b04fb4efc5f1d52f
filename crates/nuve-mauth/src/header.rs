//! Parsing and verification of `MAuth` headers.
//!
//! This is the verifying side of [`crate::sign_request`]: a header is split
//! back into its fields and the signature is recomputed from them.

use crate::{canonical_string, calculate_signature, constant_time_eq, Actor, SCHEME, SIGNATURE_METHOD};

const FIELD_PREFIX: &str = "mauth_";

#[derive(Debug, thiserror::Error)]
pub enum MauthError {
    #[error("header does not use the MAuth scheme")]
    MissingScheme,
    #[error("missing header field: {0}")]
    MissingField(&'static str),
    #[error("invalid header field: {0}")]
    InvalidField(&'static str),
    #[error("unsupported signature method: {0}")]
    UnsupportedMethod(String),
    #[error("invalid signature")]
    InvalidSignature,
}

/// Fields of an `MAuth` header, in the order they appeared.
///
/// Names are stored without the `mauth_` prefix, so `mauth_serviceid=svc1`
/// becomes `("serviceid", "svc1")`. Unknown fields are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MauthParams {
    fields: Vec<(String, String)>,
}

impl MauthParams {
    /// Parse a header value such as `MAuth realm=...,mauth_serviceid=...`.
    ///
    /// Each field is split on its first `=`, which keeps base64 padding in
    /// the signature intact.
    pub fn parse(header: &str) -> Result<Self, MauthError> {
        let rest = header
            .strip_prefix(SCHEME)
            .and_then(|r| r.strip_prefix(' '))
            .ok_or(MauthError::MissingScheme)?;

        let fields = rest
            .split(',')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (name, value) = part.split_once('=').unwrap_or((part, ""));
                let name = name.strip_prefix(FIELD_PREFIX).unwrap_or(name);
                (name.to_string(), value.to_string())
            })
            .collect();

        Ok(Self { fields })
    }

    /// Re-emit the header value. `realm` is written bare, every other field
    /// gets the `mauth_` prefix back.
    pub fn to_header(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| {
                if name == "realm" {
                    format!("{name}={value}")
                } else {
                    format!("{FIELD_PREFIX}{name}={value}")
                }
            })
            .collect();
        format!("{SCHEME} {}", fields.join(","))
    }

    /// Look up a field by its unprefixed name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn service_id(&self) -> Option<&str> {
        self.get("serviceid")
    }

    pub fn signature(&self) -> Option<&str> {
        self.get("signature")
    }

    pub fn timestamp(&self) -> Result<i64, MauthError> {
        self.get("timestamp")
            .ok_or(MauthError::MissingField("mauth_timestamp"))?
            .parse()
            .map_err(|_| MauthError::InvalidField("mauth_timestamp"))
    }

    pub fn cnonce(&self) -> Result<u32, MauthError> {
        self.get("cnonce")
            .ok_or(MauthError::MissingField("mauth_cnonce"))?
            .parse()
            .map_err(|_| MauthError::InvalidField("mauth_cnonce"))
    }

    /// Acting user, present only when both username and role were sent.
    pub fn actor(&self) -> Option<Actor> {
        match (self.get("username"), self.get("role")) {
            (Some(username), Some(role)) => Some(Actor::new(username, role)),
            _ => None,
        }
    }
}

/// Check a parsed client header against the service key.
///
/// The canonical string is rebuilt from the raw timestamp and cnonce text,
/// exactly as the client sent them.
pub fn verify_client_signature(params: &MauthParams, key: &str) -> Result<(), MauthError> {
    let method = params
        .get("signature_method")
        .ok_or(MauthError::MissingField("mauth_signature_method"))?;
    if method != SIGNATURE_METHOD {
        return Err(MauthError::UnsupportedMethod(method.to_string()));
    }

    let timestamp = params
        .get("timestamp")
        .ok_or(MauthError::MissingField("mauth_timestamp"))?;
    let cnonce = params
        .get("cnonce")
        .ok_or(MauthError::MissingField("mauth_cnonce"))?;
    let provided = params
        .signature()
        .ok_or(MauthError::MissingField("mauth_signature"))?;

    let actor = params.actor();
    let expected = calculate_signature(&canonical_string(timestamp, cnonce, actor.as_ref()), key);

    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        return Err(MauthError::InvalidSignature);
    }
    Ok(())
}
