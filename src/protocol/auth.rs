//! HTTP Basic/Bearer and SSH public-key authentication for the smart-protocol surface: parses
//! an `Authorization` header, checks credentials against a pluggable `AuthProvider`, and builds
//! the `WWW-Authenticate` challenge for unauthenticated responses.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::protocol::{AuthenticationService, ProtocolError};

/// Credentials extracted from an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// Verifies credentials extracted from a request. Implementations typically check against a
/// user store, an OAuth introspection endpoint, or a static token/key list.
pub trait AuthProvider: Send + Sync {
    /// Check a username/password pair, e.g. for HTTP Basic auth over git push/pull.
    fn verify_password(&self, username: &str, password: &str) -> bool;

    /// Check a bearer token, e.g. a personal access token or CI job token.
    fn verify_token(&self, token: &str) -> bool;

    /// Check an SSH public key presented for `username`.
    fn verify_public_key(&self, username: &str, public_key: &[u8]) -> bool;
}

/// Parse the `Authorization` header value into `Credentials`.
pub fn parse_authorization_header(value: &str) -> Result<Credentials, ProtocolError> {
    if let Some(encoded) = value.strip_prefix("Basic ") {
        let decoded = BASE64.decode(encoded.trim()).map_err(|e| {
            ProtocolError::unauthorized(&format!("malformed Basic credentials: {e}"))
        })?;
        let text = String::from_utf8(decoded).map_err(|e| {
            ProtocolError::unauthorized(&format!("non-UTF-8 Basic credentials: {e}"))
        })?;
        let (username, password) = text
            .split_once(':')
            .ok_or_else(|| ProtocolError::unauthorized("Basic credentials missing ':' separator"))?;
        Ok(Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        })
    } else if let Some(token) = value.strip_prefix("Bearer ") {
        Ok(Credentials::Bearer {
            token: token.trim().to_string(),
        })
    } else {
        Err(ProtocolError::unauthorized("unsupported Authorization scheme"))
    }
}

/// Constant-time string comparison for credential checks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    ring::constant_time::verify_slices_are_equal(a.as_bytes(), b.as_bytes()).is_ok()
}

/// Builds the `WWW-Authenticate` challenge header value for a 401 response.
pub fn www_authenticate_challenge(realm: &str) -> String {
    format!("Basic realm=\"{realm}\"")
}

/// `AuthenticationService` backed by a pluggable `AuthProvider`, parsing Basic/Bearer headers
/// for HTTP and public keys for SSH.
pub struct HttpAuthService<P: AuthProvider> {
    provider: P,
}

impl<P: AuthProvider> HttpAuthService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: AuthProvider> AuthenticationService for HttpAuthService<P> {
    async fn authenticate_http(
        &self,
        headers: &HashMap<String, String>,
    ) -> Result<(), ProtocolError> {
        let header = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| ProtocolError::unauthorized("missing Authorization header"))?;

        match parse_authorization_header(header)? {
            Credentials::Basic { username, password } => {
                if self.provider.verify_password(&username, &password) {
                    Ok(())
                } else {
                    Err(ProtocolError::unauthorized("invalid username or password"))
                }
            }
            Credentials::Bearer { token } => {
                if self.provider.verify_token(&token) {
                    Ok(())
                } else {
                    Err(ProtocolError::unauthorized("invalid bearer token"))
                }
            }
        }
    }

    async fn authenticate_ssh(
        &self,
        username: &str,
        public_key: &[u8],
    ) -> Result<(), ProtocolError> {
        if self.provider.verify_public_key(username, public_key) {
            Ok(())
        } else {
            Err(ProtocolError::unauthorized("unrecognized SSH public key"))
        }
    }
}

/// A simple in-memory `AuthProvider`, suitable for tests and single-node deployments: a
/// username/password table, a set of bearer tokens, and a username-to-authorized-keys table.
#[derive(Default)]
pub struct StaticCredentialStore {
    passwords: HashMap<String, String>,
    tokens: std::collections::HashSet<String>,
    public_keys: HashMap<String, Vec<Vec<u8>>>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.passwords.insert(username.into(), password.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.tokens.insert(token.into());
        self
    }

    pub fn with_public_key(mut self, username: impl Into<String>, public_key: Vec<u8>) -> Self {
        self.public_keys
            .entry(username.into())
            .or_default()
            .push(public_key);
        self
    }
}

impl AuthProvider for StaticCredentialStore {
    fn verify_password(&self, username: &str, password: &str) -> bool {
        self.passwords
            .get(username)
            .is_some_and(|expected| constant_time_eq(expected, password))
    }

    fn verify_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|expected| constant_time_eq(expected, token))
    }

    fn verify_public_key(&self, username: &str, public_key: &[u8]) -> bool {
        self.public_keys
            .get(username)
            .is_some_and(|keys| keys.iter().any(|k| k.as_slice() == public_key))
    }
}
