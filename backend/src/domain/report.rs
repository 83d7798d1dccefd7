//! Value types exchanged with the BI service.
//!
//! Session tokens and credentials redact themselves in `Debug` output so they
//! can sit inside tracing fields and error chains without leaking.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::artifact::sha256_hex;

/// Session token issued by a successful login.
///
/// ## Invariants
/// - The token is never blank once trimmed of whitespace.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token, returning `None` when it is blank.
    ///
    /// # Examples
    /// ```
    /// use report_pipeline::domain::SessionToken;
    ///
    /// assert!(SessionToken::new("  ").is_none());
    /// assert_eq!(SessionToken::new("abc").map(|t| t.as_str().to_owned()), Some("abc".to_owned()));
    /// ```
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw header value.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Identifier of a saved card on the BI service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardId(String);

impl CardId {
    /// Wrap a card identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Identifier as used in request paths.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Login credentials for the BI service. Zeroised on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Build credentials from an email address and a plaintext password.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Login email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Plaintext password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Subset of the BI service's public session properties.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerProperties {
    /// Present only while first-run setup has not been completed.
    pub setup_token: Option<String>,
}

impl ServerProperties {
    /// Setup token when first-run setup is still pending.
    ///
    /// Blank tokens are treated as absent.
    pub fn pending_setup_token(&self) -> Option<&str> {
        self.setup_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Binary spreadsheet payload returned by a card query. Opaque to the pipeline.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct QueryResult(Vec<u8>);

impl QueryResult {
    /// Wrap raw response bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hex SHA-256 digest of the payload.
    pub fn digest(&self) -> String {
        sha256_hex(&self.0)
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("len", &self.0.len())
            .finish()
    }
}
