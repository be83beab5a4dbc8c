//! Service tokens wrapped in `secrecy`
//!
//! Access tokens for the source and destination services are zeroed on drop
//! and redacted from `Debug` output, so they can travel through configs,
//! jobs and adapters without leaking into logs. Tokens are trimmed when
//! read, and a blank token counts as no token.
//!
//! ```rust
//! use porter::config::{secret_string, SecretString};
//! use secrecy::ExposeSecret;
//!
//! let token: SecretString = secret_string("ya29.token\n".to_string());
//! assert_eq!(token.expose_secret().as_str(), "ya29.token");
//! assert!(!format!("{token:?}").contains("ya29"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Token text; only reachable through `ExposeSecret`
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl SecretValue {
    fn trimmed(mut raw: String) -> Self {
        let trimmed = raw.trim().to_string();
        raw.zeroize();
        Self(trimmed)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecretValue {
    fn from(raw: String) -> Self {
        Self::trimmed(raw)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::trimmed)
    }
}

/// A service access token
pub type SecretString = Secret<SecretValue>;

/// Wraps a token read from the environment or a CLI flag
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Wraps an optional token; blank tokens become `None`
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value
        .map(SecretValue::from)
        .filter(|v| !v.is_empty())
        .map(Secret::new)
}

/// Serde helper for optional token fields that treats `""` as unset
///
/// # Errors
///
/// Returns the deserializer's error for non-string values.
pub fn deserialize_token<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(secret_string_opt)
}
