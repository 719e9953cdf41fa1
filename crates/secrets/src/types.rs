//! Secure secret types with automatic memory zeroing

use secrecy::{ExposeSecret, SecretString};

/// A password with automatic memory zeroing on drop.
///
/// Wraps `secrecy::SecretString`: Debug and Display print `[REDACTED]`,
/// and the value is only reachable through [`SecureSecret::expose`].
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Move a string into secure storage.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// Expose the secret value for the immediate call (basic auth header).
    ///
    /// The caller must not log or persist the returned value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Check if the secret value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl From<&str> for SecureSecret {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for SecureSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// Compares exposed values; used by the sandbox to diff credential rows.
impl PartialEq for SecureSecret {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for SecureSecret {}

impl std::hash::Hash for SecureSecret {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.expose().hash(state);
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl serde::Serialize for SecureSecret {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for SecureSecret {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// A username/password pair read from a [`crate::SecretStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    /// Login name on the mainframe.
    pub username: String,
    /// Password, zeroed on drop.
    pub password: SecureSecret,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let secret = SecureSecret::from("hunter22");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
        assert_eq!(secret.expose(), "hunter22");
    }

    #[test]
    fn test_serialize_never_leaks() {
        let creds = SecureSecret::from("hunter22");
        let json = serde_json::to_string(&creds).unwrap();
        assert_eq!(json, "\"[REDACTED]\"");
    }

    #[test]
    fn test_equality_by_value() {
        assert_eq!(SecureSecret::from("a-pw"), SecureSecret::from("a-pw"));
        assert_ne!(SecureSecret::from("a-pw"), SecureSecret::from("b-pw"));
        assert!(SecureSecret::from("").is_empty());
    }

    #[test]
    fn test_stored_credentials_debug_hides_password() {
        let creds = StoredCredentials {
            username: "IBMUSER".into(),
            password: SecureSecret::from("hunter22"),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("IBMUSER"));
        assert!(!debug.contains("hunter22"));
    }
}
