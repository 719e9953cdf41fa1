//! Credential side channel for formainframe.
//!
//! Usernames and passwords are never stored in the plain configuration
//! collections. They live behind a [`SecretStore`] keyed by connection UUID,
//! and are handed out as [`SecureSecret`] values that zero their memory on
//! drop and print as `[REDACTED]`.
//!
//! ```ignore
//! use formainframe_secrets::{InMemorySecretStore, SecretStore};
//!
//! let store = InMemorySecretStore::new();
//! store.set_credentials("conn-uuid", "IBMUSER", "s3cr3t".into()).await?;
//! let password = store.get_password("conn-uuid").await?;
//! ```

mod memory;
mod types;

pub use memory::InMemorySecretStore;
pub use types::{SecureSecret, StoredCredentials};

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

/// Error types for the credential side channel
#[derive(Debug, Error, Diagnostic)]
pub enum SecretError {
    /// No credentials are stored for the connection
    #[error("No credentials stored for connection '{connection_uuid}'")]
    #[diagnostic(
        code(formainframe::secrets::not_found),
        help("Set a username and password for the connection first")
    )]
    NotFound {
        /// UUID of the connection that was looked up
        connection_uuid: String,
    },

    /// The backing store could not be reached
    #[error("Secret store unavailable: {message}")]
    #[diagnostic(code(formainframe::secrets::unavailable))]
    StoreUnavailable {
        /// Error message from the store
        message: String,
    },
}

impl SecretError {
    /// Create a not-found error for a connection
    #[must_use]
    pub fn not_found(connection_uuid: impl Into<String>) -> Self {
        Self::NotFound {
            connection_uuid: connection_uuid.into(),
        }
    }

    /// Create a store-unavailable error
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }
}

/// Storage for connection credentials, independent from the configuration store.
///
/// Implementations must be safe to share between tasks; every method takes
/// `&self`.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Username stored for the connection, if any.
    async fn get_username(&self, connection_uuid: &str) -> Result<Option<String>, SecretError>;

    /// Password stored for the connection, if any.
    async fn get_password(
        &self,
        connection_uuid: &str,
    ) -> Result<Option<SecureSecret>, SecretError>;

    /// Store username and password for the connection, replacing any previous pair.
    async fn set_credentials(
        &self,
        connection_uuid: &str,
        username: &str,
        password: SecureSecret,
    ) -> Result<(), SecretError>;

    /// Remove the credentials of the connection. Clearing missing credentials is not an error.
    async fn clear_credentials(&self, connection_uuid: &str) -> Result<(), SecretError>;

    /// Both halves of the stored pair, failing with [`SecretError::NotFound`]
    /// when either is missing.
    async fn get_credentials(&self, connection_uuid: &str) -> Result<StoredCredentials, SecretError> {
        let username = self.get_username(connection_uuid).await?;
        let password = self.get_password(connection_uuid).await?;
        match (username, password) {
            (Some(username), Some(password)) => Ok(StoredCredentials { username, password }),
            _ => Err(SecretError::not_found(connection_uuid)),
        }
    }

    /// Name of the backing store, for logging.
    fn store_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SecretError::not_found("c1").to_string(),
            "No credentials stored for connection 'c1'"
        );
        assert_eq!(
            SecretError::unavailable("locked").to_string(),
            "Secret store unavailable: locked"
        );
    }

    #[tokio::test]
    async fn test_get_credentials_requires_both_halves() {
        let store = InMemorySecretStore::new();
        assert!(matches!(
            store.get_credentials("c1").await,
            Err(SecretError::NotFound { .. })
        ));

        store
            .set_credentials("c1", "IBMUSER", SecureSecret::from("pw12"))
            .await
            .unwrap();
        let creds = store.get_credentials("c1").await.unwrap();
        assert_eq!(creds.username, "IBMUSER");
        assert_eq!(creds.password.expose(), "pw12");
    }
}
