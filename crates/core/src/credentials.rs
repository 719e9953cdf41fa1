//! Connection credentials on top of a [`SecretStore`].

use crate::config::ConnectionConfig;
use crate::{Error, Result};
use formainframe_events::{CredentialsEvent, EventCategory, EventSender};
use formainframe_secrets::{SecretStore, SecureSecret};
use std::sync::Arc;

/// Longest z/OS user or owner id.
pub const USER_OR_OWNER_SYMBOLS_MAX_SIZE: usize = 8;

/// Username and password used for HTTP basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Mainframe user id.
    pub username: String,
    /// Password, never printed.
    pub password: SecureSecret,
}

/// Reads and writes connection credentials, keeping the redaction registry
/// and event subscribers informed.
pub struct CredentialService {
    store: Arc<dyn SecretStore>,
    events: Option<EventSender>,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("store", &self.store.store_name())
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    /// Create a service over `store`, publishing changes to `events` when given.
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>, events: Option<EventSender>) -> Self {
        Self { store, events }
    }

    /// Username stored for a connection UUID, if any.
    ///
    /// # Errors
    ///
    /// Fails when the secret store is unavailable.
    pub async fn username_by_key(&self, connection_uuid: &str) -> Result<Option<String>> {
        Ok(self.store.get_username(connection_uuid).await?)
    }

    /// Password stored for a connection UUID, if any.
    ///
    /// # Errors
    ///
    /// Fails when the secret store is unavailable.
    pub async fn password_by_key(&self, connection_uuid: &str) -> Result<Option<SecureSecret>> {
        Ok(self.store.get_password(connection_uuid).await?)
    }

    /// Username of the connection.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::CredentialsNotFound`] when none is stored.
    pub async fn username(&self, connection: &ConnectionConfig) -> Result<String> {
        self.username_by_key(&connection.uuid)
            .await?
            .ok_or_else(|| Error::credentials_not_found(&connection.name))
    }

    /// Password of the connection.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::CredentialsNotFound`] when none is stored.
    pub async fn password(&self, connection: &ConnectionConfig) -> Result<SecureSecret> {
        self.password_by_key(&connection.uuid)
            .await?
            .ok_or_else(|| Error::credentials_not_found(&connection.name))
    }

    /// Username and password pair for HTTP calls.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::CredentialsNotFound`] when either half is missing.
    pub async fn basic_credentials(&self, connection: &ConnectionConfig) -> Result<BasicCredentials> {
        Ok(BasicCredentials {
            username: self.username(connection).await?,
            password: self.password(connection).await?,
        })
    }

    /// Store credentials for a connection UUID.
    ///
    /// # Errors
    ///
    /// Fails when the secret store rejects the write.
    pub async fn set_credentials(
        &self,
        connection_uuid: &str,
        username: &str,
        password: SecureSecret,
    ) -> Result<()> {
        if let Some(previous) = self.store.get_password(connection_uuid).await? {
            formainframe_events::unregister_secret(previous.expose());
        }
        formainframe_events::register_secret(password.expose());
        self.store
            .set_credentials(connection_uuid, username, password)
            .await?;
        tracing::debug!(connection = %connection_uuid, "Credentials set");
        self.notify(connection_uuid);
        Ok(())
    }

    /// Remove credentials for a connection UUID.
    ///
    /// # Errors
    ///
    /// Fails when the secret store rejects the removal.
    pub async fn clear_credentials(&self, connection_uuid: &str) -> Result<()> {
        if let Some(password) = self.store.get_password(connection_uuid).await? {
            formainframe_events::unregister_secret(password.expose());
        }
        self.store.clear_credentials(connection_uuid).await?;
        tracing::debug!(connection = %connection_uuid, "Credentials cleared");
        self.notify(connection_uuid);
        Ok(())
    }

    /// Owner of the connection when it looks like a valid user id, else empty.
    ///
    /// A failed owner lookup may leave an empty or error string in the owner
    /// field; those are filtered out here.
    #[must_use]
    pub fn owner(connection: &ConnectionConfig) -> String {
        let owner = &connection.owner;
        if !owner.is_empty() && owner.len() <= USER_OR_OWNER_SYMBOLS_MAX_SIZE {
            owner.clone()
        } else {
            String::new()
        }
    }

    fn notify(&self, connection_uuid: &str) {
        if let Some(events) = &self.events {
            let published = events.publish(
                "formainframe::credentials",
                EventCategory::Credentials(CredentialsEvent::Changed {
                    connection_uuid: connection_uuid.to_string(),
                }),
            );
            if published.is_err() {
                tracing::debug!("Event bus closed, credentials change not published");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formainframe_events::EventBus;
    use formainframe_secrets::InMemorySecretStore;

    fn service(events: Option<EventSender>) -> CredentialService {
        CredentialService::new(Arc::new(InMemorySecretStore::new()), events)
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let service = service(None);
        let conn = ConnectionConfig::new("dev", "https://h");
        let err = service.username(&conn).await.unwrap_err();
        assert!(matches!(err, Error::CredentialsNotFound { .. }));
        assert!(service.basic_credentials(&conn).await.is_err());
    }

    #[tokio::test]
    async fn test_set_and_clear_publish_events() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        let service = service(bus.sender());
        let conn = ConnectionConfig::new("dev", "https://h");

        service
            .set_credentials(&conn.uuid, "IBMUSER", SecureSecret::from("pw-for-dev"))
            .await
            .unwrap();
        let creds = service.basic_credentials(&conn).await.unwrap();
        assert_eq!(creds.username, "IBMUSER");
        assert_eq!(creds.password.expose(), "pw-for-dev");

        service.clear_credentials(&conn.uuid).await.unwrap();
        assert!(service.password(&conn).await.is_err());

        for _ in 0..2 {
            let event = receiver.recv_topic("credentials").await.unwrap();
            assert_eq!(
                event.category,
                EventCategory::Credentials(CredentialsEvent::Changed {
                    connection_uuid: conn.uuid.clone()
                })
            );
        }
    }

    #[tokio::test]
    async fn test_password_is_redacted_in_messages() {
        let service = service(None);
        service
            .set_credentials("c-redact", "IBMUSER", SecureSecret::from("Zx9-unique-pw"))
            .await
            .unwrap();
        let err = Error::call_failed("login rejected for Zx9-unique-pw", None);
        assert!(!err.user_message().contains("Zx9-unique-pw"));
    }

    #[test]
    fn test_owner_filter() {
        let conn = ConnectionConfig::new("dev", "https://h");
        assert_eq!(CredentialService::owner(&conn), "");
        assert_eq!(
            CredentialService::owner(&conn.clone().with_owner("IBMUSER")),
            "IBMUSER"
        );
        assert_eq!(
            CredentialService::owner(&conn.with_owner("Error: not authorized")),
            ""
        );
    }
}
