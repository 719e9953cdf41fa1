//! Process-local secret store.

use crate::{SecretError, SecretStore, SecureSecret};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Clone)]
struct Entry {
    username: String,
    password: SecureSecret,
}

/// Secret store holding credentials in memory for the lifetime of the process.
///
/// Used by hosts without an OS keychain and by tests.
#[derive(Default)]
pub struct InMemorySecretStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemorySecretStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections with stored credentials.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no credentials are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for InMemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySecretStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_username(&self, connection_uuid: &str) -> Result<Option<String>, SecretError> {
        Ok(self
            .entries
            .read()
            .await
            .get(connection_uuid)
            .map(|e| e.username.clone()))
    }

    async fn get_password(
        &self,
        connection_uuid: &str,
    ) -> Result<Option<SecureSecret>, SecretError> {
        Ok(self
            .entries
            .read()
            .await
            .get(connection_uuid)
            .map(|e| e.password.clone()))
    }

    async fn set_credentials(
        &self,
        connection_uuid: &str,
        username: &str,
        password: SecureSecret,
    ) -> Result<(), SecretError> {
        tracing::debug!(connection = %connection_uuid, "Storing credentials");
        self.entries.write().await.insert(
            connection_uuid.to_string(),
            Entry {
                username: username.to_string(),
                password,
            },
        );
        Ok(())
    }

    async fn clear_credentials(&self, connection_uuid: &str) -> Result<(), SecretError> {
        if self.entries.write().await.remove(connection_uuid).is_some() {
            tracing::debug!(connection = %connection_uuid, "Cleared credentials");
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_clear() {
        let store = InMemorySecretStore::new();
        assert!(store.is_empty().await);

        store
            .set_credentials("c1", "IBMUSER", SecureSecret::from("first"))
            .await
            .unwrap();
        store
            .set_credentials("c1", "IBMUSER", SecureSecret::from("second"))
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get_password("c1").await.unwrap().unwrap().expose(),
            "second"
        );

        store.clear_credentials("c1").await.unwrap();
        assert!(store.get_username("c1").await.unwrap().is_none());
        // clearing twice is fine
        store.clear_credentials("c1").await.unwrap();
    }

    #[test]
    fn test_blocking_usage() {
        let store = InMemorySecretStore::new();
        tokio_test::block_on(async {
            store
                .set_credentials("c2", "USER2", SecureSecret::from("pw22"))
                .await
                .unwrap();
            assert_eq!(
                store.get_username("c2").await.unwrap().as_deref(),
                Some("USER2")
            );
        });
    }
}
