//! Entry point to persisted configuration and settings.

use super::{ConfigEntry, EntityClass, Settings};
use crate::credentials::CredentialService;
use crate::crudable::Crudable;
use crate::{Error, Result};
use formainframe_events::{ConfigEvent, EventCategory, EventSender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Owns the configuration store, the credential service and the settings.
///
/// The auto-sync flag is shared by reference with every
/// [`crate::ChannelExecutor`] so toggling it takes effect immediately.
pub struct ConfigService {
    crudable: Arc<dyn Crudable>,
    credentials: Arc<CredentialService>,
    settings: RwLock<Settings>,
    auto_sync: Arc<AtomicBool>,
    events: Option<EventSender>,
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("auto_sync", &self.is_auto_sync_enabled())
            .finish_non_exhaustive()
    }
}

impl ConfigService {
    /// Create the service.
    #[must_use]
    pub fn new(
        crudable: Arc<dyn Crudable>,
        credentials: Arc<CredentialService>,
        settings: Settings,
        events: Option<EventSender>,
    ) -> Self {
        let auto_sync = Arc::new(AtomicBool::new(settings.is_auto_sync_enabled));
        Self {
            crudable,
            credentials,
            settings: RwLock::new(settings),
            auto_sync,
            events,
        }
    }

    /// Persisted configuration store.
    #[must_use]
    pub fn crudable(&self) -> &Arc<dyn Crudable> {
        &self.crudable
    }

    /// Credential service.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialService> {
        &self.credentials
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the settings.
    ///
    /// # Errors
    ///
    /// Fails when the new settings do not validate.
    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.auto_sync
            .store(settings.is_auto_sync_enabled, Ordering::SeqCst);
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
        self.publish(ConfigEvent::Changed {
            key: "settings".into(),
        });
        Ok(())
    }

    /// Whether saved files are synchronized automatically.
    #[must_use]
    pub fn is_auto_sync_enabled(&self) -> bool {
        self.auto_sync.load(Ordering::SeqCst)
    }

    /// Toggle automatic synchronization.
    pub fn set_auto_sync_enabled(&self, enabled: bool) {
        self.auto_sync.store(enabled, Ordering::SeqCst);
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .is_auto_sync_enabled = enabled;
        tracing::info!(enabled, "Auto-sync toggled");
        self.publish(ConfigEvent::Changed {
            key: "isAutoSyncEnabled".into(),
        });
    }

    /// Flag shared with channel executors.
    #[must_use]
    pub fn auto_sync_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.auto_sync)
    }

    /// Replace a whole collection and notify subscribers.
    ///
    /// # Errors
    ///
    /// Fails when the store rejects the rows.
    pub fn replace_collection(&self, class: EntityClass, rows: Vec<ConfigEntry>) -> Result<()> {
        self.crudable.replace_gracefully(class, rows)?;
        self.publish(ConfigEvent::Changed {
            key: class.name().into(),
        });
        Ok(())
    }

    /// Delete a connection together with its stored credentials.
    ///
    /// # Errors
    ///
    /// Fails if the connection does not exist or the secret store fails.
    pub async fn delete_connection(&self, connection_uuid: &str) -> Result<()> {
        let removed = self
            .crudable
            .delete(EntityClass::Connections, connection_uuid)?;
        if !matches!(removed, ConfigEntry::Connection(_)) {
            return Err(Error::configuration("store returned a non-connection row"));
        }
        self.credentials.clear_credentials(connection_uuid).await?;
        tracing::info!(connection = %connection_uuid, "Connection deleted");
        self.publish(ConfigEvent::ConnectionDeleted {
            connection_uuid: connection_uuid.to_string(),
        });
        Ok(())
    }

    fn publish(&self, event: ConfigEvent) {
        if let Some(events) = &self.events
            && events
                .publish("formainframe::config", EventCategory::Config(event))
                .is_err()
        {
            tracing::debug!("Event bus closed, config change not published");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::crudable::InMemoryCrudable;
    use formainframe_events::EventBus;
    use formainframe_secrets::{InMemorySecretStore, SecureSecret};

    fn service(events: Option<EventSender>) -> ConfigService {
        let credentials = Arc::new(CredentialService::new(
            Arc::new(InMemorySecretStore::new()),
            None,
        ));
        ConfigService::new(
            Arc::new(InMemoryCrudable::new()),
            credentials,
            Settings::default(),
            events,
        )
    }

    #[tokio::test]
    async fn test_delete_connection_cascades_credentials() {
        let service = service(None);
        let conn = ConnectionConfig::new("dev", "https://h");
        service.crudable().add(conn.clone().into()).unwrap();
        service
            .credentials()
            .set_credentials(&conn.uuid, "IBMUSER", SecureSecret::from("pw12"))
            .await
            .unwrap();

        service.delete_connection(&conn.uuid).await.unwrap();

        assert!(service.crudable().get_connection_by_uuid(&conn.uuid).is_none());
        assert!(
            service
                .credentials()
                .username_by_key(&conn.uuid)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_auto_sync_flag_is_shared() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        let service = service(bus.sender());
        let flag = service.auto_sync_flag();

        service.set_auto_sync_enabled(true);
        assert!(flag.load(Ordering::SeqCst));
        assert!(service.settings().is_auto_sync_enabled);

        let event = receiver.recv_topic("config").await.unwrap();
        assert_eq!(
            event.category,
            EventCategory::Config(ConfigEvent::Changed {
                key: "isAutoSyncEnabled".into()
            })
        );
    }

    #[test]
    fn test_update_settings_validates() {
        let service = service(None);
        let invalid = Settings {
            batch_size: 0,
            ..Settings::default()
        };
        assert!(service.update_settings(invalid).is_err());
    }
}
