//! Staged edits over the persisted configuration.
//!
//! A settings dialog works on a [`ConfigSandbox`]: rows are added, edited and
//! removed in `state`, compared against the `initial_state` snapshot taken at
//! the last commit point, and written back per collection with
//! [`ConfigSandbox::apply`]. Credential rows go through the secret store,
//! every other collection through [`Crudable::replace_gracefully`].
//!
//! All reads and writes happen under one lock. Apply is last-writer-wins:
//! changes made to the persisted store after [`ConfigSandbox::fetch`] are
//! overwritten.

use crate::config::{ConfigEntry, ConfigState, Credentials, EntityClass};
use crate::credentials::CredentialService;
use crate::crudable::{Crudable, merge_collections};
use crate::{Error, Result};
use formainframe_events::{EventCategory, EventSender, SandboxEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct SandboxState {
    state: ConfigState,
    initial_state: ConfigState,
}

impl SandboxState {
    fn is_modified(&self, class: EntityClass) -> bool {
        let current = self.state.rows(class);
        let initial = self.initial_state.rows(class);
        if current.len() != initial.len() {
            return true;
        }
        let initial: HashSet<&ConfigEntry> = initial.iter().collect();
        !current.iter().all(|row| initial.contains(row))
    }
}

/// Optimistic staging layer over the configuration store and secret store.
pub struct ConfigSandbox {
    inner: Mutex<SandboxState>,
    crudable: Arc<dyn Crudable>,
    credentials: Arc<CredentialService>,
    events: Option<EventSender>,
}

impl std::fmt::Debug for ConfigSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSandbox").finish_non_exhaustive()
    }
}

impl ConfigSandbox {
    /// Create an empty sandbox. Call [`ConfigSandbox::fetch`] to load it.
    #[must_use]
    pub fn new(
        crudable: Arc<dyn Crudable>,
        credentials: Arc<CredentialService>,
        events: Option<EventSender>,
    ) -> Self {
        Self {
            inner: Mutex::new(SandboxState::default()),
            crudable,
            credentials,
            events,
        }
    }

    /// Reload every collection from the stores, discarding staged edits.
    ///
    /// # Errors
    ///
    /// Fails when the secret store cannot be read.
    pub async fn fetch(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for class in EntityClass::ALL {
            self.rollback_locked(&mut inner, class).await?;
        }
        tracing::debug!("Sandbox fetched");
        Ok(())
    }

    /// Whether the staged `class` collection differs from the snapshot, ignoring order.
    pub async fn is_modified(&self, class: EntityClass) -> bool {
        self.inner.lock().await.is_modified(class)
    }

    /// Reload one collection from its store into both the state and the snapshot.
    ///
    /// # Errors
    ///
    /// Fails when the secret store cannot be read.
    pub async fn rollback(&self, class: EntityClass) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.rollback_locked(&mut inner, class).await
    }

    async fn rollback_locked(&self, inner: &mut SandboxState, class: EntityClass) -> Result<()> {
        let rows = if class == EntityClass::Credentials {
            self.load_credentials().await?
        } else {
            self.crudable.get_all(class)
        };
        inner.state.set_rows(class, rows.iter().cloned());
        inner.initial_state.set_rows(class, rows);
        self.publish(SandboxEvent::Reloaded {
            entity: class.name().into(),
        });
        Ok(())
    }

    async fn load_credentials(&self) -> Result<Vec<ConfigEntry>> {
        let mut rows = Vec::new();
        for row in self.crudable.get_all(EntityClass::Connections) {
            let ConfigEntry::Connection(conn) = row else {
                continue;
            };
            let username = self.credentials.username_by_key(&conn.uuid).await?;
            let password = self.credentials.password_by_key(&conn.uuid).await?;
            if let (Some(username), Some(password)) = (username, password) {
                rows.push(Credentials::new(conn.uuid, username, password).into());
            }
        }
        Ok(rows)
    }

    /// Write the staged `class` collection to its store. No-op when unmodified.
    ///
    /// # Errors
    ///
    /// Fails when the store rejects the rows.
    pub async fn apply(&self, class: EntityClass) -> Result<()> {
        let inner = self.inner.lock().await;
        if !inner.is_modified(class) {
            return Ok(());
        }

        if class == EntityClass::Credentials {
            let merged = merge_collections(
                &inner.initial_state.rows(class),
                &inner.state.rows(class),
            );
            for row in merged.to_add.into_iter().chain(merged.to_update) {
                if let ConfigEntry::Credentials(creds) = row {
                    self.credentials
                        .set_credentials(
                            &creds.connection_config_uuid,
                            &creds.username,
                            creds.password,
                        )
                        .await?;
                }
            }
            for row in merged.to_delete {
                self.credentials
                    .clear_credentials(row.unique_key())
                    .await?;
            }
        } else {
            self.crudable
                .replace_gracefully(class, inner.state.rows(class))?;
        }
        tracing::info!(class = %class, "Sandbox changes applied");
        Ok(())
    }

    /// Apply every collection, then commit the state as the new snapshot.
    ///
    /// # Errors
    ///
    /// Stops at the first collection that fails to apply; the snapshot is
    /// left untouched in that case.
    pub async fn apply_all(&self) -> Result<()> {
        for class in EntityClass::ALL {
            self.apply(class).await?;
        }
        self.update_state().await;
        Ok(())
    }

    /// Take the current state as the new snapshot.
    pub async fn update_state(&self) {
        let mut inner = self.inner.lock().await;
        inner.initial_state = inner.state.clone();
    }

    /// Staged rows of one collection.
    pub async fn get_all(&self, class: EntityClass) -> Vec<ConfigEntry> {
        self.inner.lock().await.state.rows(class)
    }

    /// Copy of the whole staged state.
    pub async fn state(&self) -> ConfigState {
        self.inner.lock().await.state.clone()
    }

    /// Stage a new row.
    ///
    /// # Errors
    ///
    /// Fails if a row with the same key is already staged.
    pub async fn add(&self, row: ConfigEntry) -> Result<()> {
        let class = row.class();
        {
            let mut inner = self.inner.lock().await;
            if inner.state.find(class, row.unique_key()).is_some() {
                return Err(Error::validation(format!(
                    "{class} already contains '{}'",
                    row.unique_key()
                )));
            }
            inner.state.upsert(row);
        }
        self.publish_updated(class);
        Ok(())
    }

    /// Stage a change to an existing row.
    ///
    /// # Errors
    ///
    /// Fails with not-found if no row has the same key.
    pub async fn update(&self, row: ConfigEntry) -> Result<()> {
        let class = row.class();
        {
            let mut inner = self.inner.lock().await;
            if inner.state.find(class, row.unique_key()).is_none() {
                return Err(Error::not_found(format!(
                    "{class} row '{}'",
                    row.unique_key()
                )));
            }
            inner.state.upsert(row);
        }
        self.publish_updated(class);
        Ok(())
    }

    /// Stage removal of a row.
    ///
    /// # Errors
    ///
    /// Fails with not-found if no row has the key.
    pub async fn delete(&self, class: EntityClass, key: &str) -> Result<ConfigEntry> {
        let removed = self
            .inner
            .lock()
            .await
            .state
            .remove(class, key)
            .ok_or_else(|| Error::not_found(format!("{class} row '{key}'")))?;
        self.publish_updated(class);
        Ok(removed)
    }

    /// Edit the staged state of `class` in place under the sandbox lock.
    pub async fn with_state<R>(
        &self,
        class: EntityClass,
        edit: impl FnOnce(&mut ConfigState) -> R + Send,
    ) -> R {
        let result = edit(&mut self.inner.lock().await.state);
        self.publish_updated(class);
        result
    }

    fn publish_updated(&self, class: EntityClass) {
        self.publish(SandboxEvent::Updated {
            entity: class.name().into(),
        });
    }

    fn publish(&self, event: SandboxEvent) {
        if let Some(events) = &self.events
            && events
                .publish("formainframe::sandbox", EventCategory::Sandbox(event))
                .is_err()
        {
            tracing::debug!("Event bus closed, sandbox event not published");
        }
    }
}
