//! Typed CRUD over the persisted entity collections.

use crate::config::{
    ConfigEntry, ConfigState, ConnectionConfig, EntityClass, FilesWorkingSetConfig,
    JobsWorkingSetConfig,
};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Persisted configuration store.
///
/// Rows are identified by [`ConfigEntry::unique_key`] and linked to
/// connections by [`ConfigEntry::connection_uuid`].
pub trait Crudable: Send + Sync {
    /// Every row of `class`, in stored order.
    fn get_all(&self, class: EntityClass) -> Vec<ConfigEntry>;

    /// Row of `class` with the unique key `key`.
    fn get_by_unique_key(&self, class: EntityClass, key: &str) -> Option<ConfigEntry> {
        self.get_all(class)
            .into_iter()
            .find(|row| row.unique_key() == key)
    }

    /// Rows of `class` referring to the connection.
    fn get_by_foreign_key(&self, class: EntityClass, connection_uuid: &str) -> Vec<ConfigEntry> {
        self.get_all(class)
            .into_iter()
            .filter(|row| row.connection_uuid() == Some(connection_uuid))
            .collect()
    }

    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Fails if a row with the same unique key exists.
    fn add(&self, row: ConfigEntry) -> Result<()>;

    /// Replace an existing row.
    ///
    /// # Errors
    ///
    /// Fails with not-found if no row has the same unique key.
    fn update(&self, row: ConfigEntry) -> Result<()>;

    /// Remove a row and return it.
    ///
    /// # Errors
    ///
    /// Fails with not-found if no row has the key.
    fn delete(&self, class: EntityClass, key: &str) -> Result<ConfigEntry>;

    /// Replace the whole collection in one step.
    ///
    /// Rows equal to stored ones are left untouched, so replacing a
    /// collection with itself is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if `rows` holds rows of another class or duplicate keys.
    fn replace_gracefully(&self, class: EntityClass, rows: Vec<ConfigEntry>) -> Result<()>;

    /// Connection with the given UUID.
    fn get_connection_by_uuid(&self, uuid: &str) -> Option<ConnectionConfig> {
        match self.get_by_unique_key(EntityClass::Connections, uuid) {
            Some(ConfigEntry::Connection(conn)) => Some(conn),
            _ => None,
        }
    }

    /// Files and jobs working sets defined on the connection.
    fn get_working_sets_by_connection(
        &self,
        connection_uuid: &str,
    ) -> (Vec<FilesWorkingSetConfig>, Vec<JobsWorkingSetConfig>) {
        let files = self
            .get_by_foreign_key(EntityClass::FilesWorkingSets, connection_uuid)
            .into_iter()
            .filter_map(|row| match row {
                ConfigEntry::FilesWorkingSet(ws) => Some(ws),
                _ => None,
            })
            .collect();
        let jobs = self
            .get_by_foreign_key(EntityClass::JobsWorkingSets, connection_uuid)
            .into_iter()
            .filter_map(|row| match row {
                ConfigEntry::JobsWorkingSet(ws) => Some(ws),
                _ => None,
            })
            .collect();
        (files, jobs)
    }
}

/// Three-way diff between two versions of one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedCollections {
    /// Rows present only in the new version.
    pub to_add: Vec<ConfigEntry>,
    /// Rows present in both versions with different values (new value).
    pub to_update: Vec<ConfigEntry>,
    /// Rows present only in the old version.
    pub to_delete: Vec<ConfigEntry>,
}

impl MergedCollections {
    /// Whether the two versions are identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Diff `old` against `new` by unique key.
#[must_use]
pub fn merge_collections(old: &[ConfigEntry], new: &[ConfigEntry]) -> MergedCollections {
    let old_by_key: HashMap<&str, &ConfigEntry> =
        old.iter().map(|row| (row.unique_key(), row)).collect();
    let new_by_key: HashMap<&str, &ConfigEntry> =
        new.iter().map(|row| (row.unique_key(), row)).collect();

    let mut merged = MergedCollections::default();
    for row in new {
        match old_by_key.get(row.unique_key()) {
            None => merged.to_add.push(row.clone()),
            Some(previous) if *previous != row => merged.to_update.push(row.clone()),
            Some(_) => {}
        }
    }
    merged.to_delete = old
        .iter()
        .filter(|row| !new_by_key.contains_key(row.unique_key()))
        .cloned()
        .collect();
    merged
}

/// Process-local [`Crudable`] guarded by a single lock.
///
/// Credential rows are rejected: credentials belong to the secret store.
#[derive(Debug, Default)]
pub struct InMemoryCrudable {
    state: RwLock<ConfigState>,
}

impl InMemoryCrudable {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `state`. Credential rows are dropped.
    #[must_use]
    pub fn with_state(mut state: ConfigState) -> Self {
        state.credentials.clear();
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of everything stored.
    #[must_use]
    pub fn snapshot(&self) -> ConfigState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn ensure_persisted(class: EntityClass) -> Result<()> {
        if class == EntityClass::Credentials {
            Err(Error::validation(
                "credentials are kept in the secret store, not the configuration",
            ))
        } else {
            Ok(())
        }
    }
}

impl Crudable for InMemoryCrudable {
    fn get_all(&self, class: EntityClass) -> Vec<ConfigEntry> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows(class)
    }

    fn add(&self, row: ConfigEntry) -> Result<()> {
        Self::ensure_persisted(row.class())?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.find(row.class(), row.unique_key()).is_some() {
            return Err(Error::validation(format!(
                "{} already contains '{}'",
                row.class(),
                row.unique_key()
            )));
        }
        tracing::debug!(class = %row.class(), key = %row.unique_key(), "Adding config row");
        state.upsert(row);
        Ok(())
    }

    fn update(&self, row: ConfigEntry) -> Result<()> {
        Self::ensure_persisted(row.class())?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.find(row.class(), row.unique_key()).is_none() {
            return Err(Error::not_found(format!(
                "{} row '{}'",
                row.class(),
                row.unique_key()
            )));
        }
        state.upsert(row);
        Ok(())
    }

    fn delete(&self, class: EntityClass, key: &str) -> Result<ConfigEntry> {
        Self::ensure_persisted(class)?;
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(class, key)
            .ok_or_else(|| Error::not_found(format!("{class} row '{key}'")))
    }

    fn replace_gracefully(&self, class: EntityClass, rows: Vec<ConfigEntry>) -> Result<()> {
        Self::ensure_persisted(class)?;
        if let Some(foreign) = rows.iter().find(|row| row.class() != class) {
            return Err(Error::validation(format!(
                "cannot store a {} row in {class}",
                foreign.class()
            )));
        }
        let mut keys = std::collections::HashSet::new();
        if let Some(duplicate) = rows.iter().find(|row| !keys.insert(row.unique_key())) {
            return Err(Error::validation(format!(
                "duplicate key '{}' in {class}",
                duplicate.unique_key()
            )));
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let merged = merge_collections(&state.rows(class), &rows);
        if merged.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            class = %class,
            added = merged.to_add.len(),
            updated = merged.to_update.len(),
            deleted = merged.to_delete.len(),
            "Replacing config collection"
        );
        state.set_rows(class, rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    fn conn(name: &str) -> ConnectionConfig {
        ConnectionConfig::new(name, format!("https://{name}.example"))
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let store = InMemoryCrudable::new();
        let c = conn("a");
        store.add(c.clone().into()).unwrap();
        assert!(store.add(c.into()).is_err());
    }

    #[test]
    fn test_update_requires_existing() {
        let store = InMemoryCrudable::new();
        assert!(matches!(
            store.update(conn("a").into()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_credentials_rejected() {
        let store = InMemoryCrudable::new();
        let result = store.add(Credentials::new("c", "u", "pw12").into());
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(store.get_all(EntityClass::Credentials).is_empty());
    }

    #[test]
    fn test_foreign_key_lookup() {
        let store = InMemoryCrudable::new();
        let a = conn("a");
        let b = conn("b");
        store.add(a.clone().into()).unwrap();
        store.add(b.clone().into()).unwrap();
        store
            .add(FilesWorkingSetConfig::new("ws-a", &a.uuid).into())
            .unwrap();
        store
            .add(JobsWorkingSetConfig::new("jobs-b", &b.uuid).into())
            .unwrap();

        let (files, jobs) = store.get_working_sets_by_connection(&a.uuid);
        assert_eq!(files.len(), 1);
        assert!(jobs.is_empty());
        assert_eq!(store.get_connection_by_uuid(&b.uuid), Some(b));
    }

    #[test]
    fn test_replace_gracefully_validates_rows() {
        let store = InMemoryCrudable::new();
        let a = conn("a");
        let result = store.replace_gracefully(
            EntityClass::Connections,
            vec![a.clone().into(), a.clone().into()],
        );
        assert!(result.is_err());

        let result = store.replace_gracefully(
            EntityClass::Connections,
            vec![FilesWorkingSetConfig::new("ws", &a.uuid).into()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_collections() {
        let a = conn("a");
        let b = conn("b");
        let mut a2 = a.clone();
        a2.name = "a2".into();
        let c = conn("c");

        let old: Vec<ConfigEntry> = vec![a.into(), b.clone().into()];
        let new: Vec<ConfigEntry> = vec![a2.clone().into(), c.clone().into()];
        let merged = merge_collections(&old, &new);

        assert_eq!(merged.to_add, vec![ConfigEntry::from(c)]);
        assert_eq!(merged.to_update, vec![ConfigEntry::from(a2)]);
        assert_eq!(merged.to_delete, vec![ConfigEntry::from(b)]);
        assert!(merge_collections(&new, &new).is_empty());
    }
}
