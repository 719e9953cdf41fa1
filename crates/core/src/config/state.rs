//! Entity collections and their container.

use super::entities::{
    ConfigEntry, ConnectionConfig, Credentials, FilesWorkingSetConfig, JobsWorkingSetConfig,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed entity collections tracked by the configuration store and sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityClass {
    /// z/OSMF connections.
    Connections,
    /// Dataset and USS working sets.
    FilesWorkingSets,
    /// JES working sets.
    JobsWorkingSets,
    /// Credentials, backed by the secret store.
    Credentials,
}

impl EntityClass {
    /// Every class, in fetch order.
    pub const ALL: [Self; 4] = [
        Self::Connections,
        Self::FilesWorkingSets,
        Self::JobsWorkingSets,
        Self::Credentials,
    ];

    /// Collection name used in events and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connections => "connections",
            Self::FilesWorkingSets => "filesWorkingSets",
            Self::JobsWorkingSets => "jobsWorkingSets",
            Self::Credentials => "credentials",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All entity collections. Credentials are never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigState {
    /// Connections.
    pub connections: Vec<ConnectionConfig>,
    /// Files working sets.
    pub files_working_sets: Vec<FilesWorkingSetConfig>,
    /// Jobs working sets.
    pub jobs_working_sets: Vec<JobsWorkingSetConfig>,
    /// Credential rows, only populated inside a sandbox.
    #[serde(skip)]
    pub credentials: Vec<Credentials>,
}

impl ConfigState {
    /// Rows of one collection, in stored order.
    #[must_use]
    pub fn rows(&self, class: EntityClass) -> Vec<ConfigEntry> {
        match class {
            EntityClass::Connections => self.connections.iter().cloned().map(Into::into).collect(),
            EntityClass::FilesWorkingSets => self
                .files_working_sets
                .iter()
                .cloned()
                .map(Into::into)
                .collect(),
            EntityClass::JobsWorkingSets => self
                .jobs_working_sets
                .iter()
                .cloned()
                .map(Into::into)
                .collect(),
            EntityClass::Credentials => self.credentials.iter().cloned().map(Into::into).collect(),
        }
    }

    /// Replace one collection. Rows of other classes are ignored.
    pub fn set_rows(&mut self, class: EntityClass, rows: impl IntoIterator<Item = ConfigEntry>) {
        self.clear(class);
        for row in rows {
            if row.class() == class {
                self.push(row);
            }
        }
    }

    /// Remove every row of one collection.
    pub fn clear(&mut self, class: EntityClass) {
        match class {
            EntityClass::Connections => self.connections.clear(),
            EntityClass::FilesWorkingSets => self.files_working_sets.clear(),
            EntityClass::JobsWorkingSets => self.jobs_working_sets.clear(),
            EntityClass::Credentials => self.credentials.clear(),
        }
    }

    fn push(&mut self, row: ConfigEntry) {
        match row {
            ConfigEntry::Connection(c) => self.connections.push(c),
            ConfigEntry::FilesWorkingSet(ws) => self.files_working_sets.push(ws),
            ConfigEntry::JobsWorkingSet(ws) => self.jobs_working_sets.push(ws),
            ConfigEntry::Credentials(c) => self.credentials.push(c),
        }
    }

    /// Row with the given unique key.
    #[must_use]
    pub fn find(&self, class: EntityClass, key: &str) -> Option<ConfigEntry> {
        self.rows(class).into_iter().find(|r| r.unique_key() == key)
    }

    /// Insert `row`, or replace the row with the same unique key in place.
    ///
    /// Returns `true` when the row was new.
    pub fn upsert(&mut self, row: ConfigEntry) -> bool {
        let class = row.class();
        let mut rows = self.rows(class);
        let added = match rows.iter_mut().find(|r| r.unique_key() == row.unique_key()) {
            Some(existing) => {
                *existing = row;
                false
            }
            None => {
                rows.push(row);
                true
            }
        };
        self.set_rows(class, rows);
        added
    }

    /// Remove the row with the given unique key.
    pub fn remove(&mut self, class: EntityClass, key: &str) -> Option<ConfigEntry> {
        let mut rows = self.rows(class);
        let index = rows.iter().position(|r| r.unique_key() == key)?;
        let removed = rows.remove(index);
        self.set_rows(class, rows);
        Some(removed)
    }

    /// Dump the persisted collections as TOML.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Load persisted collections from TOML.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed input.
    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::serialization(e.to_string()))
    }
}
