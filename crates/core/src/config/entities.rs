//! Configuration entities stored in the persisted configuration.
//!
//! Every entity is a plain value: `Clone` is a deep copy, so a sandbox
//! snapshot never shares mutable state with the working copy.

use formainframe_secrets::SecureSecret;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::EntityClass;

/// z/OS release a connection talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ZVersion {
    /// z/OS 2.1
    #[serde(rename = "ZOS_2_1")]
    Zos2_1,
    /// z/OS 2.2
    #[serde(rename = "ZOS_2_2")]
    Zos2_2,
    /// z/OS 2.3
    #[default]
    #[serde(rename = "ZOS_2_3")]
    Zos2_3,
    /// z/OS 2.4
    #[serde(rename = "ZOS_2_4")]
    Zos2_4,
    /// z/OS 2.5
    #[serde(rename = "ZOS_2_5")]
    Zos2_5,
    /// z/OS 3.1
    #[serde(rename = "ZOS_3_1")]
    Zos3_1,
}

const fn default_allow_self_signed() -> bool {
    true
}

/// A z/OSMF connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Unique key.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Base URL of the z/OSMF server.
    pub url: String,
    /// Accept self-signed certificates.
    #[serde(default = "default_allow_self_signed")]
    pub is_allow_self_signed: bool,
    /// Target z/OS release.
    #[serde(default)]
    pub z_version: ZVersion,
    /// TSO user id discovered at connection time, may be empty.
    #[serde(default)]
    pub owner: String,
}

impl ConnectionConfig {
    /// New connection with a random UUID and default trust settings.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            is_allow_self_signed: default_allow_self_signed(),
            z_version: ZVersion::default(),
            owner: String::new(),
        }
    }

    /// Set the self-signed certificate toggle.
    #[must_use]
    pub const fn with_allow_self_signed(mut self, allow: bool) -> Self {
        self.is_allow_self_signed = allow;
        self
    }

    /// Set the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

/// Username and password of a connection, one-to-one by connection UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Foreign key to [`ConnectionConfig::uuid`], also the unique key.
    pub connection_config_uuid: String,
    /// Mainframe user id.
    pub username: String,
    /// Password, never printed.
    pub password: SecureSecret,
}

impl Credentials {
    /// Create a credentials row.
    #[must_use]
    pub fn new(
        connection_config_uuid: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecureSecret>,
    ) -> Self {
        Self {
            connection_config_uuid: connection_config_uuid.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Dataset name mask in a files working set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsMask {
    /// Mask such as `IBMUSER.**`.
    pub mask: String,
    /// Mask names exactly one dataset.
    #[serde(default)]
    pub is_single: bool,
}

impl DsMask {
    /// Create a mask, upper-casing it as z/OS dataset names are.
    #[must_use]
    pub fn new(mask: impl Into<String>) -> Self {
        Self {
            mask: mask.into().to_uppercase(),
            is_single: false,
        }
    }
}

impl fmt::Display for DsMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mask)
    }
}

/// USS directory in a files working set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UssPath {
    /// Absolute path.
    pub path: String,
}

impl UssPath {
    /// Create a USS path entry.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// JES job filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobsFilter {
    /// Job owner, `*` for any.
    pub owner: String,
    /// Job name prefix.
    pub prefix: String,
    /// Exact job id, overrides owner and prefix when set.
    pub job_id: String,
    /// User correlator filter.
    pub user_correlator_filter: String,
}

impl JobsFilter {
    /// Filter by owner and prefix.
    #[must_use]
    pub fn new(owner: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Filter by job id.
    #[must_use]
    pub fn by_job_id(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for JobsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.job_id.is_empty() {
            write!(f, "PREFIX={} OWNER={}", self.prefix, self.owner)
        } else {
            write!(f, "JobID={}", self.job_id)
        }
    }
}

/// Named group of dataset masks and USS paths on one connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesWorkingSetConfig {
    /// Unique key.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Foreign key to the connection.
    pub connection_config_uuid: String,
    /// Dataset masks.
    #[serde(default)]
    pub ds_masks: Vec<DsMask>,
    /// USS directories.
    #[serde(default)]
    pub uss_paths: Vec<UssPath>,
}

impl FilesWorkingSetConfig {
    /// Empty working set on a connection.
    #[must_use]
    pub fn new(name: impl Into<String>, connection_config_uuid: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            name: name.into(),
            connection_config_uuid: connection_config_uuid.into(),
            ds_masks: Vec::new(),
            uss_paths: Vec::new(),
        }
    }
}

/// Named group of job filters on one connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsWorkingSetConfig {
    /// Unique key.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Foreign key to the connection.
    pub connection_config_uuid: String,
    /// Job filters.
    #[serde(default)]
    pub job_filters: Vec<JobsFilter>,
}

impl JobsWorkingSetConfig {
    /// Empty jobs working set on a connection.
    #[must_use]
    pub fn new(name: impl Into<String>, connection_config_uuid: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            name: name.into(),
            connection_config_uuid: connection_config_uuid.into(),
            job_filters: Vec::new(),
        }
    }
}

/// One row of any entity collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigEntry {
    /// Row of [`EntityClass::Connections`].
    Connection(ConnectionConfig),
    /// Row of [`EntityClass::FilesWorkingSets`].
    FilesWorkingSet(FilesWorkingSetConfig),
    /// Row of [`EntityClass::JobsWorkingSets`].
    JobsWorkingSet(JobsWorkingSetConfig),
    /// Row of [`EntityClass::Credentials`].
    Credentials(Credentials),
}

impl ConfigEntry {
    /// Collection this row belongs to.
    #[must_use]
    pub const fn class(&self) -> EntityClass {
        match self {
            Self::Connection(_) => EntityClass::Connections,
            Self::FilesWorkingSet(_) => EntityClass::FilesWorkingSets,
            Self::JobsWorkingSet(_) => EntityClass::JobsWorkingSets,
            Self::Credentials(_) => EntityClass::Credentials,
        }
    }

    /// Unique key within the collection.
    #[must_use]
    pub fn unique_key(&self) -> &str {
        match self {
            Self::Connection(c) => &c.uuid,
            Self::FilesWorkingSet(ws) => &ws.uuid,
            Self::JobsWorkingSet(ws) => &ws.uuid,
            Self::Credentials(c) => &c.connection_config_uuid,
        }
    }

    /// Connection UUID this row refers to, if it has a foreign key.
    #[must_use]
    pub fn connection_uuid(&self) -> Option<&str> {
        match self {
            Self::Connection(_) => None,
            Self::FilesWorkingSet(ws) => Some(&ws.connection_config_uuid),
            Self::JobsWorkingSet(ws) => Some(&ws.connection_config_uuid),
            Self::Credentials(c) => Some(&c.connection_config_uuid),
        }
    }
}

impl From<ConnectionConfig> for ConfigEntry {
    fn from(value: ConnectionConfig) -> Self {
        Self::Connection(value)
    }
}

impl From<FilesWorkingSetConfig> for ConfigEntry {
    fn from(value: FilesWorkingSetConfig) -> Self {
        Self::FilesWorkingSet(value)
    }
}

impl From<JobsWorkingSetConfig> for ConfigEntry {
    fn from(value: JobsWorkingSetConfig) -> Self {
        Self::JobsWorkingSet(value)
    }
}

impl From<Credentials> for ConfigEntry {
    fn from(value: Credentials) -> Self {
        Self::Credentials(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_defaults() {
        let conn = ConnectionConfig::new("dev", "https://zosmf.example:443");
        assert!(conn.is_allow_self_signed);
        assert_eq!(conn.z_version, ZVersion::Zos2_3);
        assert!(conn.owner.is_empty());
        assert_ne!(conn.uuid, ConnectionConfig::new("dev", "x").uuid);
    }

    #[test]
    fn test_connection_deserialize_defaults() {
        let conn: ConnectionConfig =
            serde_json::from_str(r#"{"uuid":"u1","name":"n","url":"https://h"}"#).unwrap();
        assert!(conn.is_allow_self_signed);
        assert_eq!(conn.z_version, ZVersion::Zos2_3);
    }

    #[test]
    fn test_zversion_wire_names() {
        assert_eq!(
            serde_json::to_string(&ZVersion::Zos3_1).unwrap(),
            "\"ZOS_3_1\""
        );
    }

    #[test]
    fn test_jobs_filter_display() {
        assert_eq!(
            JobsFilter::new("IBMUSER", "*").to_string(),
            "PREFIX=* OWNER=IBMUSER"
        );
        assert_eq!(JobsFilter::by_job_id("JOB01234").to_string(), "JobID=JOB01234");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut ws = FilesWorkingSetConfig::new("ws", "c1");
        ws.ds_masks.push(DsMask::new("ibmuser.*"));
        let mut copy = ws.clone();
        copy.ds_masks[0].mask = "OTHER.*".into();
        assert_eq!(ws.ds_masks[0].mask, "IBMUSER.*");
    }

    #[test]
    fn test_entry_keys() {
        let creds = ConfigEntry::from(Credentials::new("c1", "IBMUSER", "pw12"));
        assert_eq!(creds.class(), EntityClass::Credentials);
        assert_eq!(creds.unique_key(), "c1");
        assert_eq!(creds.connection_uuid(), Some("c1"));

        let ws = FilesWorkingSetConfig::new("ws", "c2");
        let uuid = ws.uuid.clone();
        let entry = ConfigEntry::from(ws);
        assert_eq!(entry.unique_key(), uuid);
        assert_eq!(entry.connection_uuid(), Some("c2"));
    }
}
