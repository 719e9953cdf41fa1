//! Events published on the [`EventBus`](crate::EventBus).
//!
//! One category per publishing domain; subscribers select a domain through
//! [`MfEvent::topic`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope of every published event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfEvent {
    /// Fresh per event.
    pub id: Uuid,
    /// Session id, see [`correlation_id`](crate::correlation_id).
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Publishing component.
    pub source: EventSource,
    pub category: EventCategory,
}

impl MfEvent {
    /// Stamp `category` with a new id and the current time.
    #[must_use]
    pub fn new(correlation_id: Uuid, source: EventSource, category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id,
            timestamp: Utc::now(),
            source,
            category,
        }
    }

    #[must_use]
    pub const fn topic(&self) -> &'static str {
        self.category.topic()
    }
}

/// Publisher of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    /// Tracing-style target, `formainframe::sandbox` for instance.
    pub target: String,
}

impl EventSource {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// Payload of an event, one variant per topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum EventCategory {
    /// Persisted configuration changes.
    Config(ConfigEvent),
    /// Credential side-channel changes.
    Credentials(CredentialsEvent),
    /// Staged configuration sandbox changes.
    Sandbox(SandboxEvent),
    /// Remote content synchronization.
    Sync(SyncEvent),
}

impl EventCategory {
    /// Topic name passed to [`EventReceiver::recv_topic`](crate::EventReceiver::recv_topic).
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Credentials(_) => "credentials",
            Self::Sandbox(_) => "sandbox",
            Self::Sync(_) => "sync",
        }
    }
}

/// Persisted configuration events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ConfigEvent {
    /// A setting or entity collection changed.
    Changed {
        /// Name of the setting or entity collection.
        key: String,
    },
    /// A connection was removed together with its credentials.
    ConnectionDeleted {
        /// UUID of the removed connection.
        connection_uuid: String,
    },
}

/// Credential side-channel events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum CredentialsEvent {
    /// Username or password for a connection was set or cleared.
    Changed {
        /// UUID of the connection whose credentials changed.
        connection_uuid: String,
    },
}

/// Configuration sandbox events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum SandboxEvent {
    /// A row of the given entity collection was staged.
    Updated {
        /// Entity collection name.
        entity: String,
    },
    /// The given entity collection was reloaded from the persisted store.
    Reloaded {
        /// Entity collection name.
        entity: String,
    },
}

/// Remote content synchronization events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum SyncEvent {
    /// A saved file was queued for automatic synchronization.
    AutoSyncFile {
        /// Path of the file handle.
        file: String,
    },
    /// A file was synchronized with the remote system.
    Synced {
        /// Path of the file handle.
        file: String,
        /// Whether new content was uploaded.
        uploaded: bool,
        /// Whether new content was downloaded.
        downloaded: bool,
    },
    /// Synchronization of a file failed.
    Failed {
        /// Path of the file handle.
        file: String,
        /// Redacted, human readable failure message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_new_assigns_unique_ids() {
        let correlation = Uuid::new_v4();
        let category = EventCategory::Credentials(CredentialsEvent::Changed {
            connection_uuid: "c1".into(),
        });
        let first = MfEvent::new(correlation, EventSource::new("test"), category.clone());
        let second = MfEvent::new(correlation, EventSource::new("test"), category);

        assert_ne!(first.id, second.id);
        assert_eq!(first.correlation_id, second.correlation_id);
    }

    #[test]
    fn test_topics() {
        let config = EventCategory::Config(ConfigEvent::Changed { key: "k".into() });
        let sandbox = EventCategory::Sandbox(SandboxEvent::Reloaded {
            entity: "connections".into(),
        });
        let sync = EventCategory::Sync(SyncEvent::AutoSyncFile { file: "/a".into() });

        assert_eq!(config.topic(), "config");
        assert_eq!(sandbox.topic(), "sandbox");
        assert_eq!(sync.topic(), "sync");
    }

    #[test]
    fn test_category_serialization() {
        let category = EventCategory::Sync(SyncEvent::Synced {
            file: "/u/user/a.txt".into(),
            uploaded: true,
            downloaded: false,
        });
        let json = serde_json::to_string(&category).unwrap();
        assert!(json.contains("\"type\":\"Sync\""));
        assert!(json.contains("\"event\":\"Synced\""));

        let parsed: EventCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, category);
    }
}
