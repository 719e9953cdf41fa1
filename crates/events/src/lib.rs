//! Events and diagnostics shared by the formainframe crates.
//!
//! Components never call their observers directly. They publish typed
//! [`MfEvent`]s (configuration or credentials changed, sandbox reloaded, file
//! auto-synced) on an [`EventBus`] and every subscriber picks the topics it
//! cares about. The crate also installs the tracing subscriber for hosts
//! ([`init_tracing`]) and masks stored passwords in messages ([`redact`]).
//!
//! ```rust,ignore
//! use formainframe_events::{ConfigEvent, EventBus, EventCategory};
//!
//! let bus = EventBus::new();
//! let mut config_changes = bus.subscribe();
//! bus.sender().expect("bus is open").publish(
//!     "formainframe::config",
//!     EventCategory::Config(ConfigEvent::Changed { key: "autoSync".into() }),
//! )?;
//! let changed = config_changes.recv_topic("config").await;
//! ```

pub mod bus;
pub mod event;
pub mod metadata;
pub mod redaction;
pub mod logging;

pub use bus::{EventBus, EventReceiver, EventSender, SendError};
pub use event::{
    ConfigEvent, CredentialsEvent, EventCategory, EventSource, MfEvent, SandboxEvent, SyncEvent,
};
pub use metadata::{correlation_id, set_correlation_id};
pub use redaction::{REDACTED_PLACEHOLDER, redact, register_secret, register_secrets, unregister_secret};
pub use logging::{LogLevel, TracingConfig, TracingFormat, init_tracing};

/// Log the start of a content synchronization.
///
/// ```rust,ignore
/// emit_sync_started!("/u/ibmuser/test.txt");
/// ```
#[macro_export]
macro_rules! emit_sync_started {
    ($file:expr) => {
        ::tracing::info!(
            target: "formainframe::sync",
            event_type = "sync.started",
            file = %$file,
        )
    };
}

/// Log a finished content synchronization and its transfer direction.
///
/// ```rust,ignore
/// emit_sync_completed!("/u/ibmuser/test.txt", true, false);
/// ```
#[macro_export]
macro_rules! emit_sync_completed {
    ($file:expr, $uploaded:expr, $downloaded:expr) => {
        ::tracing::info!(
            target: "formainframe::sync",
            event_type = "sync.completed",
            file = %$file,
            uploaded = $uploaded,
            downloaded = $downloaded,
        )
    };
}

/// Log a successful operation with the runner that performed it.
///
/// ```rust,ignore
/// emit_operation_performed!("purge-job", "purge-job-basic", 120);
/// ```
#[macro_export]
macro_rules! emit_operation_performed {
    ($operation:expr, $runner:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "formainframe::dataops",
            event_type = "operation.performed",
            operation = %$operation,
            runner = %$runner,
            duration_ms = $duration_ms,
        )
    };
}

/// Log the removal of a cached listing.
#[macro_export]
macro_rules! emit_cache_cleaned {
    ($query:expr, $notified:expr) => {
        ::tracing::debug!(
            target: "formainframe::fetch",
            event_type = "cache.cleaned",
            query = %$query,
            notified = $notified,
        )
    };
}
