//! Core services for formainframe.
//!
//! This crate holds everything the data-operations layer needs that is not
//! tied to a remote resource kind:
//!
//! - [`Error`] and [`Result`], shared by every formainframe crate
//! - [`ProgressIndicator`] for cancellable remote calls
//! - configuration entities, [`Settings`] and [`ConfigService`]
//! - the [`Crudable`] store and [`ConfigSandbox`] staging layer
//! - [`CredentialService`] over a secret store
//! - [`ChannelExecutor`], the throttled queue behind automatic synchronization

pub mod config;
pub mod credentials;
pub mod crudable;
mod error;
pub mod executor;
pub mod progress;
pub mod sandbox;

pub use config::{
    ConfigEntry, ConfigService, ConfigState, ConnectionConfig, Credentials, DsMask, EntityClass,
    FilesWorkingSetConfig, HttpSettings, JobsFilter, JobsWorkingSetConfig, Settings, UssPath,
    ZVersion,
};
pub use credentials::{BasicCredentials, CredentialService};
pub use crudable::{Crudable, InMemoryCrudable, MergedCollections, merge_collections};
pub use error::{Error, ResponseSummary, Result};
pub use executor::{ChannelExecutor, ExecutorState};
pub use progress::ProgressIndicator;
pub use sandbox::ConfigSandbox;
