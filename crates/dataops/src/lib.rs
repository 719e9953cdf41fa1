//! Remote data operations for formainframe.
//!
//! Everything that talks to z/OSMF goes through this crate:
//!
//! - [`api`]: typed facades over the z/OSMF REST services and the factory
//!   caching their clients per connection
//! - [`attributes`]: metadata of remote resources mapped to local
//!   [`MfVirtualFile`] handles
//! - [`fetch`]: cached listings (datasets, members, USS directories, jobs,
//!   spool files)
//! - [`operations`]: one-shot remote actions dispatched to runners
//! - [`content`]: content adaptation and synchronization
//! - [`autosync`]: synchronization of files as they are saved
//!
//! [`DataOpsManager`] owns the component registries and is the entry point
//! for callers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use formainframe_dataops::{DataOpsExtensions, DataOpsManager};
//! use formainframe_dataops::api::ZosmfApiFactory;
//!
//! let manager = DataOpsManager::new(
//!     Arc::new(ZosmfApiFactory::new(settings.http.clone())),
//!     credentials,
//!     settings,
//!     DataOpsExtensions::builtin(),
//! );
//! let systems = manager
//!     .perform_operation(InfoOperation::new(connection), &ProgressIndicator::new())
//!     .await?;
//! ```

pub mod api;
pub mod attributes;
pub mod autosync;
pub mod content;
mod context;
pub mod fetch;
mod file;
mod manager;
pub mod operations;
mod query;
mod registry;
mod requesters;

pub use autosync::{AutoSyncFileListener, SyncRequest};
pub use context::{AttributesServiceFactory, ContentAdapterFactory, DataOpsContext};
pub use file::{FileId, MfVirtualFile};
pub use manager::{
    ContentSynchronizerFactory, DataOpsExtensions, DataOpsManager, FetchProviderFactory,
    OperationRunnerFactory,
};
pub use query::{JobQuery, LibraryQuery, RemoteQuery, UssQuery};
pub use requesters::first_successful;
