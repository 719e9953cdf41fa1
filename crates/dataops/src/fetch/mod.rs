//! Cached listings of remote resources.
//!
//! A [`FileFetchProvider`] answers one kind of [`RemoteQuery`] (datasets by
//! mask, members of a library, a USS directory, jobs by filter, spool files
//! of a job) and keeps the resulting handles until the query is reloaded or
//! cleaned. Every provider shares the cache bookkeeping in
//! [`RemoteFileFetchProvider`]; the per-kind part is a [`RemoteFetcher`].

mod datasets;
mod jobs;
mod members;
mod provider;
mod spool;
mod uss;

pub use datasets::DatasetFetcher;
pub use jobs::JobFetcher;
pub use members::MemberFetcher;
pub use provider::{RemoteFetcher, RemoteFileFetchProvider};
pub use spool::SpoolFileFetcher;
pub use uss::UssFetcher;

use crate::attributes::AttributesKind;
use crate::file::MfVirtualFile;
use crate::query::RemoteQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use formainframe_core::{Error, ProgressIndicator, Result};
use std::any::{Any, type_name};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Bounds shared by every request descriptor used as a cache key.
pub trait FetchRequest: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static {}

impl<T> FetchRequest for T where
    T: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static
{
}

/// Lifecycle of one cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// A reload is running.
    Fetching,
    /// The last reload succeeded.
    Fetched,
    /// The last reload failed.
    Error,
}

/// Observer of cache changes.
pub trait CacheListener<R>: Send + Sync {
    /// New handles are available for `query`.
    fn on_cache_updated(&self, _query: &RemoteQuery<R>, _files: &[MfVirtualFile]) {}

    /// The cache of `query` was dropped on request.
    fn on_cache_cleaned(&self, _query: &RemoteQuery<R>) {}

    /// A reload of `query` was cancelled; its cache was dropped.
    fn on_fetch_cancelled(&self, _query: &RemoteQuery<R>) {}

    /// A reload of `query` failed; its cache is empty and in error state.
    fn on_fetch_failure(&self, _query: &RemoteQuery<R>, _error: &Error) {}
}

/// Cache of remote listings for requests of type `R`.
#[async_trait]
pub trait FileFetchProvider<R: FetchRequest>: Send + Sync {
    /// Kind of the handles produced.
    fn kind(&self) -> AttributesKind;

    /// Handles of the last successful reload.
    fn get_cached(&self, query: &RemoteQuery<R>) -> Option<Vec<MfVirtualFile>>;

    /// False only when the last reload of `query` failed.
    fn is_cache_valid(&self, query: &RemoteQuery<R>) -> bool;

    /// Whether a reload of `query` is running.
    fn is_cache_fetching(&self, query: &RemoteQuery<R>) -> bool;

    /// Failure message of the last reload, if it failed.
    fn get_fetched_error_message(&self, query: &RemoteQuery<R>) -> Option<String>;

    /// Drop the cache of `query`, telling listeners only when `notify` is set.
    fn clean_cache(&self, query: &RemoteQuery<R>, notify: bool);

    /// Record when `query` was refreshed. The first recorded time is kept.
    fn apply_refresh_cache_date(&self, query: &RemoteQuery<R>, time: DateTime<Utc>);

    /// When `query` was last refreshed, if ever.
    fn find_cache_refresh_date_if_present(&self, query: &RemoteQuery<R>) -> Option<DateTime<Utc>>;

    /// Fetch `query` again, replacing its cache.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; the cache is then empty and in error
    /// state. Cancellation drops the cache instead.
    async fn reload(
        &self,
        query: &RemoteQuery<R>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<MfVirtualFile>>;

    /// Fetch the next batch after the cached handles and append it.
    ///
    /// # Errors
    ///
    /// Same as [`FileFetchProvider::reload`].
    async fn load_more(
        &self,
        query: &RemoteQuery<R>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<MfVirtualFile>>;

    /// Register an observer.
    fn add_listener(&self, listener: Arc<dyn CacheListener<R>>);
}

/// A fetch provider with its request type erased, for heterogeneous lists.
pub struct FetchProviderEntry {
    request_type: &'static str,
    provider: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for FetchProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchProviderEntry")
            .field("request_type", &self.request_type)
            .finish_non_exhaustive()
    }
}

impl FetchProviderEntry {
    /// Wrap `provider`.
    #[must_use]
    pub fn new<R: FetchRequest>(provider: Arc<dyn FileFetchProvider<R>>) -> Self {
        Self {
            request_type: type_name::<R>(),
            provider: Arc::new(provider),
        }
    }

    /// Name of the request type served.
    #[must_use]
    pub const fn request_type(&self) -> &'static str {
        self.request_type
    }

    /// The provider, if it serves requests of type `R`.
    #[must_use]
    pub fn downcast<R: FetchRequest>(&self) -> Option<Arc<dyn FileFetchProvider<R>>> {
        self.provider
            .downcast_ref::<Arc<dyn FileFetchProvider<R>>>()
            .cloned()
    }
}
