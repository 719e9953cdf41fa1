use super::{CacheListener, CacheState, FetchRequest, FileFetchProvider};
use crate::attributes::{AttributesKind, AttributesService, FileAttributes};
use crate::context::DataOpsContext;
use crate::file::MfVirtualFile;
use crate::query::RemoteQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use formainframe_core::{Error, ProgressIndicator, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// The per-kind half of a fetch provider: one remote listing call.
#[async_trait]
pub trait RemoteFetcher: Send + Sync + 'static {
    /// Request descriptor answered.
    type Request: FetchRequest;

    /// Kind of attributes produced.
    const KIND: AttributesKind;

    /// List the resources matching `query`, starting after `start` when
    /// loading a further batch.
    async fn fetch_responses(
        &self,
        context: &DataOpsContext,
        query: &RemoteQuery<Self::Request>,
        start: Option<&str>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<FileAttributes>>;
}

struct Ledger<R> {
    files: HashMap<RemoteQuery<R>, Vec<MfVirtualFile>>,
    states: HashMap<RemoteQuery<R>, CacheState>,
    errors: HashMap<RemoteQuery<R>, String>,
    refreshed: HashMap<RemoteQuery<R>, DateTime<Utc>>,
}

impl<R> Default for Ledger<R> {
    fn default() -> Self {
        Self {
            files: HashMap::new(),
            states: HashMap::new(),
            errors: HashMap::new(),
            refreshed: HashMap::new(),
        }
    }
}

type Updates<R> = Vec<(RemoteQuery<R>, Vec<MfVirtualFile>)>;

/// Cache bookkeeping shared by every remote fetch provider.
///
/// All reads and writes of the per-query state go through one mutex;
/// listeners are called after it is released.
pub struct RemoteFileFetchProvider<F: RemoteFetcher> {
    context: Arc<DataOpsContext>,
    fetcher: F,
    ledger: Mutex<Ledger<F::Request>>,
    listeners: RwLock<Vec<Arc<dyn CacheListener<F::Request>>>>,
}

impl<F: RemoteFetcher> std::fmt::Debug for RemoteFileFetchProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFileFetchProvider")
            .field("kind", &F::KIND)
            .field("queries", &self.ledger().states.len())
            .finish_non_exhaustive()
    }
}

impl<F: RemoteFetcher> RemoteFileFetchProvider<F> {
    /// Provider running `fetcher` over `context`.
    #[must_use]
    pub fn new(context: Arc<DataOpsContext>, fetcher: F) -> Self {
        Self {
            context,
            fetcher,
            ledger: Mutex::new(Ledger::default()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger<F::Request>> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> Vec<Arc<dyn CacheListener<F::Request>>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish_updates(&self, updates: &Updates<F::Request>) {
        let listeners = self.listeners();
        for (query, files) in updates {
            for listener in &listeners {
                listener.on_cache_updated(query, files);
            }
        }
    }

    async fn fetch_files(
        &self,
        query: &RemoteQuery<F::Request>,
        start: Option<&str>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<MfVirtualFile>> {
        progress.check_canceled()?;
        let responses = self
            .fetcher
            .fetch_responses(&self.context, query, start, progress)
            .await?;
        let service = self.context.attributes_service(F::KIND)?;
        let files = responses
            .into_iter()
            .map(|attributes| service.get_or_create_virtual_file(attributes))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(query = %query, count = files.len(), "Fetched");
        Ok(files)
    }

    /// Forget a handle that vanished from the listing of `query`.
    ///
    /// A resource still reachable through other connections only loses the
    /// requesters of the query's connection.
    fn cleanup_unused_file(
        service: &dyn AttributesService,
        file: &MfVirtualFile,
        query: &RemoteQuery<F::Request>,
    ) {
        let Some(mut attributes) = service.get_attributes(file) else {
            return;
        };
        let only_this_connection = attributes
            .requesters()
            .iter()
            .all(|r| r.connection() == &query.connection);
        tracing::debug!(file = %file, only_this_connection, "Cleaning up unused file");
        if only_this_connection {
            service.clear_attributes(file);
        } else {
            attributes.forget_connection(&query.connection);
            if let Err(e) = service.update_attributes(file, attributes) {
                tracing::warn!(file = %file, error = %e, "Cannot update attributes");
            }
        }
    }

    async fn try_reload(
        &self,
        query: &RemoteQuery<F::Request>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<MfVirtualFile>> {
        let files = self.fetch_files(query, None, progress).await?;
        let previous = self.ledger().files.get(query).cloned().unwrap_or_default();
        let stale: Vec<_> = previous
            .iter()
            .filter(|old| !files.iter().any(|new| new.path() == old.path()))
            .collect();
        if !stale.is_empty() {
            let service = self.context.attributes_service(F::KIND)?;
            for file in stale {
                Self::cleanup_unused_file(service.as_ref(), file, query);
            }
        }
        Ok(files)
    }

    /// Store `files` for `query` and mark every other idle query listing
    /// one of them as fetched. Returns the queries to announce.
    fn store(
        &self,
        query: &RemoteQuery<F::Request>,
        files: &[MfVirtualFile],
        append: bool,
    ) -> Updates<F::Request> {
        let mut ledger = self.ledger();
        let colliding: Vec<_> = ledger
            .files
            .iter()
            .filter(|(q, cached)| {
                *q != query
                    && ledger.states.get(*q) != Some(&CacheState::Fetching)
                    && files.iter().any(|f| cached.contains(f))
            })
            .map(|(q, cached)| (q.clone(), cached.clone()))
            .collect();
        for (q, _) in &colliding {
            ledger.states.insert(q.clone(), CacheState::Fetched);
        }

        let entry = ledger.files.entry(query.clone()).or_default();
        if append {
            entry.extend(files.iter().cloned());
        } else {
            *entry = files.to_vec();
        }
        ledger.states.insert(query.clone(), CacheState::Fetched);
        ledger.errors.remove(query);
        colliding
    }

    fn fetch_failed(&self, query: &RemoteQuery<F::Request>, error: Error) -> Error {
        if error.is_cancelled() {
            tracing::debug!(query = %query, "Fetch cancelled");
            self.forget(query);
            for listener in self.listeners() {
                listener.on_fetch_cancelled(query);
            }
            return error;
        }

        tracing::warn!(query = %query, error = %error, "Fetch failed");
        {
            let mut ledger = self.ledger();
            ledger.files.insert(query.clone(), Vec::new());
            ledger.states.insert(query.clone(), CacheState::Error);
            ledger
                .errors
                .insert(query.clone(), error.user_message().replace('\n', " "));
        }
        for listener in self.listeners() {
            listener.on_fetch_failure(query, &error);
        }
        error
    }

    fn forget(&self, query: &RemoteQuery<F::Request>) {
        let mut ledger = self.ledger();
        ledger.states.remove(query);
        ledger.refreshed.remove(query);
    }
}

#[async_trait]
impl<F: RemoteFetcher> FileFetchProvider<F::Request> for RemoteFileFetchProvider<F> {
    fn kind(&self) -> AttributesKind {
        F::KIND
    }

    fn get_cached(&self, query: &RemoteQuery<F::Request>) -> Option<Vec<MfVirtualFile>> {
        let ledger = self.ledger();
        if ledger.states.get(query) == Some(&CacheState::Fetched) {
            ledger.files.get(query).cloned()
        } else {
            None
        }
    }

    fn is_cache_valid(&self, query: &RemoteQuery<F::Request>) -> bool {
        self.ledger().states.get(query) != Some(&CacheState::Error)
    }

    fn is_cache_fetching(&self, query: &RemoteQuery<F::Request>) -> bool {
        self.ledger().states.get(query) == Some(&CacheState::Fetching)
    }

    fn get_fetched_error_message(&self, query: &RemoteQuery<F::Request>) -> Option<String> {
        let ledger = self.ledger();
        if ledger.states.get(query) == Some(&CacheState::Error) {
            ledger.errors.get(query).cloned()
        } else {
            None
        }
    }

    fn clean_cache(&self, query: &RemoteQuery<F::Request>, notify: bool) {
        self.forget(query);
        formainframe_events::emit_cache_cleaned!(query, notify);
        if notify {
            for listener in self.listeners() {
                listener.on_cache_cleaned(query);
            }
        }
    }

    fn apply_refresh_cache_date(&self, query: &RemoteQuery<F::Request>, time: DateTime<Utc>) {
        self.ledger().refreshed.entry(query.clone()).or_insert(time);
    }

    fn find_cache_refresh_date_if_present(
        &self,
        query: &RemoteQuery<F::Request>,
    ) -> Option<DateTime<Utc>> {
        self.ledger().refreshed.get(query).copied()
    }

    async fn reload(
        &self,
        query: &RemoteQuery<F::Request>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<MfVirtualFile>> {
        self.ledger()
            .states
            .insert(query.clone(), CacheState::Fetching);
        match self.try_reload(query, progress).await {
            Ok(files) => {
                let mut updates = self.store(query, &files, false);
                updates.push((query.clone(), files.clone()));
                self.publish_updates(&updates);
                self.apply_refresh_cache_date(query, Utc::now());
                Ok(files)
            }
            Err(e) => Err(self.fetch_failed(query, e)),
        }
    }

    async fn load_more(
        &self,
        query: &RemoteQuery<F::Request>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<MfVirtualFile>> {
        let start = {
            let mut ledger = self.ledger();
            ledger.states.insert(query.clone(), CacheState::Fetching);
            ledger
                .files
                .get(query)
                .and_then(|files| files.last())
                .map(|file| file.name().to_string())
        };
        match self.fetch_files(query, start.as_deref(), progress).await {
            Ok(files) => {
                let mut updates = self.store(query, &files, true);
                updates.push((query.clone(), files.clone()));
                self.publish_updates(&updates);
                Ok(files)
            }
            Err(e) => Err(self.fetch_failed(query, e)),
        }
    }

    fn add_listener(&self, listener: Arc<dyn CacheListener<F::Request>>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }
}
