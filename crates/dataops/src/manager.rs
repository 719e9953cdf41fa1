//! Single point of lookup for every data-operations component.

use crate::api::ApiProvider;
use crate::attributes::{AttributesKind, AttributesService, FileAttributes, RemoteAttributesService};
use crate::content::{
    ContentAdapter, ContentSynchronizer, DatasetContentIo, DefaultContentAdapter,
    MemberContentIo, RemoteAttributedContentSynchronizer, RemoteContentIo, SpoolFileContentIo,
    UssContentIo,
};
use crate::context::{AttributesServiceFactory, ContentAdapterFactory, DataOpsContext};
use crate::fetch::{
    DatasetFetcher, FetchProviderEntry, FetchRequest, FileFetchProvider, JobFetcher,
    MemberFetcher, RemoteFetcher, RemoteFileFetchProvider, SpoolFileFetcher, UssFetcher,
};
use crate::file::MfVirtualFile;
use crate::operations::{
    BasicPurgeJobRunner, ChangeFileTagRunner, CorrelatorPurgeJobRunner, DeleteOperationRunner,
    InfoOperationRunner, Operation, OperationOutput, OperationRunner, RemoteOperation,
};
use crate::registry::LazyRegistry;
use formainframe_core::{CredentialService, Error, ProgressIndicator, Result, Settings};
use formainframe_events::emit_operation_performed;
use std::any::type_name;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Builds a fetch provider over the shared context.
pub type FetchProviderFactory =
    Box<dyn Fn(&Arc<DataOpsContext>) -> FetchProviderEntry + Send + Sync>;

/// Builds an operation runner over the shared context.
pub type OperationRunnerFactory =
    Box<dyn Fn(&Arc<DataOpsContext>) -> Arc<dyn OperationRunner> + Send + Sync>;

/// Builds a content synchronizer over the shared context.
pub type ContentSynchronizerFactory =
    Box<dyn Fn(&Arc<DataOpsContext>) -> Arc<dyn ContentSynchronizer> + Send + Sync>;

/// Ordered factory lists, one per extension point.
///
/// Lookups pick the first matching component, so registration order is
/// dispatch order.
#[derive(Default)]
pub struct DataOpsExtensions {
    attributes_services: Vec<AttributesServiceFactory>,
    content_adapters: Vec<ContentAdapterFactory>,
    fetch_providers: Vec<FetchProviderFactory>,
    operation_runners: Vec<OperationRunnerFactory>,
    content_synchronizers: Vec<ContentSynchronizerFactory>,
}

impl std::fmt::Debug for DataOpsExtensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataOpsExtensions")
            .field("attributes_services", &self.attributes_services.len())
            .field("content_adapters", &self.content_adapters.len())
            .field("fetch_providers", &self.fetch_providers.len())
            .field("operation_runners", &self.operation_runners.len())
            .field("content_synchronizers", &self.content_synchronizers.len())
            .finish()
    }
}

impl DataOpsExtensions {
    /// No components at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every component shipped with this crate.
    #[must_use]
    pub fn builtin() -> Self {
        let mut extensions = Self::new();
        for kind in AttributesKind::ALL {
            extensions = extensions.with_attributes_service(move || {
                Arc::new(RemoteAttributesService::new(kind)) as Arc<dyn AttributesService>
            });
        }
        extensions
            .with_content_adapter(|| Arc::new(DefaultContentAdapter))
            .with_fetch_provider(remote_fetch_provider(DatasetFetcher))
            .with_fetch_provider(remote_fetch_provider(MemberFetcher))
            .with_fetch_provider(remote_fetch_provider(UssFetcher))
            .with_fetch_provider(remote_fetch_provider(JobFetcher))
            .with_fetch_provider(remote_fetch_provider(SpoolFileFetcher))
            .with_operation_runner(|ctx| Arc::new(InfoOperationRunner::new(Arc::clone(ctx))))
            .with_operation_runner(|ctx| Arc::new(BasicPurgeJobRunner::new(Arc::clone(ctx))))
            .with_operation_runner(|ctx| {
                Arc::new(CorrelatorPurgeJobRunner::new(Arc::clone(ctx)))
            })
            .with_operation_runner(|ctx| Arc::new(ChangeFileTagRunner::new(Arc::clone(ctx))))
            .with_operation_runner(|ctx| Arc::new(DeleteOperationRunner::new(Arc::clone(ctx))))
            .with_content_synchronizer(remote_synchronizer(DatasetContentIo))
            .with_content_synchronizer(remote_synchronizer(MemberContentIo))
            .with_content_synchronizer(remote_synchronizer(UssContentIo))
            .with_content_synchronizer(remote_synchronizer(SpoolFileContentIo))
    }

    /// Register an attributes service.
    #[must_use]
    pub fn with_attributes_service(
        mut self,
        factory: impl Fn() -> Arc<dyn AttributesService> + Send + Sync + 'static,
    ) -> Self {
        self.attributes_services.push(Box::new(factory));
        self
    }

    /// Register a content adapter.
    #[must_use]
    pub fn with_content_adapter(
        mut self,
        factory: impl Fn() -> Arc<dyn ContentAdapter> + Send + Sync + 'static,
    ) -> Self {
        self.content_adapters.push(Box::new(factory));
        self
    }

    /// Register a fetch provider.
    #[must_use]
    pub fn with_fetch_provider(
        mut self,
        factory: impl Fn(&Arc<DataOpsContext>) -> FetchProviderEntry + Send + Sync + 'static,
    ) -> Self {
        self.fetch_providers.push(Box::new(factory));
        self
    }

    /// Register an operation runner.
    #[must_use]
    pub fn with_operation_runner(
        mut self,
        factory: impl Fn(&Arc<DataOpsContext>) -> Arc<dyn OperationRunner> + Send + Sync + 'static,
    ) -> Self {
        self.operation_runners.push(Box::new(factory));
        self
    }

    /// Register a content synchronizer.
    #[must_use]
    pub fn with_content_synchronizer(
        mut self,
        factory: impl Fn(&Arc<DataOpsContext>) -> Arc<dyn ContentSynchronizer>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.content_synchronizers.push(Box::new(factory));
        self
    }
}

fn remote_fetch_provider<F: RemoteFetcher + Clone>(
    fetcher: F,
) -> impl Fn(&Arc<DataOpsContext>) -> FetchProviderEntry + Send + Sync + 'static {
    move |ctx: &Arc<DataOpsContext>| {
        let provider: Arc<dyn FileFetchProvider<F::Request>> =
            Arc::new(RemoteFileFetchProvider::new(Arc::clone(ctx), fetcher.clone()));
        FetchProviderEntry::new(provider)
    }
}

fn remote_synchronizer<I: RemoteContentIo + Clone>(
    io: I,
) -> impl Fn(&Arc<DataOpsContext>) -> Arc<dyn ContentSynchronizer> + Send + Sync + 'static {
    move |ctx: &Arc<DataOpsContext>| -> Arc<dyn ContentSynchronizer> {
        Arc::new(RemoteAttributedContentSynchronizer::new(
            Arc::clone(ctx),
            io.clone(),
        ))
    }
}

/// Registry and dispatcher of attributes services, fetch providers,
/// operation runners and content synchronizers.
///
/// Every registry is built from its factories on first use and kept for
/// the lifetime of the manager. [`DataOpsManager::dispose`] empties them
/// for good.
pub struct DataOpsManager {
    context: Arc<DataOpsContext>,
    fetch_factories: Vec<FetchProviderFactory>,
    fetch_providers: LazyRegistry<Arc<FetchProviderEntry>>,
    runner_factories: Vec<OperationRunnerFactory>,
    runners: LazyRegistry<Arc<dyn OperationRunner>>,
    synchronizer_factories: Vec<ContentSynchronizerFactory>,
    synchronizers: LazyRegistry<Arc<dyn ContentSynchronizer>>,
    disposed: AtomicBool,
}

impl std::fmt::Debug for DataOpsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataOpsManager")
            .field("context", &self.context)
            .field("disposed", &self.disposed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl DataOpsManager {
    /// Create a manager. No component is built until first looked up.
    #[must_use]
    pub fn new(
        api: Arc<dyn ApiProvider>,
        credentials: Arc<CredentialService>,
        settings: Settings,
        extensions: DataOpsExtensions,
    ) -> Self {
        let DataOpsExtensions {
            attributes_services,
            content_adapters,
            fetch_providers,
            operation_runners,
            content_synchronizers,
        } = extensions;
        Self {
            context: Arc::new(DataOpsContext::new(
                api,
                credentials,
                settings,
                attributes_services,
                content_adapters,
            )),
            fetch_factories: fetch_providers,
            fetch_providers: LazyRegistry::default(),
            runner_factories: operation_runners,
            runners: LazyRegistry::default(),
            synchronizer_factories: content_synchronizers,
            synchronizers: LazyRegistry::default(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Context shared with every component.
    #[must_use]
    pub const fn context(&self) -> &Arc<DataOpsContext> {
        &self.context
    }

    /// First attributes service for `kind`.
    ///
    /// # Errors
    ///
    /// Fails with not-found when no service handles `kind`.
    pub fn attributes_service(&self, kind: AttributesKind) -> Result<Arc<dyn AttributesService>> {
        self.context.attributes_service(kind)
    }

    /// Attributes of `file`, if any service knows it.
    #[must_use]
    pub fn try_to_get_attributes(&self, file: &MfVirtualFile) -> Option<FileAttributes> {
        self.context.try_to_get_attributes(file)
    }

    /// Handle for `attributes`, if any service knows it.
    #[must_use]
    pub fn try_to_get_file(&self, attributes: &FileAttributes) -> Option<MfVirtualFile> {
        self.context.try_to_get_file(attributes)
    }

    fn fetch_providers(&self) -> Arc<[Arc<FetchProviderEntry>]> {
        self.fetch_providers.get_or_build(|| {
            self.fetch_factories
                .iter()
                .map(|factory| Arc::new(factory(&self.context)))
                .collect()
        })
    }

    fn runners(&self) -> Arc<[Arc<dyn OperationRunner>]> {
        self.runners.get_or_build(|| {
            self.runner_factories
                .iter()
                .map(|factory| factory(&self.context))
                .collect()
        })
    }

    fn synchronizers(&self) -> Arc<[Arc<dyn ContentSynchronizer>]> {
        self.synchronizers.get_or_build(|| {
            self.synchronizer_factories
                .iter()
                .map(|factory| factory(&self.context))
                .collect()
        })
    }

    /// First fetch provider serving requests of type `R`.
    ///
    /// # Errors
    ///
    /// Fails with not-found when no provider serves `R`.
    pub fn file_fetch_provider<R: FetchRequest>(&self) -> Result<Arc<dyn FileFetchProvider<R>>> {
        self.fetch_providers()
            .iter()
            .find_map(|entry| entry.downcast::<R>())
            .ok_or_else(|| Error::not_found(format!("FileFetchProvider for {}", type_name::<R>())))
    }

    fn runner_for(&self, operation: &Operation) -> Option<Arc<dyn OperationRunner>> {
        self.runners()
            .iter()
            .find(|runner| {
                runner.operation_kind() == operation.kind() && runner.can_run(operation)
            })
            .cloned()
    }

    /// Whether some runner accepts `operation`.
    #[must_use]
    pub fn is_operation_supported(&self, operation: &Operation) -> bool {
        self.runner_for(operation).is_some()
    }

    /// Run `operation` with the first runner accepting it.
    ///
    /// # Errors
    ///
    /// Fails with unsupported when no runner accepts the operation,
    /// otherwise with whatever the runner reports.
    pub async fn perform(
        &self,
        operation: &Operation,
        progress: &ProgressIndicator,
    ) -> Result<OperationOutput> {
        let Some(runner) = self.runner_for(operation) else {
            return Err(Error::unsupported(operation.to_string()));
        };
        progress.check_canceled()?;
        let started = Instant::now();
        let result = runner.run(operation, progress).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(_) => emit_operation_performed!(operation.kind(), runner.name(), elapsed_ms),
            Err(e) if e.is_cancelled() => {
                tracing::debug!(operation = %operation, "Operation cancelled");
            }
            Err(e) => {
                tracing::warn!(operation = %operation, runner = runner.name(), error = %e, "Operation failed");
            }
        }
        result
    }

    /// Run a typed operation and return its typed result.
    ///
    /// # Errors
    ///
    /// Same as [`DataOpsManager::perform`].
    pub async fn perform_operation<O: RemoteOperation>(
        &self,
        operation: O,
        progress: &ProgressIndicator,
    ) -> Result<O::Output> {
        let operation: Operation = operation.into();
        let output = self.perform(&operation, progress).await?;
        O::extract(output)
    }

    /// Whether some synchronizer handles `file`.
    #[must_use]
    pub fn is_sync_supported(&self, file: &MfVirtualFile) -> bool {
        self.content_synchronizer(file).is_some()
    }

    /// First synchronizer handling `file`.
    #[must_use]
    pub fn content_synchronizer(&self, file: &MfVirtualFile) -> Option<Arc<dyn ContentSynchronizer>> {
        self.synchronizers()
            .iter()
            .find(|synchronizer| synchronizer.accepts(file))
            .cloned()
    }

    /// Drop every component. Later lookups find nothing.
    ///
    /// Idempotent and callable from any thread.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.fetch_providers.clear();
        self.runners.clear();
        self.synchronizers.clear();
        self.context.dispose();
        tracing::debug!("Data operations manager disposed");
    }
}
