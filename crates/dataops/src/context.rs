//! Services shared by every data-operations component.

use crate::api::ApiProvider;
use crate::attributes::{AttributesKind, AttributesService, FileAttributes};
use crate::content::ContentAdapter;
use crate::file::MfVirtualFile;
use crate::registry::LazyRegistry;
use formainframe_core::{
    BasicCredentials, ConnectionConfig, CredentialService, Error, Result, Settings,
};
use std::sync::Arc;

/// Builds an attributes service.
pub type AttributesServiceFactory = Box<dyn Fn() -> Arc<dyn AttributesService> + Send + Sync>;

/// Builds a content adapter.
pub type ContentAdapterFactory = Box<dyn Fn() -> Arc<dyn ContentAdapter> + Send + Sync>;

/// API access, credentials, attribute services and content adapters.
///
/// Handed to every fetch provider, operation runner and synchronizer at
/// construction time.
pub struct DataOpsContext {
    api: Arc<dyn ApiProvider>,
    credentials: Arc<CredentialService>,
    settings: Settings,
    attributes_factories: Vec<AttributesServiceFactory>,
    attributes_services: LazyRegistry<Arc<dyn AttributesService>>,
    adapter_factories: Vec<ContentAdapterFactory>,
    adapters: LazyRegistry<Arc<dyn ContentAdapter>>,
}

impl std::fmt::Debug for DataOpsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataOpsContext")
            .field("attributes_factories", &self.attributes_factories.len())
            .field("adapter_factories", &self.adapter_factories.len())
            .finish_non_exhaustive()
    }
}

impl DataOpsContext {
    /// Create a context. Factories run on first lookup.
    #[must_use]
    pub fn new(
        api: Arc<dyn ApiProvider>,
        credentials: Arc<CredentialService>,
        settings: Settings,
        attributes_factories: Vec<AttributesServiceFactory>,
        adapter_factories: Vec<ContentAdapterFactory>,
    ) -> Self {
        Self {
            api,
            credentials,
            settings,
            attributes_factories,
            attributes_services: LazyRegistry::default(),
            adapter_factories,
            adapters: LazyRegistry::default(),
        }
    }

    /// API facades.
    #[must_use]
    pub fn api(&self) -> &Arc<dyn ApiProvider> {
        &self.api
    }

    /// Settings the context was built with.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Username and password for calls through `connection`.
    ///
    /// # Errors
    ///
    /// Fails when no credentials are stored for the connection.
    pub async fn credentials_for(&self, connection: &ConnectionConfig) -> Result<BasicCredentials> {
        self.credentials.basic_credentials(connection).await
    }

    /// Every attributes service, in registration order.
    #[must_use]
    pub fn attributes_services(&self) -> Arc<[Arc<dyn AttributesService>]> {
        self.attributes_services
            .get_or_build(|| self.attributes_factories.iter().map(|f| f()).collect())
    }

    /// First attributes service for `kind`.
    ///
    /// # Errors
    ///
    /// Fails with not-found when no service handles `kind`.
    pub fn attributes_service(&self, kind: AttributesKind) -> Result<Arc<dyn AttributesService>> {
        self.attributes_services()
            .iter()
            .find(|service| service.kind() == kind)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("AttributesService for {kind}")))
    }

    /// Attributes of `file` from whichever service knows it.
    #[must_use]
    pub fn try_to_get_attributes(&self, file: &MfVirtualFile) -> Option<FileAttributes> {
        self.attributes_services()
            .iter()
            .find_map(|service| service.get_attributes(file))
    }

    /// Handle of the resource `attributes` describe, if known.
    #[must_use]
    pub fn try_to_get_file(&self, attributes: &FileAttributes) -> Option<MfVirtualFile> {
        self.attributes_services()
            .iter()
            .find_map(|service| service.get_virtual_file(attributes))
    }

    /// Attributes of the parent of a dependent resource.
    ///
    /// # Errors
    ///
    /// Fails with missing-metadata when the parent is unknown.
    pub fn parent_attributes(&self, attributes: &FileAttributes) -> Result<FileAttributes> {
        let (Some(parent_kind), Some(parent)) = (attributes.kind().parent_kind(), attributes.parent_file())
        else {
            return Err(Error::missing_metadata(format!(
                "{attributes} has no parent"
            )));
        };
        self.attributes_service(parent_kind)?
            .get_attributes(parent)
            .ok_or_else(|| {
                Error::missing_metadata(format!(
                    "Cannot find {parent_kind} attributes of {}, parent of {}",
                    parent.path(),
                    attributes.name()
                ))
            })
    }

    fn adapters(&self) -> Arc<[Arc<dyn ContentAdapter>]> {
        self.adapters
            .get_or_build(|| self.adapter_factories.iter().map(|f| f()).collect())
    }

    /// Content received from the mainframe, as the editor should see it.
    #[must_use]
    pub fn adapt_content_from_mainframe(&self, attributes: &FileAttributes, content: &[u8]) -> Vec<u8> {
        self.adapters()
            .iter()
            .find(|adapter| adapter.accepts(attributes))
            .map_or_else(
                || content.to_vec(),
                |adapter| adapter.adapt_content_from_mainframe(content, attributes, self),
            )
    }

    /// Editor content, as it should be sent to the mainframe.
    #[must_use]
    pub fn prepare_content_to_mainframe(&self, attributes: &FileAttributes, content: &[u8]) -> Vec<u8> {
        self.adapters()
            .iter()
            .find(|adapter| adapter.accepts(attributes))
            .map_or_else(
                || content.to_vec(),
                |adapter| adapter.prepare_content_to_mainframe(content, attributes, self),
            )
    }

    /// Drop every attributes service and adapter.
    pub(crate) fn dispose(&self) {
        self.attributes_services.clear();
        self.adapters.clear();
    }
}
