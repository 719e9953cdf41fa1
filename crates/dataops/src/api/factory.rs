//! Cached API facades over two shared HTTP clients.

use super::{ApiKind, ApiProvider, DataApi, JesApi, SystemsApi, ZosmfRestClient};
use formainframe_core::{ConnectionConfig, Error, HttpSettings, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ApiKey {
    kind: ApiKind,
    url: String,
    allow_self_signed: bool,
}

/// HTTP client plus the permits bounding its in-flight requests.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    pub(crate) http: reqwest::Client,
    pub(crate) permits: Arc<Semaphore>,
}

#[derive(Debug, Default)]
struct Clients {
    strict: Option<HttpClient>,
    relaxed: Option<HttpClient>,
}

/// Builds and caches one [`ZosmfRestClient`] per (API kind, URL, trust mode).
///
/// At most two `reqwest` clients exist per factory: a strict one verifying
/// server certificates and a relaxed one accepting self-signed certificates.
/// Each is built on first use and shared by every facade of its trust mode.
#[derive(Debug)]
pub struct ZosmfApiFactory {
    settings: HttpSettings,
    clients: Mutex<Clients>,
    apis: Mutex<HashMap<ApiKey, Arc<ZosmfRestClient>>>,
    clients_built: AtomicUsize,
}

impl Default for ZosmfApiFactory {
    fn default() -> Self {
        Self::new(HttpSettings::default())
    }
}

impl ZosmfApiFactory {
    /// Factory using `settings` for both clients.
    #[must_use]
    pub fn new(settings: HttpSettings) -> Self {
        Self {
            settings,
            clients: Mutex::new(Clients::default()),
            apis: Mutex::new(HashMap::new()),
            clients_built: AtomicUsize::new(0),
        }
    }

    /// Facade of `kind` for `connection`, built on first request.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when the HTTP client cannot be built.
    pub fn client(&self, kind: ApiKind, connection: &ConnectionConfig) -> Result<Arc<ZosmfRestClient>> {
        let key = ApiKey {
            kind,
            url: connection.url.trim_end_matches('/').to_string(),
            allow_self_signed: connection.is_allow_self_signed,
        };
        let mut apis = self.apis.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(api) = apis.get(&key) {
            return Ok(Arc::clone(api));
        }
        let http = self.http_client(key.allow_self_signed)?;
        tracing::debug!(
            kind = %kind,
            url = %key.url,
            allow_self_signed = key.allow_self_signed,
            "Creating z/OSMF API client"
        );
        let api = Arc::new(ZosmfRestClient::new(key.url.clone(), http));
        apis.insert(key, Arc::clone(&api));
        Ok(api)
    }

    /// Number of `reqwest` clients built so far, at most two.
    #[must_use]
    pub fn clients_built(&self) -> usize {
        self.clients_built.load(Ordering::SeqCst)
    }

    fn http_client(&self, allow_self_signed: bool) -> Result<HttpClient> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = if allow_self_signed {
            &mut clients.relaxed
        } else {
            &mut clients.strict
        };
        if let Some(client) = slot {
            return Ok(client.clone());
        }
        let client = self.build_http_client(allow_self_signed)?;
        self.clients_built.fetch_add(1, Ordering::SeqCst);
        *slot = Some(client.clone());
        Ok(client)
    }

    fn build_http_client(&self, allow_self_signed: bool) -> Result<HttpClient> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("formainframe/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(self.settings.request_timeout())
            .read_timeout(self.settings.request_timeout())
            .pool_max_idle_per_host(self.settings.max_idle_per_host)
            .pool_idle_timeout(self.settings.idle_timeout())
            .danger_accept_invalid_certs(allow_self_signed)
            .build()
            .map_err(|e| Error::configuration(format!("Cannot build HTTP client: {e}")))?;
        Ok(HttpClient {
            http,
            permits: Arc::new(Semaphore::new(self.settings.max_concurrent_requests)),
        })
    }
}

impl ApiProvider for ZosmfApiFactory {
    fn data_api(&self, connection: &ConnectionConfig) -> Result<Arc<dyn DataApi>> {
        Ok(self.client(ApiKind::Data, connection)?)
    }

    fn jes_api(&self, connection: &ConnectionConfig) -> Result<Arc<dyn JesApi>> {
        Ok(self.client(ApiKind::Jes, connection)?)
    }

    fn systems_api(&self, connection: &ConnectionConfig) -> Result<Arc<dyn SystemsApi>> {
        Ok(self.client(ApiKind::Systems, connection)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_connection_same_instance() {
        let factory = ZosmfApiFactory::default();
        let conn = ConnectionConfig::new("dev", "https://zosmf.example:443").with_allow_self_signed(false);

        let first = factory.client(ApiKind::Data, &conn).unwrap();
        let second = factory.client(ApiKind::Data, &conn).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.clients_built(), 1);
    }

    #[test]
    fn test_trust_mode_selects_client() {
        let factory = ZosmfApiFactory::default();
        let strict = ConnectionConfig::new("a", "https://h").with_allow_self_signed(false);
        let relaxed = ConnectionConfig::new("b", "https://h");

        let a = factory.client(ApiKind::Jes, &strict).unwrap();
        let b = factory.client(ApiKind::Jes, &relaxed).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        factory.client(ApiKind::Data, &strict).unwrap();
        factory.client(ApiKind::Systems, &relaxed).unwrap();
        assert_eq!(factory.clients_built(), 2);
    }
}
