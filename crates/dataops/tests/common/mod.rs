//! In-memory z/OSMF and editor doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use formainframe_core::{
    BasicCredentials, ConnectionConfig, CredentialService, DsMask, JobsFilter, Result, Settings,
};
use formainframe_dataops::api::model::{
    DatasetInfo, DatasetsList, FileTagList, FileTagRequest, JobInfo, MemberInfo, MembersList,
    SpoolFileInfo, SystemInfo, SystemsResponse, UssFilesList,
};
use formainframe_dataops::api::{ApiError, ApiProvider, ApiResult, DataApi, JesApi, SystemsApi};
use formainframe_dataops::attributes::{
    AttributesKind, DatasetAttributes, FileAttributes, JobAttributes, MemberAttributes, Requester,
    SpoolFileAttributes,
};
use formainframe_dataops::content::{ConflictResolution, SyncOutcome, SyncProvider};
use formainframe_dataops::{DataOpsExtensions, DataOpsManager, MfVirtualFile};
use formainframe_secrets::{InMemorySecretStore, SecureSecret};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const URL: &str = "https://zos.example.com:10443";

// =============================================================================
// z/OSMF double
// =============================================================================

/// What the fake mainframe holds and what was asked of it.
#[derive(Default)]
pub struct MockState {
    pub calls: Mutex<Vec<String>>,
    pub failing: Mutex<HashSet<String>>,
    pub hang: AtomicBool,
    pub starts: Mutex<Vec<Option<String>>>,
    pub datasets: Mutex<Vec<DatasetInfo>>,
    pub members: Mutex<Vec<MemberInfo>>,
    pub jobs: Mutex<Vec<JobInfo>>,
    pub contents: Mutex<HashMap<String, Vec<u8>>>,
    pub uploads: AtomicUsize,
}

impl MockState {
    pub fn fail(&self, connection: &str) {
        self.failing.lock().unwrap().insert(connection.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_content(&self, key: &str, content: &[u8]) {
        self.contents
            .lock()
            .unwrap()
            .insert(key.to_string(), content.to_vec());
    }

    pub fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.contents.lock().unwrap().get(key).cloned()
    }
}

pub struct MockZosmf {
    pub state: Arc<MockState>,
}

struct MockApi {
    connection: String,
    state: Arc<MockState>,
}

impl MockApi {
    fn call(&self, what: impl Into<String>) -> ApiResult<()> {
        self.state
            .calls
            .lock()
            .unwrap()
            .push(format!("{} {}", self.connection, what.into()));
        if self.state.failing.lock().unwrap().contains(&self.connection) {
            Err(ApiError::status(500, format!("{} down", self.connection)))
        } else {
            Ok(())
        }
    }

    fn read(&self, key: &str) -> Bytes {
        Bytes::from(self.state.content(key).unwrap_or_default())
    }

    fn write(&self, key: &str, content: &Bytes) {
        self.state.set_content(key, content);
        self.state.uploads.fetch_add(1, Ordering::SeqCst);
    }
}

impl ApiProvider for MockZosmf {
    fn data_api(&self, connection: &ConnectionConfig) -> Result<Arc<dyn DataApi>> {
        Ok(Arc::new(MockApi {
            connection: connection.name.clone(),
            state: Arc::clone(&self.state),
        }))
    }

    fn jes_api(&self, connection: &ConnectionConfig) -> Result<Arc<dyn JesApi>> {
        Ok(Arc::new(MockApi {
            connection: connection.name.clone(),
            state: Arc::clone(&self.state),
        }))
    }

    fn systems_api(&self, connection: &ConnectionConfig) -> Result<Arc<dyn SystemsApi>> {
        Ok(Arc::new(MockApi {
            connection: connection.name.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

#[async_trait]
impl DataApi for MockApi {
    async fn list_datasets(
        &self,
        _credentials: &BasicCredentials,
        mask: &str,
        start: Option<&str>,
        _limit: usize,
    ) -> ApiResult<DatasetsList> {
        self.call(format!("list {mask}"))?;
        self.state
            .starts
            .lock()
            .unwrap()
            .push(start.map(str::to_string));
        if self.state.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let items = self.state.datasets.lock().unwrap().clone();
        Ok(DatasetsList {
            returned_rows: items.len(),
            total_rows: Some(items.len()),
            items,
        })
    }

    async fn list_members(
        &self,
        _credentials: &BasicCredentials,
        dataset: &str,
        _start: Option<&str>,
        _limit: usize,
    ) -> ApiResult<MembersList> {
        self.call(format!("members {dataset}"))?;
        let items = self.state.members.lock().unwrap().clone();
        Ok(MembersList {
            returned_rows: items.len(),
            items,
        })
    }

    async fn list_uss_path(
        &self,
        _credentials: &BasicCredentials,
        path: &str,
    ) -> ApiResult<UssFilesList> {
        self.call(format!("ls {path}"))?;
        Ok(UssFilesList::default())
    }

    async fn retrieve_dataset_content(
        &self,
        _credentials: &BasicCredentials,
        dataset: &str,
        _volser: Option<&str>,
    ) -> ApiResult<Bytes> {
        self.call(format!("get {dataset}"))?;
        Ok(self.read(dataset))
    }

    async fn retrieve_member_content(
        &self,
        _credentials: &BasicCredentials,
        library: &str,
        member: &str,
    ) -> ApiResult<Bytes> {
        let key = format!("{library}({member})");
        self.call(format!("get {key}"))?;
        Ok(self.read(&key))
    }

    async fn retrieve_uss_content(
        &self,
        _credentials: &BasicCredentials,
        path: &str,
        _binary: bool,
    ) -> ApiResult<Bytes> {
        self.call(format!("get {path}"))?;
        Ok(self.read(path))
    }

    async fn write_dataset(
        &self,
        _credentials: &BasicCredentials,
        dataset: &str,
        _volser: Option<&str>,
        content: Bytes,
    ) -> ApiResult<()> {
        self.call(format!("put {dataset}"))?;
        self.write(dataset, &content);
        Ok(())
    }

    async fn write_member(
        &self,
        _credentials: &BasicCredentials,
        library: &str,
        member: &str,
        content: Bytes,
    ) -> ApiResult<()> {
        let key = format!("{library}({member})");
        self.call(format!("put {key}"))?;
        self.write(&key, &content);
        Ok(())
    }

    async fn write_uss(
        &self,
        _credentials: &BasicCredentials,
        path: &str,
        _binary: bool,
        content: Bytes,
    ) -> ApiResult<()> {
        self.call(format!("put {path}"))?;
        self.write(path, &content);
        Ok(())
    }

    async fn delete_dataset(&self, _credentials: &BasicCredentials, dataset: &str) -> ApiResult<()> {
        self.call(format!("delete {dataset}"))
    }

    async fn delete_member(
        &self,
        _credentials: &BasicCredentials,
        library: &str,
        member: &str,
    ) -> ApiResult<()> {
        self.call(format!("delete {library}({member})"))
    }

    async fn delete_uss(
        &self,
        _credentials: &BasicCredentials,
        path: &str,
        _recursive: bool,
    ) -> ApiResult<()> {
        self.call(format!("delete {path}"))
    }

    async fn change_file_tag(
        &self,
        _credentials: &BasicCredentials,
        path: &str,
        _request: &FileTagRequest,
    ) -> ApiResult<Option<FileTagList>> {
        self.call(format!("chtag {path}"))?;
        Ok(None)
    }
}

#[async_trait]
impl JesApi for MockApi {
    async fn list_jobs(
        &self,
        _credentials: &BasicCredentials,
        filter: &JobsFilter,
    ) -> ApiResult<Vec<JobInfo>> {
        self.call(format!("jobs {filter}"))?;
        Ok(self.state.jobs.lock().unwrap().clone())
    }

    async fn list_spool_files(
        &self,
        _credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
    ) -> ApiResult<Vec<SpoolFileInfo>> {
        self.call(format!("spool {job_name}({job_id})"))?;
        Ok(Vec::new())
    }

    async fn spool_file_records(
        &self,
        _credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
        file_id: u32,
    ) -> ApiResult<Bytes> {
        let key = format!("{job_name}({job_id}):{file_id}");
        self.call(format!("get {key}"))?;
        Ok(self.read(&key))
    }

    async fn purge_job(
        &self,
        _credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
    ) -> ApiResult<()> {
        self.call(format!("purge {job_name}({job_id})"))
    }

    async fn purge_job_by_correlator(
        &self,
        _credentials: &BasicCredentials,
        correlator: &str,
    ) -> ApiResult<()> {
        self.call(format!("purge-correlator {correlator}"))
    }
}

#[async_trait]
impl SystemsApi for MockApi {
    async fn systems(&self, _credentials: &BasicCredentials) -> ApiResult<SystemsResponse> {
        self.call("systems")?;
        Ok(SystemsResponse {
            num_rows: 1,
            items: vec![SystemInfo {
                system_nick_name: "SYS1".to_string(),
                ..SystemInfo::default()
            }],
        })
    }
}

// =============================================================================
// Manager fixture
// =============================================================================

pub struct Fixture {
    pub zosmf: Arc<MockState>,
    pub manager: Arc<DataOpsManager>,
    pub connections: Vec<ConnectionConfig>,
}

impl Fixture {
    pub fn connection(&self, name: &str) -> &ConnectionConfig {
        self.connections
            .iter()
            .find(|c| c.name == name)
            .expect("connection is part of the fixture")
    }
}

/// Manager with the builtin components over a fake z/OSMF reachable
/// through one connection per name.
pub async fn fixture(names: &[&str]) -> Fixture {
    let zosmf = Arc::new(MockState::default());
    let credentials = Arc::new(CredentialService::new(
        Arc::new(InMemorySecretStore::new()),
        None,
    ));
    let mut connections = Vec::new();
    for name in names {
        let connection = ConnectionConfig::new(*name, URL);
        credentials
            .set_credentials(&connection.uuid, "IBMUSER", SecureSecret::new("pa55w0rd".into()))
            .await
            .unwrap();
        connections.push(connection);
    }
    let manager = DataOpsManager::new(
        Arc::new(MockZosmf {
            state: Arc::clone(&zosmf),
        }),
        credentials,
        Settings::default(),
        DataOpsExtensions::builtin(),
    );
    Fixture {
        zosmf,
        manager: Arc::new(manager),
        connections,
    }
}

pub fn masked(connection: &ConnectionConfig) -> Requester {
    Requester::Masked {
        connection: connection.clone(),
        mask: DsMask::new("IBMUSER.*"),
    }
}

pub fn dataset_info(name: &str, dsorg: &str) -> DatasetInfo {
    DatasetInfo {
        dsorg: Some(dsorg.to_string()),
        recfm: Some("FB".to_string()),
        lrecl: Some("80".to_string()),
        ..DatasetInfo::named(name)
    }
}

/// Register a dataset reached through `requesters`.
pub fn register_dataset(
    manager: &DataOpsManager,
    info: DatasetInfo,
    requesters: Vec<Requester>,
) -> MfVirtualFile {
    manager
        .attributes_service(AttributesKind::Dataset)
        .unwrap()
        .get_or_create_virtual_file(FileAttributes::Dataset(DatasetAttributes {
            info,
            url: URL.to_string(),
            requesters,
        }))
        .unwrap()
}

pub fn register_member(manager: &DataOpsManager, library: &MfVirtualFile, name: &str) -> MfVirtualFile {
    manager
        .attributes_service(AttributesKind::Member)
        .unwrap()
        .get_or_create_virtual_file(FileAttributes::Member(MemberAttributes {
            info: MemberInfo::named(name),
            parent_file: library.clone(),
            url: URL.to_string(),
        }))
        .unwrap()
}

pub fn register_spool_file(manager: &DataOpsManager, connection: &ConnectionConfig) -> MfVirtualFile {
    let job = manager
        .attributes_service(AttributesKind::Job)
        .unwrap()
        .get_or_create_virtual_file(FileAttributes::Job(JobAttributes {
            info: JobInfo {
                job_id: "JOB00042".to_string(),
                job_name: "IBMUSERA".to_string(),
                owner: "IBMUSER".to_string(),
                ..JobInfo::default()
            },
            url: URL.to_string(),
            requesters: vec![Requester::Jobs {
                connection: connection.clone(),
                filter: JobsFilter::default(),
            }],
        }))
        .unwrap();
    manager
        .attributes_service(AttributesKind::SpoolFile)
        .unwrap()
        .get_or_create_virtual_file(FileAttributes::SpoolFile(SpoolFileAttributes {
            info: SpoolFileInfo {
                id: 2,
                dd_name: "JESMSGLG".to_string(),
                job_id: "JOB00042".to_string(),
                job_name: "IBMUSERA".to_string(),
                ..SpoolFileInfo::default()
            },
            parent_file: job,
            url: URL.to_string(),
        }))
        .unwrap()
}

// =============================================================================
// Editor double
// =============================================================================

pub struct Editor {
    file: MfVirtualFile,
    content: Mutex<Vec<u8>>,
    resolution: Mutex<ConflictResolution>,
    pub conflicts: AtomicUsize,
    pub synced: AtomicUsize,
}

impl Editor {
    pub fn new(file: MfVirtualFile) -> Self {
        Self {
            file,
            content: Mutex::new(Vec::new()),
            resolution: Mutex::new(ConflictResolution::Skip),
            conflicts: AtomicUsize::new(0),
            synced: AtomicUsize::new(0),
        }
    }

    pub fn type_text(&self, text: &str) {
        *self.content.lock().unwrap() = text.as_bytes().to_vec();
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.content.lock().unwrap().clone()).unwrap()
    }

    pub fn resolve_with(&self, resolution: ConflictResolution) {
        *self.resolution.lock().unwrap() = resolution;
    }
}

impl SyncProvider for Editor {
    fn file(&self) -> &MfVirtualFile {
        &self.file
    }

    fn retrieve_current_content(&self) -> Vec<u8> {
        self.content.lock().unwrap().clone()
    }

    fn load_new_content(&self, content: &[u8]) -> Result<()> {
        *self.content.lock().unwrap() = content.to_vec();
        Ok(())
    }

    fn resolve_conflict(&self, _local: &[u8], _remote: &[u8]) -> ConflictResolution {
        self.conflicts.fetch_add(1, Ordering::SeqCst);
        *self.resolution.lock().unwrap()
    }

    fn on_synced(&self, _outcome: &SyncOutcome) {
        self.synced.fetch_add(1, Ordering::SeqCst);
    }
}
