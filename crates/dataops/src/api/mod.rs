//! Typed access to the z/OSMF REST services.
//!
//! Components never build HTTP requests themselves. They ask an
//! [`ApiProvider`] for the facade of one service ([`DataApi`], [`JesApi`],
//! [`SystemsApi`]) bound to a connection, and translate an [`ApiError`] into
//! a [`formainframe_core::Error`] with an action-specific message through
//! [`ApiResultExt::or_call_failed`].

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

mod client;
mod factory;
pub mod model;

pub use client::ZosmfRestClient;
pub use factory::ZosmfApiFactory;

use async_trait::async_trait;
use bytes::Bytes;
use formainframe_core::{BasicCredentials, ConnectionConfig, Error, JobsFilter, ResponseSummary};
use miette::Diagnostic;
use model::{
    DatasetsList, FileTagList, FileTagRequest, JobInfo, MembersList, SpoolFileInfo,
    SystemsResponse, UssFilesList,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// z/OSMF service a facade talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKind {
    /// Datasets, members and USS files (`/zosmf/restfiles`).
    Data,
    /// JES jobs and spool (`/zosmf/restjobs`).
    Jes,
    /// System topology (`/zosmf/resttopology`).
    Systems,
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Data => "data",
            Self::Jes => "jes",
            Self::Systems => "systems",
        })
    }
}

/// Failure of a single REST call.
#[derive(ThisError, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {}", .0.status)]
    #[diagnostic(code(formainframe::api::status))]
    Status(ResponseSummary),

    /// No usable response was received.
    #[error("{0}")]
    #[diagnostic(code(formainframe::api::transport))]
    Transport(String),
}

impl ApiError {
    /// Non-2xx response.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status(ResponseSummary::new(status, body))
    }
}

/// Result of a REST call.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Translation of [`ApiResult`] into the crate-wide error taxonomy.
pub trait ApiResultExt<T> {
    /// Map a status failure to [`Error::CallFailed`] with `message` and a
    /// transport failure to [`Error::Transport`].
    ///
    /// # Errors
    ///
    /// Fails when the call failed.
    fn or_call_failed(self, message: impl Into<String>) -> formainframe_core::Result<T>;
}

impl<T> ApiResultExt<T> for ApiResult<T> {
    fn or_call_failed(self, message: impl Into<String>) -> formainframe_core::Result<T> {
        self.map_err(|e| match e {
            ApiError::Status(response) => Error::call_failed(message, Some(response)),
            ApiError::Transport(reason) => Error::transport(reason),
        })
    }
}

/// `/zosmf/restfiles`: datasets, members and USS files.
#[async_trait]
pub trait DataApi: Send + Sync {
    /// List datasets matching `mask`, starting after `start` when paging.
    async fn list_datasets(
        &self,
        credentials: &BasicCredentials,
        mask: &str,
        start: Option<&str>,
        limit: usize,
    ) -> ApiResult<DatasetsList>;

    /// List members of a partitioned dataset.
    async fn list_members(
        &self,
        credentials: &BasicCredentials,
        dataset: &str,
        start: Option<&str>,
        limit: usize,
    ) -> ApiResult<MembersList>;

    /// List a USS directory.
    async fn list_uss_path(&self, credentials: &BasicCredentials, path: &str)
    -> ApiResult<UssFilesList>;

    /// Content of a sequential dataset.
    async fn retrieve_dataset_content(
        &self,
        credentials: &BasicCredentials,
        dataset: &str,
        volser: Option<&str>,
    ) -> ApiResult<Bytes>;

    /// Content of a member.
    async fn retrieve_member_content(
        &self,
        credentials: &BasicCredentials,
        library: &str,
        member: &str,
    ) -> ApiResult<Bytes>;

    /// Content of a USS file.
    async fn retrieve_uss_content(
        &self,
        credentials: &BasicCredentials,
        path: &str,
        binary: bool,
    ) -> ApiResult<Bytes>;

    /// Replace the content of a sequential dataset.
    async fn write_dataset(
        &self,
        credentials: &BasicCredentials,
        dataset: &str,
        volser: Option<&str>,
        content: Bytes,
    ) -> ApiResult<()>;

    /// Replace the content of a member.
    async fn write_member(
        &self,
        credentials: &BasicCredentials,
        library: &str,
        member: &str,
        content: Bytes,
    ) -> ApiResult<()>;

    /// Replace the content of a USS file.
    async fn write_uss(
        &self,
        credentials: &BasicCredentials,
        path: &str,
        binary: bool,
        content: Bytes,
    ) -> ApiResult<()>;

    /// Delete a dataset.
    async fn delete_dataset(&self, credentials: &BasicCredentials, dataset: &str) -> ApiResult<()>;

    /// Delete a member.
    async fn delete_member(
        &self,
        credentials: &BasicCredentials,
        library: &str,
        member: &str,
    ) -> ApiResult<()>;

    /// Delete a USS file, or a directory with everything below it.
    async fn delete_uss(
        &self,
        credentials: &BasicCredentials,
        path: &str,
        recursive: bool,
    ) -> ApiResult<()>;

    /// Run a `chtag` request on a USS file.
    async fn change_file_tag(
        &self,
        credentials: &BasicCredentials,
        path: &str,
        request: &FileTagRequest,
    ) -> ApiResult<Option<FileTagList>>;
}

/// `/zosmf/restjobs`: JES jobs and spool.
#[async_trait]
pub trait JesApi: Send + Sync {
    /// Jobs matching `filter`.
    async fn list_jobs(
        &self,
        credentials: &BasicCredentials,
        filter: &JobsFilter,
    ) -> ApiResult<Vec<JobInfo>>;

    /// Spool files of a job.
    async fn list_spool_files(
        &self,
        credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
    ) -> ApiResult<Vec<SpoolFileInfo>>;

    /// Records of one spool file.
    async fn spool_file_records(
        &self,
        credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
        file_id: u32,
    ) -> ApiResult<Bytes>;

    /// Purge a job by name and id.
    async fn purge_job(
        &self,
        credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
    ) -> ApiResult<()>;

    /// Purge a job by its correlator.
    async fn purge_job_by_correlator(
        &self,
        credentials: &BasicCredentials,
        correlator: &str,
    ) -> ApiResult<()>;
}

/// `/zosmf/resttopology`: systems.
#[async_trait]
pub trait SystemsApi: Send + Sync {
    /// Systems defined to z/OSMF.
    async fn systems(&self, credentials: &BasicCredentials) -> ApiResult<SystemsResponse>;
}

/// Supplies API facades bound to a connection.
pub trait ApiProvider: Send + Sync {
    /// Data facade for `connection`.
    ///
    /// # Errors
    ///
    /// Fails when no client can be built for the connection.
    fn data_api(&self, connection: &ConnectionConfig) -> formainframe_core::Result<Arc<dyn DataApi>>;

    /// JES facade for `connection`.
    ///
    /// # Errors
    ///
    /// Fails when no client can be built for the connection.
    fn jes_api(&self, connection: &ConnectionConfig) -> formainframe_core::Result<Arc<dyn JesApi>>;

    /// Systems facade for `connection`.
    ///
    /// # Errors
    ///
    /// Fails when no client can be built for the connection.
    fn systems_api(
        &self,
        connection: &ConnectionConfig,
    ) -> formainframe_core::Result<Arc<dyn SystemsApi>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_call_failed_keeps_response() {
        let result: ApiResult<()> = Err(ApiError::status(404, "not here"));
        let err = result.or_call_failed("Cannot delete data set").unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete data set (HTTP 404)");
        assert_eq!(err.response().map(|r| r.status), Some(404));
    }

    #[test]
    fn test_or_call_failed_transport() {
        let result: ApiResult<()> = Err(ApiError::Transport("connection refused".into()));
        let err = result.or_call_failed("ignored").unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }
}
