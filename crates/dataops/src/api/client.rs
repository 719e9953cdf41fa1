//! `reqwest` implementation of the z/OSMF facades.

use super::factory::HttpClient;
use super::model::{
    DatasetsList, FileTagList, FileTagRequest, JobInfo, MembersList, SpoolFileInfo,
    SystemsResponse, UssFilesList,
};
use super::{ApiError, ApiResult, DataApi, JesApi, SystemsApi};
use async_trait::async_trait;
use bytes::Bytes;
use formainframe_core::{BasicCredentials, JobsFilter, ResponseSummary};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

const CSRF_HEADER: &str = "X-CSRF-ZOSMF-HEADER";
const MAX_ITEMS_HEADER: &str = "X-IBM-Max-Items";
const DATA_TYPE_HEADER: &str = "X-IBM-Data-Type";
const OPTION_HEADER: &str = "X-IBM-Option";

/// Body kept in a [`ResponseSummary`].
const MAX_ERROR_BODY: usize = 4096;

/// z/OSMF REST client bound to one base URL.
#[derive(Debug)]
pub struct ZosmfRestClient {
    base_url: String,
    client: HttpClient,
}

impl ZosmfRestClient {
    pub(crate) const fn new(base_url: String, client: HttpClient) -> Self {
        Self { base_url, client }
    }

    /// Base URL every request path is appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        credentials: &BasicCredentials,
    ) -> RequestBuilder {
        self.client
            .http
            .request(method, format!("{}{path}", self.base_url))
            .basic_auth(&credentials.username, Some(credentials.password.expose()))
            .header(CSRF_HEADER, "")
    }

    async fn execute(&self, request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let _permit = self
            .client
            .permits
            .acquire()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        tracing::debug!(status = status.as_u16(), "z/OSMF call failed");
        Err(ApiError::Status(ResponseSummary::new(status.as_u16(), body)))
    }

    async fn bytes(&self, request: RequestBuilder) -> ApiResult<Bytes> {
        self.execute(request)
            .await?
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let bytes = self.bytes(request).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Transport(format!("Cannot parse z/OSMF response: {e}")))
    }

    async fn empty(&self, request: RequestBuilder) -> ApiResult<()> {
        self.execute(request).await.map(drop)
    }
}

fn data_type(binary: bool) -> &'static str {
    if binary { "binary" } else { "text" }
}

fn dataset_path(dataset: &str, volser: Option<&str>) -> String {
    match volser {
        Some(volser) if !volser.is_empty() => format!("/zosmf/restfiles/ds/-({volser})/{dataset}"),
        _ => format!("/zosmf/restfiles/ds/{dataset}"),
    }
}

#[async_trait]
impl DataApi for ZosmfRestClient {
    async fn list_datasets(
        &self,
        credentials: &BasicCredentials,
        mask: &str,
        start: Option<&str>,
        limit: usize,
    ) -> ApiResult<DatasetsList> {
        let mut request = self
            .request(Method::GET, "/zosmf/restfiles/ds", credentials)
            .query(&[("dslevel", mask)])
            .header(MAX_ITEMS_HEADER, limit.to_string())
            .header("X-IBM-Attributes", "base");
        if let Some(start) = start {
            request = request.query(&[("start", start)]);
        }
        self.json(request).await
    }

    async fn list_members(
        &self,
        credentials: &BasicCredentials,
        dataset: &str,
        start: Option<&str>,
        limit: usize,
    ) -> ApiResult<MembersList> {
        let mut request = self
            .request(
                Method::GET,
                &format!("/zosmf/restfiles/ds/{dataset}/member"),
                credentials,
            )
            .header(MAX_ITEMS_HEADER, limit.to_string());
        if let Some(start) = start {
            request = request.query(&[("start", start)]);
        }
        self.json(request).await
    }

    async fn list_uss_path(
        &self,
        credentials: &BasicCredentials,
        path: &str,
    ) -> ApiResult<UssFilesList> {
        let request = self
            .request(Method::GET, "/zosmf/restfiles/fs", credentials)
            .query(&[("path", path)]);
        self.json(request).await
    }

    async fn retrieve_dataset_content(
        &self,
        credentials: &BasicCredentials,
        dataset: &str,
        volser: Option<&str>,
    ) -> ApiResult<Bytes> {
        let request = self
            .request(Method::GET, &dataset_path(dataset, volser), credentials)
            .header(DATA_TYPE_HEADER, "text");
        self.bytes(request).await
    }

    async fn retrieve_member_content(
        &self,
        credentials: &BasicCredentials,
        library: &str,
        member: &str,
    ) -> ApiResult<Bytes> {
        let request = self
            .request(
                Method::GET,
                &format!("/zosmf/restfiles/ds/{library}({member})"),
                credentials,
            )
            .header(DATA_TYPE_HEADER, "text");
        self.bytes(request).await
    }

    async fn retrieve_uss_content(
        &self,
        credentials: &BasicCredentials,
        path: &str,
        binary: bool,
    ) -> ApiResult<Bytes> {
        let request = self
            .request(Method::GET, &format!("/zosmf/restfiles/fs{path}"), credentials)
            .header(DATA_TYPE_HEADER, data_type(binary));
        self.bytes(request).await
    }

    async fn write_dataset(
        &self,
        credentials: &BasicCredentials,
        dataset: &str,
        volser: Option<&str>,
        content: Bytes,
    ) -> ApiResult<()> {
        let request = self
            .request(Method::PUT, &dataset_path(dataset, volser), credentials)
            .header(DATA_TYPE_HEADER, "text")
            .body(content);
        self.empty(request).await
    }

    async fn write_member(
        &self,
        credentials: &BasicCredentials,
        library: &str,
        member: &str,
        content: Bytes,
    ) -> ApiResult<()> {
        let request = self
            .request(
                Method::PUT,
                &format!("/zosmf/restfiles/ds/{library}({member})"),
                credentials,
            )
            .header(DATA_TYPE_HEADER, "text")
            .body(content);
        self.empty(request).await
    }

    async fn write_uss(
        &self,
        credentials: &BasicCredentials,
        path: &str,
        binary: bool,
        content: Bytes,
    ) -> ApiResult<()> {
        let request = self
            .request(Method::PUT, &format!("/zosmf/restfiles/fs{path}"), credentials)
            .header(DATA_TYPE_HEADER, data_type(binary))
            .body(content);
        self.empty(request).await
    }

    async fn delete_dataset(&self, credentials: &BasicCredentials, dataset: &str) -> ApiResult<()> {
        let request = self.request(Method::DELETE, &dataset_path(dataset, None), credentials);
        self.empty(request).await
    }

    async fn delete_member(
        &self,
        credentials: &BasicCredentials,
        library: &str,
        member: &str,
    ) -> ApiResult<()> {
        let request = self.request(
            Method::DELETE,
            &format!("/zosmf/restfiles/ds/{library}({member})"),
            credentials,
        );
        self.empty(request).await
    }

    async fn delete_uss(
        &self,
        credentials: &BasicCredentials,
        path: &str,
        recursive: bool,
    ) -> ApiResult<()> {
        let mut request = self.request(
            Method::DELETE,
            &format!("/zosmf/restfiles/fs{path}"),
            credentials,
        );
        if recursive {
            request = request.header(OPTION_HEADER, "recursive");
        }
        self.empty(request).await
    }

    async fn change_file_tag(
        &self,
        credentials: &BasicCredentials,
        path: &str,
        request: &FileTagRequest,
    ) -> ApiResult<Option<FileTagList>> {
        let http = self
            .request(Method::PUT, &format!("/zosmf/restfiles/fs{path}"), credentials)
            .json(request);
        let bytes = self.bytes(http).await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ApiError::Transport(format!("Cannot parse z/OSMF response: {e}")))
    }
}

#[async_trait]
impl JesApi for ZosmfRestClient {
    async fn list_jobs(
        &self,
        credentials: &BasicCredentials,
        filter: &JobsFilter,
    ) -> ApiResult<Vec<JobInfo>> {
        let mut request = self.request(Method::GET, "/zosmf/restjobs/jobs", credentials);
        if filter.job_id.is_empty() {
            request = request.query(&[("owner", &filter.owner), ("prefix", &filter.prefix)]);
            if !filter.user_correlator_filter.is_empty() {
                request = request.query(&[("user-correlator", &filter.user_correlator_filter)]);
            }
        } else {
            request = request.query(&[("jobid", &filter.job_id)]);
        }
        self.json(request).await
    }

    async fn list_spool_files(
        &self,
        credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
    ) -> ApiResult<Vec<SpoolFileInfo>> {
        let request = self.request(
            Method::GET,
            &format!("/zosmf/restjobs/jobs/{job_name}/{job_id}/files"),
            credentials,
        );
        self.json(request).await
    }

    async fn spool_file_records(
        &self,
        credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
        file_id: u32,
    ) -> ApiResult<Bytes> {
        let request = self.request(
            Method::GET,
            &format!("/zosmf/restjobs/jobs/{job_name}/{job_id}/files/{file_id}/records"),
            credentials,
        );
        self.bytes(request).await
    }

    async fn purge_job(
        &self,
        credentials: &BasicCredentials,
        job_name: &str,
        job_id: &str,
    ) -> ApiResult<()> {
        let request = self.request(
            Method::DELETE,
            &format!("/zosmf/restjobs/jobs/{job_name}/{job_id}"),
            credentials,
        );
        self.empty(request).await
    }

    async fn purge_job_by_correlator(
        &self,
        credentials: &BasicCredentials,
        correlator: &str,
    ) -> ApiResult<()> {
        let request = self.request(
            Method::DELETE,
            &format!("/zosmf/restjobs/jobs/{correlator}"),
            credentials,
        );
        self.empty(request).await
    }
}

#[async_trait]
impl SystemsApi for ZosmfRestClient {
    async fn systems(&self, credentials: &BasicCredentials) -> ApiResult<SystemsResponse> {
        let request = self.request(Method::GET, "/zosmf/resttopology/systems", credentials);
        self.json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_path_with_volume() {
        assert_eq!(dataset_path("A.B", None), "/zosmf/restfiles/ds/A.B");
        assert_eq!(dataset_path("A.B", Some("")), "/zosmf/restfiles/ds/A.B");
        assert_eq!(
            dataset_path("A.B", Some("VOL001")),
            "/zosmf/restfiles/ds/-(VOL001)/A.B"
        );
    }
}
