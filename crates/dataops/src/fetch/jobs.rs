use super::RemoteFetcher;
use crate::api::ApiResultExt;
use crate::attributes::{AttributesKind, FileAttributes, JobAttributes, Requester};
use crate::context::DataOpsContext;
use crate::query::RemoteQuery;
use async_trait::async_trait;
use formainframe_core::{JobsFilter, ProgressIndicator, Result};

/// Lists JES jobs matching a filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct JobFetcher;

#[async_trait]
impl RemoteFetcher for JobFetcher {
    type Request = JobsFilter;

    const KIND: AttributesKind = AttributesKind::Job;

    async fn fetch_responses(
        &self,
        context: &DataOpsContext,
        query: &RemoteQuery<JobsFilter>,
        start: Option<&str>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<FileAttributes>> {
        if start.is_some() {
            return Ok(Vec::new());
        }
        let credentials = context.credentials_for(&query.connection).await?;
        let api = context.api().jes_api(&query.connection)?;
        let jobs = progress
            .run(async {
                api.list_jobs(&credentials, &query.request)
                    .await
                    .or_call_failed("Cannot retrieve Job files list")
            })
            .await?;
        tracing::info!(query = %query, returned = jobs.len(), "Jobs listed");

        let requester = Requester::Jobs {
            connection: query.connection.clone(),
            filter: query.request.clone(),
        };
        Ok(jobs
            .into_iter()
            .map(|info| {
                FileAttributes::Job(JobAttributes {
                    info,
                    url: query.connection.url.clone(),
                    requesters: vec![requester.clone()],
                })
            })
            .collect())
    }
}
