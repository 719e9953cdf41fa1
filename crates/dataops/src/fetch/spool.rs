use super::RemoteFetcher;
use crate::api::ApiResultExt;
use crate::attributes::{AttributesKind, FileAttributes, SpoolFileAttributes};
use crate::context::DataOpsContext;
use crate::query::{JobQuery, RemoteQuery};
use async_trait::async_trait;
use formainframe_core::{Error, ProgressIndicator, Result};

/// Lists the spool files of a job known to the job attributes service.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpoolFileFetcher;

#[async_trait]
impl RemoteFetcher for SpoolFileFetcher {
    type Request = JobQuery;

    const KIND: AttributesKind = AttributesKind::SpoolFile;

    async fn fetch_responses(
        &self,
        context: &DataOpsContext,
        query: &RemoteQuery<JobQuery>,
        start: Option<&str>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<FileAttributes>> {
        if start.is_some() {
            return Ok(Vec::new());
        }
        let job = context
            .attributes_service(AttributesKind::Job)?
            .get_attributes(&query.request.job);
        let Some(FileAttributes::Job(job)) = job else {
            return Err(Error::missing_metadata("Virtual file is not a job"));
        };

        let credentials = context.credentials_for(&query.connection).await?;
        let api = context.api().jes_api(&query.connection)?;
        let files = progress
            .run(async {
                api.list_spool_files(&credentials, &job.info.job_name, &job.info.job_id)
                    .await
                    .or_call_failed("Cannot retrieve spool file list")
            })
            .await?;
        tracing::info!(query = %query, returned = files.len(), "Spool files listed");

        Ok(files
            .into_iter()
            .map(|info| {
                FileAttributes::SpoolFile(SpoolFileAttributes {
                    info,
                    parent_file: query.request.job.clone(),
                    url: query.connection.url.clone(),
                })
            })
            .collect())
    }
}
