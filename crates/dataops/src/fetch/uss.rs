use super::RemoteFetcher;
use crate::api::ApiResultExt;
use crate::attributes::{AttributesKind, FileAttributes, Requester, UssAttributes, uss};
use crate::context::DataOpsContext;
use crate::query::{RemoteQuery, UssQuery};
use async_trait::async_trait;
use formainframe_core::{ProgressIndicator, Result};

/// Lists a USS directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct UssFetcher;

#[async_trait]
impl RemoteFetcher for UssFetcher {
    type Request = UssQuery;

    const KIND: AttributesKind = AttributesKind::Uss;

    async fn fetch_responses(
        &self,
        context: &DataOpsContext,
        query: &RemoteQuery<UssQuery>,
        start: Option<&str>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<FileAttributes>> {
        // USS listings come in one piece
        if start.is_some() {
            return Ok(Vec::new());
        }
        let credentials = context.credentials_for(&query.connection).await?;
        let api = context.api().data_api(&query.connection)?;
        let list = progress
            .run(async {
                api.list_uss_path(&credentials, &query.request.path)
                    .await
                    .or_call_failed("Cannot retrieve USS files list")
            })
            .await?;
        tracing::info!(query = %query, returned = list.items.len(), "USS directory listed");

        let requester = Requester::Uss {
            connection: query.connection.clone(),
        };
        Ok(list
            .items
            .into_iter()
            .filter(|info| info.name != "." && info.name != "..")
            .map(|info| {
                FileAttributes::Uss(UssAttributes {
                    path: uss::child_path(&query.request.path, &info.name),
                    is_directory: info.is_directory(),
                    length: info.size,
                    url: query.connection.url.clone(),
                    requesters: vec![requester.clone()],
                    charset: None,
                })
            })
            .collect())
    }
}
