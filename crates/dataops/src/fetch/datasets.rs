use super::RemoteFetcher;
use crate::api::ApiResultExt;
use crate::attributes::{AttributesKind, DatasetAttributes, FileAttributes, Requester};
use crate::context::DataOpsContext;
use crate::query::RemoteQuery;
use async_trait::async_trait;
use formainframe_core::{DsMask, ProgressIndicator, Result};

/// Lists datasets matching a mask.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetFetcher;

#[async_trait]
impl RemoteFetcher for DatasetFetcher {
    type Request = DsMask;

    const KIND: AttributesKind = AttributesKind::Dataset;

    async fn fetch_responses(
        &self,
        context: &DataOpsContext,
        query: &RemoteQuery<DsMask>,
        start: Option<&str>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<FileAttributes>> {
        let credentials = context.credentials_for(&query.connection).await?;
        let api = context.api().data_api(&query.connection)?;
        let list = progress
            .run(async {
                api.list_datasets(
                    &credentials,
                    &query.request.mask,
                    start,
                    context.settings().batch_size,
                )
                .await
                .or_call_failed("Cannot retrieve dataset list")
            })
            .await?;
        tracing::info!(
            query = %query,
            returned = list.items.len(),
            total = ?list.total_rows,
            "Datasets listed"
        );

        let requester = Requester::Masked {
            connection: query.connection.clone(),
            mask: query.request.clone(),
        };
        // z/OSMF repeats the start item at the head of the next batch
        Ok(list
            .items
            .into_iter()
            .filter(|info| start != Some(info.dsname.as_str()))
            .map(|info| {
                FileAttributes::Dataset(DatasetAttributes {
                    info,
                    url: query.connection.url.clone(),
                    requesters: vec![requester.clone()],
                })
            })
            .collect())
    }
}
