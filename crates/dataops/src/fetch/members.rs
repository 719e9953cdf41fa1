use super::RemoteFetcher;
use crate::api::ApiResultExt;
use crate::attributes::{AttributesKind, FileAttributes, MemberAttributes};
use crate::context::DataOpsContext;
use crate::query::{LibraryQuery, RemoteQuery};
use async_trait::async_trait;
use formainframe_core::{Error, ProgressIndicator, Result};

/// Lists the members of a partitioned dataset.
///
/// The library must be known to the dataset attributes service.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemberFetcher;

#[async_trait]
impl RemoteFetcher for MemberFetcher {
    type Request = LibraryQuery;

    const KIND: AttributesKind = AttributesKind::Member;

    async fn fetch_responses(
        &self,
        context: &DataOpsContext,
        query: &RemoteQuery<LibraryQuery>,
        start: Option<&str>,
        progress: &ProgressIndicator,
    ) -> Result<Vec<FileAttributes>> {
        let library = context
            .attributes_service(AttributesKind::Dataset)?
            .get_attributes(&query.request.library);
        let Some(FileAttributes::Dataset(library)) = library else {
            return Err(Error::missing_metadata("Virtual file is not a library"));
        };
        tracing::info!(query = %query, library = %library.info.dsname, "Fetching members");

        let credentials = context.credentials_for(&query.connection).await?;
        let api = context.api().data_api(&query.connection)?;
        let list = progress
            .run(async {
                api.list_members(
                    &credentials,
                    &library.info.dsname,
                    start,
                    context.settings().batch_size,
                )
                .await
                .or_call_failed("Cannot retrieve member list")
            })
            .await?;
        tracing::info!(query = %query, returned = list.items.len(), "Members listed");

        Ok(list
            .items
            .into_iter()
            .filter(|info| start != Some(info.name.as_str()))
            .map(|info| {
                FileAttributes::Member(MemberAttributes {
                    info,
                    parent_file: query.request.library.clone(),
                    url: query.connection.url.clone(),
                })
            })
            .collect())
    }
}
