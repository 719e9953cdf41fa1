use super::RemoteContentIo;
use crate::api::ApiResultExt;
use crate::attributes::{AttributesKind, FileAttributes};
use crate::context::DataOpsContext;
use crate::requesters::first_successful;
use async_trait::async_trait;
use bytes::Bytes;
use formainframe_core::{Error, ProgressIndicator, Result};

fn wrong_kind(expected: AttributesKind, attributes: &FileAttributes) -> Error {
    Error::validation(format!("Expected {expected} attributes, got {attributes}"))
}

/// Sequential datasets, read and written whole.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetContentIo;

#[async_trait]
impl RemoteContentIo for DatasetContentIo {
    const KIND: AttributesKind = AttributesKind::Dataset;
    const NAME: &'static str = "dataset";

    async fn fetch_remote_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        progress: &ProgressIndicator,
    ) -> Result<Vec<u8>> {
        let Some(dataset) = attributes.as_dataset() else {
            return Err(wrong_kind(Self::KIND, attributes));
        };
        let name = dataset.info.dsname.as_str();
        let volser = dataset.info.vol.as_deref();
        let bytes = first_successful(&dataset.requesters, name, |requester| async move {
            let connection = requester.connection();
            let credentials = context.credentials_for(connection).await?;
            let api = context.api().data_api(connection)?;
            progress
                .run(async {
                    api.retrieve_dataset_content(&credentials, name, volser)
                        .await
                        .or_call_failed(format!("Cannot fetch data from {name}"))
                })
                .await
        })
        .await?;
        Ok(bytes.to_vec())
    }

    async fn upload_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        content: &[u8],
        progress: &ProgressIndicator,
    ) -> Result<()> {
        let Some(dataset) = attributes.as_dataset() else {
            return Err(wrong_kind(Self::KIND, attributes));
        };
        let name = dataset.info.dsname.as_str();
        let volser = dataset.info.vol.as_deref();
        first_successful(&dataset.requesters, name, |requester| async move {
            let connection = requester.connection();
            let credentials = context.credentials_for(connection).await?;
            let api = context.api().data_api(connection)?;
            progress
                .run(async {
                    api.write_dataset(&credentials, name, volser, Bytes::copy_from_slice(content))
                        .await
                        .or_call_failed(format!("Cannot upload data to {name}"))
                })
                .await
        })
        .await
    }
}

/// USS files, as text or binary depending on their tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct UssContentIo;

#[async_trait]
impl RemoteContentIo for UssContentIo {
    const KIND: AttributesKind = AttributesKind::Uss;
    const NAME: &'static str = "uss";

    async fn fetch_remote_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        progress: &ProgressIndicator,
    ) -> Result<Vec<u8>> {
        let Some(uss) = attributes.as_uss() else {
            return Err(wrong_kind(Self::KIND, attributes));
        };
        let path = uss.path.as_str();
        let binary = uss.is_binary();
        let bytes = first_successful(&uss.requesters, path, |requester| async move {
            let connection = requester.connection();
            let credentials = context.credentials_for(connection).await?;
            let api = context.api().data_api(connection)?;
            progress
                .run(async {
                    api.retrieve_uss_content(&credentials, path, binary)
                        .await
                        .or_call_failed(format!("Cannot fetch data from {path}"))
                })
                .await
        })
        .await?;
        Ok(bytes.to_vec())
    }

    async fn upload_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        content: &[u8],
        progress: &ProgressIndicator,
    ) -> Result<()> {
        let Some(uss) = attributes.as_uss() else {
            return Err(wrong_kind(Self::KIND, attributes));
        };
        let path = uss.path.as_str();
        let binary = uss.is_binary();
        first_successful(&uss.requesters, path, |requester| async move {
            let connection = requester.connection();
            let credentials = context.credentials_for(connection).await?;
            let api = context.api().data_api(connection)?;
            progress
                .run(async {
                    api.write_uss(&credentials, path, binary, Bytes::copy_from_slice(content))
                        .await
                        .or_call_failed(format!("Cannot upload data to {path}"))
                })
                .await
        })
        .await
    }
}

/// PDS members, reached through the requesters of their library.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemberContentIo;

#[async_trait]
impl RemoteContentIo for MemberContentIo {
    const KIND: AttributesKind = AttributesKind::Member;
    const NAME: &'static str = "member";

    async fn fetch_remote_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        progress: &ProgressIndicator,
    ) -> Result<Vec<u8>> {
        let Some(member) = attributes.as_member() else {
            return Err(wrong_kind(Self::KIND, attributes));
        };
        let parent = context.parent_attributes(attributes)?;
        let Some(library) = parent.as_dataset() else {
            return Err(Error::missing_metadata("Virtual file is not a library"));
        };
        tracing::info!(member = %member.info.name, library = %library.info.dsname, "Fetching member content");
        let (library_name, member_name) = (library.info.dsname.as_str(), member.info.name.as_str());
        let target = format!("{library_name}({member_name})");
        let bytes = first_successful(&library.requesters, &target, |requester| async move {
            let connection = requester.connection();
            let credentials = context.credentials_for(connection).await?;
            let api = context.api().data_api(connection)?;
            progress
                .run(async {
                    api.retrieve_member_content(&credentials, library_name, member_name)
                        .await
                        .or_call_failed(format!(
                            "Cannot fetch data from {library_name}({member_name})"
                        ))
                })
                .await
        })
        .await?;
        Ok(bytes.to_vec())
    }

    async fn upload_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        content: &[u8],
        progress: &ProgressIndicator,
    ) -> Result<()> {
        let Some(member) = attributes.as_member() else {
            return Err(wrong_kind(Self::KIND, attributes));
        };
        let parent = context.parent_attributes(attributes)?;
        let Some(library) = parent.as_dataset() else {
            return Err(Error::missing_metadata("Virtual file is not a library"));
        };
        let (library_name, member_name) = (library.info.dsname.as_str(), member.info.name.as_str());
        let target = format!("{library_name}({member_name})");
        first_successful(&library.requesters, &target, |requester| async move {
            let connection = requester.connection();
            let credentials = context.credentials_for(connection).await?;
            let api = context.api().data_api(connection)?;
            progress
                .run(async {
                    api.write_member(
                        &credentials,
                        library_name,
                        member_name,
                        Bytes::copy_from_slice(content),
                    )
                    .await
                    .or_call_failed(format!("Cannot upload data to {library_name}({member_name})"))
                })
                .await
        })
        .await
    }
}

/// Spool files, reached through the requesters of their job. Read only.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpoolFileContentIo;

#[async_trait]
impl RemoteContentIo for SpoolFileContentIo {
    const KIND: AttributesKind = AttributesKind::SpoolFile;
    const NAME: &'static str = "spool-file";

    async fn fetch_remote_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        progress: &ProgressIndicator,
    ) -> Result<Vec<u8>> {
        let Some(spool) = attributes.as_spool_file() else {
            return Err(wrong_kind(Self::KIND, attributes));
        };
        let parent = context.parent_attributes(attributes)?;
        let Some(job) = parent.as_job() else {
            return Err(Error::missing_metadata("Virtual file is not a job"));
        };
        let (job_name, job_id) = (job.info.job_name.as_str(), job.info.job_id.as_str());
        let file_id = spool.info.id;
        let target = format!("{}({})", parent.name(), attributes.name());
        let bytes = first_successful(&job.requesters, &target, |requester| {
            let target = &target;
            async move {
                let connection = requester.connection();
                let credentials = context.credentials_for(connection).await?;
                let api = context.api().jes_api(connection)?;
                progress
                    .run(async {
                        api.spool_file_records(&credentials, job_name, job_id, file_id)
                            .await
                            .or_call_failed(format!("Cannot fetch data from {target}"))
                    })
                    .await
            }
        })
        .await?;
        Ok(bytes.to_vec())
    }

    async fn upload_content(
        &self,
        _context: &DataOpsContext,
        _attributes: &FileAttributes,
        _content: &[u8],
        _progress: &ProgressIndicator,
    ) -> Result<()> {
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        true
    }
}
