use super::{
    Operation, OperationKind, OperationOutput, OperationRunner, RemoteOperation, mismatch,
    unexpected_output,
};
use crate::api::ApiResultExt;
use crate::attributes::FileAttributes;
use crate::context::DataOpsContext;
use crate::file::MfVirtualFile;
use crate::requesters::first_successful;
use async_trait::async_trait;
use formainframe_core::{Error, ProgressIndicator, Result};
use std::sync::Arc;

/// Delete the remote resource behind a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOperation {
    /// Handle of the resource.
    pub file: MfVirtualFile,
    /// Its attributes.
    pub attributes: FileAttributes,
}

impl DeleteOperation {
    /// Delete `file`.
    #[must_use]
    pub const fn new(file: MfVirtualFile, attributes: FileAttributes) -> Self {
        Self { file, attributes }
    }
}

impl From<DeleteOperation> for Operation {
    fn from(op: DeleteOperation) -> Self {
        Self::Delete(op)
    }
}

impl RemoteOperation for DeleteOperation {
    type Output = ();

    fn extract(output: OperationOutput) -> Result<Self::Output> {
        match output {
            OperationOutput::Unit => Ok(()),
            other => Err(unexpected_output(&other)),
        }
    }
}

/// Deletes datasets, members and USS files or directories.
///
/// Each requester of the resource (of the library, for members) is tried in
/// turn; the handle's attributes are cleared after the first success.
#[derive(Debug)]
pub struct DeleteOperationRunner {
    context: Arc<DataOpsContext>,
}

impl DeleteOperationRunner {
    /// Runner over `context`.
    #[must_use]
    pub const fn new(context: Arc<DataOpsContext>) -> Self {
        Self { context }
    }

    async fn delete(&self, attributes: &FileAttributes, progress: &ProgressIndicator) -> Result<()> {
        let context = &self.context;
        match attributes {
            FileAttributes::Dataset(dataset) => {
                let name = dataset.info.dsname.as_str();
                first_successful(&dataset.requesters, name, |requester| async move {
                    let connection = requester.connection();
                    let credentials = context.credentials_for(connection).await?;
                    let api = context.api().data_api(connection)?;
                    progress
                        .run(async {
                            api.delete_dataset(&credentials, name)
                                .await
                                .or_call_failed("Cannot delete data set")
                        })
                        .await
                })
                .await
            }
            FileAttributes::Member(member) => {
                let library = context.parent_attributes(attributes)?;
                let Some(library_info) = library.as_dataset().map(|l| &l.info) else {
                    return Err(Error::missing_metadata("Virtual file is not a library"));
                };
                let target = format!("{}({})", library_info.dsname, member.info.name);
                first_successful(library.requesters(), &target, |requester| async move {
                    let connection = requester.connection();
                    let credentials = context.credentials_for(connection).await?;
                    let api = context.api().data_api(connection)?;
                    progress
                        .run(async {
                            api.delete_member(&credentials, &library_info.dsname, &member.info.name)
                                .await
                                .or_call_failed("Cannot delete data set member")
                        })
                        .await
                })
                .await
            }
            FileAttributes::Uss(uss) => {
                first_successful(&uss.requesters, &uss.path, |requester| async move {
                    let connection = requester.connection();
                    let credentials = context.credentials_for(connection).await?;
                    let api = context.api().data_api(connection)?;
                    progress
                        .run(async {
                            api.delete_uss(&credentials, &uss.path, uss.is_directory)
                                .await
                                .or_call_failed("Cannot delete USS File/Directory")
                        })
                        .await
                })
                .await
            }
            FileAttributes::Job(_) | FileAttributes::SpoolFile(_) => {
                Err(Error::unsupported(format!("delete of {attributes}")))
            }
        }
    }
}

#[async_trait]
impl OperationRunner for DeleteOperationRunner {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn operation_kind(&self) -> OperationKind {
        OperationKind::Delete
    }

    fn can_run(&self, operation: &Operation) -> bool {
        let Operation::Delete(op) = operation else {
            return false;
        };
        match &op.attributes {
            FileAttributes::Dataset(dataset) => dataset.info.dsorg.is_some(),
            FileAttributes::Member(_) | FileAttributes::Uss(_) => true,
            FileAttributes::Job(_) | FileAttributes::SpoolFile(_) => false,
        }
    }

    async fn run(&self, operation: &Operation, progress: &ProgressIndicator) -> Result<OperationOutput> {
        let Operation::Delete(op) = operation else {
            return Err(mismatch(self.name(), operation));
        };
        self.delete(&op.attributes, progress).await?;
        let service = self.context.attributes_service(op.attributes.kind())?;
        service.clear_attributes(&op.file);
        tracing::info!(file = %op.file, "Deleted");
        Ok(OperationOutput::Unit)
    }
}
