use super::{
    Operation, OperationKind, OperationOutput, OperationRunner, RemoteOperation, mismatch,
    unexpected_output,
};
use crate::api::ApiResultExt;
use crate::api::model::{FileTagList, FileTagRequest, TagAction};
use crate::context::DataOpsContext;
use async_trait::async_trait;
use formainframe_core::{ConnectionConfig, ProgressIndicator, Result};
use std::sync::Arc;

/// List, set or remove the code set tag of a USS file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFileTagOperation {
    /// Absolute path of the file.
    pub path: String,
    /// What to do with the tag.
    pub action: TagAction,
    /// Code set for [`TagAction::Set`].
    pub codeset: Option<String>,
    /// Connection the file is reached through.
    pub connection: ConnectionConfig,
}

impl ChangeFileTagOperation {
    /// Report the tag of `path`.
    #[must_use]
    pub fn list(path: impl Into<String>, connection: ConnectionConfig) -> Self {
        Self {
            path: path.into(),
            action: TagAction::List,
            codeset: None,
            connection,
        }
    }

    /// Tag `path` as text in `codeset`.
    #[must_use]
    pub fn set(
        path: impl Into<String>,
        codeset: impl Into<String>,
        connection: ConnectionConfig,
    ) -> Self {
        Self {
            path: path.into(),
            action: TagAction::Set,
            codeset: Some(codeset.into()),
            connection,
        }
    }

    /// Untag `path`.
    #[must_use]
    pub fn remove(path: impl Into<String>, connection: ConnectionConfig) -> Self {
        Self {
            path: path.into(),
            action: TagAction::Remove,
            codeset: None,
            connection,
        }
    }

    fn failure_message(&self) -> String {
        let verb = match self.action {
            TagAction::List => "list",
            TagAction::Set => "set",
            TagAction::Remove => "remove",
        };
        format!("Cannot {verb} file tag for {}", self.path)
    }
}

impl From<ChangeFileTagOperation> for Operation {
    fn from(op: ChangeFileTagOperation) -> Self {
        Self::ChangeFileTag(op)
    }
}

impl RemoteOperation for ChangeFileTagOperation {
    type Output = Option<FileTagList>;

    fn extract(output: OperationOutput) -> Result<Self::Output> {
        match output {
            OperationOutput::FileTags(tags) => Ok(tags),
            other => Err(unexpected_output(&other)),
        }
    }
}

/// Runs [`ChangeFileTagOperation`].
#[derive(Debug)]
pub struct ChangeFileTagRunner {
    context: Arc<DataOpsContext>,
}

impl ChangeFileTagRunner {
    /// Runner over `context`.
    #[must_use]
    pub const fn new(context: Arc<DataOpsContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl OperationRunner for ChangeFileTagRunner {
    fn name(&self) -> &'static str {
        "change-file-tag"
    }

    fn operation_kind(&self) -> OperationKind {
        OperationKind::ChangeFileTag
    }

    fn can_run(&self, operation: &Operation) -> bool {
        matches!(operation, Operation::ChangeFileTag(_))
    }

    async fn run(&self, operation: &Operation, progress: &ProgressIndicator) -> Result<OperationOutput> {
        let Operation::ChangeFileTag(op) = operation else {
            return Err(mismatch(self.name(), operation));
        };
        let credentials = self.context.credentials_for(&op.connection).await?;
        let api = self.context.api().data_api(&op.connection)?;
        let request = FileTagRequest::new(op.action, op.codeset.clone());
        let tags = progress
            .run(async {
                api.change_file_tag(&credentials, &op.path, &request)
                    .await
                    .or_call_failed(op.failure_message())
            })
            .await?;
        tracing::debug!(path = %op.path, action = ?op.action, "File tag request done");
        Ok(OperationOutput::FileTags(tags))
    }
}
