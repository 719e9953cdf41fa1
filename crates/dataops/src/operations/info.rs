use super::{
    Operation, OperationKind, OperationOutput, OperationRunner, RemoteOperation, mismatch,
    unexpected_output,
};
use crate::api::ApiError;
use crate::api::model::SystemsResponse;
use crate::context::DataOpsContext;
use async_trait::async_trait;
use formainframe_core::{ConnectionConfig, Error, ProgressIndicator, Result};
use std::sync::Arc;

/// Ask z/OSMF for its systems; used to test a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoOperation {
    /// Connection to test.
    pub connection: ConnectionConfig,
}

impl InfoOperation {
    /// Test `connection`.
    #[must_use]
    pub const fn new(connection: ConnectionConfig) -> Self {
        Self { connection }
    }
}

impl From<InfoOperation> for Operation {
    fn from(op: InfoOperation) -> Self {
        Self::Info(op)
    }
}

impl RemoteOperation for InfoOperation {
    type Output = SystemsResponse;

    fn extract(output: OperationOutput) -> Result<Self::Output> {
        match output {
            OperationOutput::Systems(systems) => Ok(systems),
            other => Err(unexpected_output(&other)),
        }
    }
}

/// Runs [`InfoOperation`].
#[derive(Debug)]
pub struct InfoOperationRunner {
    context: Arc<DataOpsContext>,
}

impl InfoOperationRunner {
    /// Runner over `context`.
    #[must_use]
    pub const fn new(context: Arc<DataOpsContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl OperationRunner for InfoOperationRunner {
    fn name(&self) -> &'static str {
        "info"
    }

    fn operation_kind(&self) -> OperationKind {
        OperationKind::Info
    }

    fn can_run(&self, operation: &Operation) -> bool {
        matches!(operation, Operation::Info(_))
    }

    async fn run(&self, operation: &Operation, progress: &ProgressIndicator) -> Result<OperationOutput> {
        let Operation::Info(op) = operation else {
            return Err(mismatch(self.name(), operation));
        };
        let credentials = self.context.credentials_for(&op.connection).await?;
        let api = self.context.api().systems_api(&op.connection)?;
        let result = progress
            .run(async { Ok(api.systems(&credentials).await) })
            .await?;
        match result {
            Ok(systems) => Ok(OperationOutput::Systems(systems)),
            Err(ApiError::Status(response)) => {
                tracing::info!(status = response.status, "Test connection failed");
                let message = response.body.trim();
                let message = if message.is_empty() {
                    "Unauthorized".to_string()
                } else {
                    message.to_string()
                };
                Err(Error::call_failed(message, Some(response)))
            }
            Err(ApiError::Transport(reason)) => Err(Error::transport(reason)),
        }
    }
}
