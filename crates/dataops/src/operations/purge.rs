use super::{
    Operation, OperationKind, OperationOutput, OperationRunner, RemoteOperation, mismatch,
    unexpected_output,
};
use crate::api::ApiResultExt;
use crate::context::DataOpsContext;
use async_trait::async_trait;
use formainframe_core::{ConnectionConfig, ProgressIndicator, Result};
use std::fmt;
use std::sync::Arc;

/// Purge by job name and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicPurgeJobParams {
    /// Job name.
    pub job_name: String,
    /// Job id.
    pub job_id: String,
}

/// Purge by job correlator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelatorPurgeJobParams {
    /// Job correlator.
    pub correlator: String,
}

/// Which job to purge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PurgeJobParams {
    /// By name and id.
    Basic(BasicPurgeJobParams),
    /// By correlator.
    Correlator(CorrelatorPurgeJobParams),
}

impl fmt::Display for PurgeJobParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(p) => write!(f, "{}({})", p.job_name, p.job_id),
            Self::Correlator(p) => f.write_str(&p.correlator),
        }
    }
}

/// Remove a job and its output from JES.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeJobOperation {
    /// Job to purge.
    pub params: PurgeJobParams,
    /// Connection the job lives on.
    pub connection: ConnectionConfig,
}

impl PurgeJobOperation {
    /// Purge `job_name`/`job_id`.
    #[must_use]
    pub fn by_name(
        job_name: impl Into<String>,
        job_id: impl Into<String>,
        connection: ConnectionConfig,
    ) -> Self {
        Self {
            params: PurgeJobParams::Basic(BasicPurgeJobParams {
                job_name: job_name.into(),
                job_id: job_id.into(),
            }),
            connection,
        }
    }

    /// Purge the job with `correlator`.
    #[must_use]
    pub fn by_correlator(correlator: impl Into<String>, connection: ConnectionConfig) -> Self {
        Self {
            params: PurgeJobParams::Correlator(CorrelatorPurgeJobParams {
                correlator: correlator.into(),
            }),
            connection,
        }
    }

    fn failure_message(&self) -> String {
        format!("Cannot purge job on {}", self.connection.name)
    }
}

impl From<PurgeJobOperation> for Operation {
    fn from(op: PurgeJobOperation) -> Self {
        Self::PurgeJob(op)
    }
}

impl RemoteOperation for PurgeJobOperation {
    type Output = ();

    fn extract(output: OperationOutput) -> Result<Self::Output> {
        match output {
            OperationOutput::Unit => Ok(()),
            other => Err(unexpected_output(&other)),
        }
    }
}

/// Purges jobs identified by name and id.
#[derive(Debug)]
pub struct BasicPurgeJobRunner {
    context: Arc<DataOpsContext>,
}

impl BasicPurgeJobRunner {
    /// Runner over `context`.
    #[must_use]
    pub const fn new(context: Arc<DataOpsContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl OperationRunner for BasicPurgeJobRunner {
    fn name(&self) -> &'static str {
        "purge-job-basic"
    }

    fn operation_kind(&self) -> OperationKind {
        OperationKind::PurgeJob
    }

    fn can_run(&self, operation: &Operation) -> bool {
        matches!(
            operation,
            Operation::PurgeJob(PurgeJobOperation {
                params: PurgeJobParams::Basic(_),
                ..
            })
        )
    }

    async fn run(&self, operation: &Operation, progress: &ProgressIndicator) -> Result<OperationOutput> {
        let Operation::PurgeJob(op @ PurgeJobOperation {
            params: PurgeJobParams::Basic(params),
            ..
        }) = operation
        else {
            return Err(mismatch(self.name(), operation));
        };
        let credentials = self.context.credentials_for(&op.connection).await?;
        let api = self.context.api().jes_api(&op.connection)?;
        progress
            .run(async {
                api.purge_job(&credentials, &params.job_name, &params.job_id)
                    .await
                    .or_call_failed(op.failure_message())
            })
            .await?;
        tracing::info!(job = %op.params, "Job purged");
        Ok(OperationOutput::Unit)
    }
}

/// Purges jobs identified by correlator.
#[derive(Debug)]
pub struct CorrelatorPurgeJobRunner {
    context: Arc<DataOpsContext>,
}

impl CorrelatorPurgeJobRunner {
    /// Runner over `context`.
    #[must_use]
    pub const fn new(context: Arc<DataOpsContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl OperationRunner for CorrelatorPurgeJobRunner {
    fn name(&self) -> &'static str {
        "purge-job-correlator"
    }

    fn operation_kind(&self) -> OperationKind {
        OperationKind::PurgeJob
    }

    fn can_run(&self, operation: &Operation) -> bool {
        matches!(
            operation,
            Operation::PurgeJob(PurgeJobOperation {
                params: PurgeJobParams::Correlator(_),
                ..
            })
        )
    }

    async fn run(&self, operation: &Operation, progress: &ProgressIndicator) -> Result<OperationOutput> {
        let Operation::PurgeJob(op @ PurgeJobOperation {
            params: PurgeJobParams::Correlator(params),
            ..
        }) = operation
        else {
            return Err(mismatch(self.name(), operation));
        };
        let credentials = self.context.credentials_for(&op.connection).await?;
        let api = self.context.api().jes_api(&op.connection)?;
        progress
            .run(async {
                api.purge_job_by_correlator(&credentials, &params.correlator)
                    .await
                    .or_call_failed(op.failure_message())
            })
            .await?;
        tracing::info!(job = %op.params, "Job purged");
        Ok(OperationOutput::Unit)
    }
}
