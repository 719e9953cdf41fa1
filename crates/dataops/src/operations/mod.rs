//! Typed remote operations and the runners executing them.
//!
//! An [`Operation`] is a plain value describing one remote action. The
//! manager hands it to the first registered [`OperationRunner`] whose
//! [`OperationRunner::operation_kind`] matches and whose
//! [`OperationRunner::can_run`] accepts it. Several runners may serve the
//! same kind, e.g. purging a job by name or by correlator.

mod delete;
mod info;
mod purge;
mod tag;

pub use delete::{DeleteOperation, DeleteOperationRunner};
pub use info::{InfoOperation, InfoOperationRunner};
pub use purge::{
    BasicPurgeJobParams, BasicPurgeJobRunner, CorrelatorPurgeJobParams, CorrelatorPurgeJobRunner,
    PurgeJobOperation, PurgeJobParams,
};
pub use tag::{ChangeFileTagOperation, ChangeFileTagRunner};

use crate::api::model::{FileTagList, SystemsResponse};
use async_trait::async_trait;
use formainframe_core::{Error, ProgressIndicator, Result};
use std::fmt;

/// Kind of an [`Operation`], used to group runners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Connection test.
    Info,
    /// Job purge.
    PurgeJob,
    /// USS file tag change.
    ChangeFileTag,
    /// Resource deletion.
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::PurgeJob => "purge-job",
            Self::ChangeFileTag => "change-file-tag",
            Self::Delete => "delete",
        })
    }
}

/// A remote action together with what it acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Connection test.
    Info(InfoOperation),
    /// Job purge.
    PurgeJob(PurgeJobOperation),
    /// USS file tag change.
    ChangeFileTag(ChangeFileTagOperation),
    /// Resource deletion.
    Delete(DeleteOperation),
}

impl Operation {
    /// Kind tag.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Info(_) => OperationKind::Info,
            Self::PurgeJob(_) => OperationKind::PurgeJob,
            Self::ChangeFileTag(_) => OperationKind::ChangeFileTag,
            Self::Delete(_) => OperationKind::Delete,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info(op) => write!(f, "info on {}", op.connection.name),
            Self::PurgeJob(op) => write!(f, "purge {} on {}", op.params, op.connection.name),
            Self::ChangeFileTag(op) => {
                write!(f, "chtag {:?} {} on {}", op.action, op.path, op.connection.name)
            }
            Self::Delete(op) => write!(f, "delete {}", op.attributes),
        }
    }
}

/// Result of running an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    /// Nothing to return.
    Unit,
    /// Systems reported by z/OSMF.
    Systems(SystemsResponse),
    /// File tag listing, `None` for set and remove.
    FileTags(Option<FileTagList>),
}

/// An operation value with a statically known result type.
pub trait RemoteOperation: Into<Operation> {
    /// Result of the operation.
    type Output;

    /// Extract the typed result.
    ///
    /// # Errors
    ///
    /// Fails when the runner returned output of another shape.
    fn extract(output: OperationOutput) -> Result<Self::Output>;
}

/// Executes operations of one kind.
#[async_trait]
pub trait OperationRunner: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Kind of operations served.
    fn operation_kind(&self) -> OperationKind;

    /// Whether this runner handles `operation`. Pure.
    fn can_run(&self, operation: &Operation) -> bool;

    /// Run `operation`, aborting when `progress` is cancelled.
    ///
    /// # Errors
    ///
    /// Fails with a call failure, a transport error or cancellation.
    async fn run(&self, operation: &Operation, progress: &ProgressIndicator) -> Result<OperationOutput>;
}

pub(crate) fn mismatch(runner: &str, operation: &Operation) -> Error {
    Error::unsupported(format!("{runner} cannot run {}", operation.kind()))
}

pub(crate) fn unexpected_output(output: &OperationOutput) -> Error {
    Error::validation(format!("unexpected operation output {output:?}"))
}
