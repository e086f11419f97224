//! Supervisor/job error kinds — spec.md §7.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("ledger '{0}' has insufficient credit for this job's budget")]
    Insufficient(String),
    #[error("job envelope failed validation: {0}")]
    InvalidParams(String),
    #[error("job exceeded its timeout before completion")]
    Timeout,
    #[error("job exceeded its budget mid-execution")]
    BudgetExceeded,
    #[error("no unit advertises the requested capability and mesh delegation is unavailable")]
    UnitUnavailable,
    #[error("job id '{0}' was already submitted; see its memoized result")]
    DuplicateJob(String),
}

/// Errors moving a job envelope or result across a fabric ring, distinct
/// from [`JobError`]'s job-processing-outcome kinds.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Fabric(#[from] inos_fabric::error::FabricError),
    #[error("failed to serialize envelope/result for the ring wire format: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("serialized payload ({len} bytes) exceeds the ring's {limit}-byte slot budget")]
    PayloadTooLarge { len: usize, limit: usize },
}
