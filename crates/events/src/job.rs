//! Job envelope / result — spec.md §6.

use serde::{Deserialize, Serialize};

/// A job submitted to the Kernel Inbox. Arrives over a process boundary, so
/// it's a plain serde type rather than a fixed-stride POD struct; the
/// Supervisor copies its content-addressed `input` into the arena and only
/// the resulting offset crosses into shared memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: String,
    pub library: String,
    pub method: String,
    /// Content-addressed reference to the job's input bytes (a BLAKE3 hash
    /// the caller has already published, or staged chunk).
    pub input: Vec<u8>,
    pub params: Vec<u8>,
    pub budget: u64,
    pub priority: u8,
    pub timeout_ms: u64,
    pub metadata: JobMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobMetadata {
    pub user: Option<String>,
    pub device: Option<String>,
    pub trace: Option<String>,
}

/// Closed status set for a completed (or failed) job — spec.md §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Success,
    Failed,
    BudgetExceeded,
    Timeout,
    InvalidParams,
}

/// Written to the Host Outbox ring once a job completes (successfully or
/// not) — spec.md §4.3/§6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub status: JobStatus,
    pub output: Vec<u8>,
    pub cost: u64,
    pub execution_time_ns: u64,
    pub error: Option<String>,
    pub retryable: bool,
}

impl JobResult {
    pub fn success(job_id: impl Into<String>, output: Vec<u8>, cost: u64, execution_time_ns: u64) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Success,
            output,
            cost,
            execution_time_ns,
            error: None,
            retryable: false,
        }
    }

    pub fn failure(
        job_id: impl Into<String>,
        status: JobStatus,
        error: impl Into<String>,
        retryable: bool,
    ) -> Self {
        debug_assert_ne!(status, JobStatus::Success, "use JobResult::success instead");
        Self {
            job_id: job_id.into(),
            status,
            output: Vec::new(),
            cost: 0,
            execution_time_ns: 0,
            error: Some(error.into()),
            retryable,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_result_round_trips_through_json() {
        let r = JobResult::success("job-1", vec![1, 2, 3], 5, 1000);
        let s = serde_json::to_string(&r).unwrap();
        let back: JobResult = serde_json::from_str(&s).unwrap();
        assert_eq!(back.job_id, "job-1");
        assert!(back.is_success());
    }

    #[test]
    fn failure_result_carries_an_error_message() {
        let r = JobResult::failure("job-2", JobStatus::Timeout, "deadline exceeded", true);
        assert!(!r.is_success());
        assert_eq!(r.error.as_deref(), Some("deadline exceeded"));
        assert!(r.retryable);
    }
}
