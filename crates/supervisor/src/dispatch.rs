//! Job dispatch algorithm — spec.md §4.3.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use inos_events::{DelegateOperation, DelegateRequest, DelegationStatus, JobEnvelope, JobResult, JobStatus, UnitId};
use inos_mesh::Delegator;

use crate::error::JobError;
use crate::ledger::Ledger;
use crate::registry::UnitRegistry;

/// Anything capable of running a job envelope against a concrete local
/// unit. The dispatcher itself only decides routing; the actual hot-loop
/// execution (writing to the kernel inbox ring, waiting on the matching
/// epoch, reading the result back out) is the caller's responsibility,
/// following spec.md §4.3 step 4's split of "dispatch decides, unit runs".
pub trait LocalExecutor {
    fn execute(&mut self, unit: &UnitId, envelope: &JobEnvelope) -> Result<Vec<u8>, JobError>;
}

/// Bounds the job-history memoization window — spec.md §4.3's "duplicate
/// jobId submissions observe the first result."
const JOB_HISTORY_CAPACITY: usize = 4096;

pub struct Dispatcher {
    registry: UnitRegistry,
    ledger: Ledger,
    history: HashMap<String, JobResult>,
    history_order: std::collections::VecDeque<String>,
}

impl Dispatcher {
    pub fn new(ledger_starting_balance: i64) -> Self {
        Self {
            registry: UnitRegistry::new(),
            ledger: Ledger::new(ledger_starting_balance),
            history: HashMap::new(),
            history_order: std::collections::VecDeque::new(),
        }
    }

    pub fn registry(&mut self) -> &mut UnitRegistry {
        &mut self.registry
    }

    /// Dispatches `envelope` for `caller_id`'s ledger, running local jobs
    /// through `executor` and delegating unsupported ones through
    /// `delegator`. Implements spec.md §4.3's six-step algorithm.
    pub fn dispatch(
        &mut self,
        caller_id: &str,
        envelope: JobEnvelope,
        executor: &mut impl LocalExecutor,
        delegator: &mut impl Delegator,
    ) -> JobResult {
        if let Some(prior) = self.history.get(&envelope.job_id) {
            return prior.clone();
        }

        if let Err(e) = validate(&envelope) {
            return self.remember(JobResult::failure(&envelope.job_id, JobStatus::InvalidParams, e.to_string(), false));
        }

        if envelope.budget == 0 {
            return self.remember(JobResult::failure(
                &envelope.job_id,
                JobStatus::BudgetExceeded,
                "job submitted with zero budget",
                false,
            ));
        }

        if let Err(e) = self.ledger.debit(caller_id, envelope.budget) {
            return self.remember(JobResult::failure(
                &envelope.job_id,
                JobStatus::BudgetExceeded,
                e.to_string(),
                false,
            ));
        }

        let started = Instant::now();
        let deadline = Duration::from_millis(envelope.timeout_ms);

        let route = self
            .registry
            .find_capable(&envelope.library, &envelope.method)
            .cloned();

        let result = match route {
            Some(unit) => self.run_local(&unit, &envelope, executor, started, deadline),
            None => self.run_delegated(&envelope, delegator),
        };

        if !result.is_success() {
            // Refund the full budget on failure; partial consumption is
            // only ever `result.cost` on success.
            self.ledger.credit(caller_id, envelope.budget);
        } else if result.cost < envelope.budget {
            self.ledger.credit(caller_id, envelope.budget - result.cost);
        }

        self.remember(result)
    }

    fn run_local(
        &mut self,
        unit: &UnitId,
        envelope: &JobEnvelope,
        executor: &mut impl LocalExecutor,
        started: Instant,
        deadline: Duration,
    ) -> JobResult {
        self.registry.mark_running(unit);
        if started.elapsed() > deadline {
            return JobResult::failure(&envelope.job_id, JobStatus::Timeout, "deadline exceeded before dispatch", true);
        }
        match executor.execute(unit, envelope) {
            Ok(output) => JobResult::success(
                &envelope.job_id,
                output,
                envelope.budget,
                started.elapsed().as_nanos() as u64,
            ),
            Err(JobError::Timeout) => {
                JobResult::failure(&envelope.job_id, JobStatus::Timeout, "unit did not respond before timeout", true)
            }
            Err(e) => JobResult::failure(&envelope.job_id, JobStatus::Failed, e.to_string(), true),
        }
    }

    fn run_delegated(&mut self, envelope: &JobEnvelope, delegator: &mut impl Delegator) -> JobResult {
        let request = DelegateRequest {
            id: envelope.job_id.clone(),
            operation: DelegateOperation::Custom,
            params: envelope.params.clone(),
            deadline_unix_ms: envelope.timeout_ms,
            bid: envelope.budget,
            priority: envelope.priority,
        };
        match delegator.delegate(request) {
            Ok(response) => match response.status {
                DelegationStatus::Success => {
                    JobResult::success(&envelope.job_id, response.output, envelope.budget, 0)
                }
                DelegationStatus::InputMissing => {
                    JobResult::failure(&envelope.job_id, JobStatus::Failed, "input missing on delegate peer", true)
                }
                DelegationStatus::CapacityExceeded => {
                    JobResult::failure(&envelope.job_id, JobStatus::Failed, "delegate peer over capacity", true)
                }
                DelegationStatus::Timeout => {
                    JobResult::failure(&envelope.job_id, JobStatus::Timeout, "delegated job timed out", true)
                }
                DelegationStatus::Failed | DelegationStatus::VerificationFailed => {
                    JobResult::failure(&envelope.job_id, JobStatus::Failed, "delegated job failed", false)
                }
            },
            Err(_) => JobResult::failure(&envelope.job_id, JobStatus::Failed, "no delegate peer available", true),
        }
    }

    fn remember(&mut self, result: JobResult) -> JobResult {
        if self.history_order.len() >= JOB_HISTORY_CAPACITY {
            if let Some(oldest) = self.history_order.pop_front() {
                self.history.remove(&oldest);
            }
        }
        self.history_order.push_back(result.job_id.clone());
        self.history.insert(result.job_id.clone(), result.clone());
        result
    }
}

fn validate(envelope: &JobEnvelope) -> Result<(), JobError> {
    if envelope.job_id.is_empty() {
        return Err(JobError::InvalidParams("job_id is empty".into()));
    }
    if envelope.library.is_empty() || envelope.method.is_empty() {
        return Err(JobError::InvalidParams("library/method must be set".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inos_events::JobMetadata;

    struct AlwaysSucceeds;
    impl LocalExecutor for AlwaysSucceeds {
        fn execute(&mut self, _unit: &UnitId, _envelope: &JobEnvelope) -> Result<Vec<u8>, JobError> {
            Ok(vec![1, 2, 3])
        }
    }

    struct NoPeers;
    impl Delegator for NoPeers {
        fn delegate(&mut self, _request: DelegateRequest) -> Result<inos_events::DelegateResponse, inos_mesh::MeshError> {
            Err(inos_mesh::MeshError::InsufficientPeers)
        }
    }

    fn envelope(job_id: &str, budget: u64) -> JobEnvelope {
        JobEnvelope {
            job_id: job_id.into(),
            library: "image".into(),
            method: "resize".into(),
            input: vec![0; 16],
            params: vec![],
            budget,
            priority: 1,
            timeout_ms: 200,
            metadata: JobMetadata::default(),
        }
    }

    #[test]
    fn local_job_succeeds_when_a_unit_advertises_the_capability() {
        let mut d = Dispatcher::new(1_000);
        d.registry().register(UnitId("u1".into()), vec!["image:resize".into()], 4);
        let mut exec = AlwaysSucceeds;
        let mut deleg = NoPeers;
        let result = d.dispatch("caller", envelope("j1", 10), &mut exec, &mut deleg);
        assert!(result.is_success());
    }

    #[test]
    fn zero_budget_never_invokes_any_unit() {
        let mut d = Dispatcher::new(0);
        d.registry().register(UnitId("u1".into()), vec!["image:resize".into()], 4);
        let mut exec = AlwaysSucceeds;
        let mut deleg = NoPeers;
        let result = d.dispatch("caller", envelope("j2", 0), &mut exec, &mut deleg);
        assert_eq!(result.status, JobStatus::BudgetExceeded);
    }

    #[test]
    fn duplicate_job_id_returns_the_memoized_result() {
        let mut d = Dispatcher::new(1_000);
        d.registry().register(UnitId("u1".into()), vec!["image:resize".into()], 4);
        let mut exec = AlwaysSucceeds;
        let mut deleg = NoPeers;
        let first = d.dispatch("caller", envelope("j3", 10), &mut exec, &mut deleg);
        let second = d.dispatch("caller", envelope("j3", 10), &mut exec, &mut deleg);
        assert_eq!(first.execution_time_ns, second.execution_time_ns);
    }
}
