//! `inos-supervisor`: the Supervisor unit — spec.md §4.2/§4.3.
//!
//! Owns the Unit Registry, the credit ledger, and the job-dispatch
//! algorithm in [`dispatch::Dispatcher`], and drives them off the fabric's
//! Inbox/Host Outbox/Kernel Outbox rings. Generalizes `obsidian_engine`'s
//! single poll-loop-over-a-channel shape to dispatch-over-a-fixed-capacity-
//! ring, the way `bins/onyx`'s wall-clock loop generalizes into
//! [`inos_physics::PhysicsUnit::run`].

pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod registry;

use std::time::Duration;

use inos_bridge::Bridge;
use inos_config::SupervisorConfig;
use inos_events::{JobEnvelope, JobResult};
use inos_fabric::layout::{self, slot};
use inos_fabric::{Ring, RegionId};

pub use dispatch::{Dispatcher, LocalExecutor};
pub use error::{JobError, SupervisorError};
pub use ledger::Ledger;
pub use registry::{UnitEntry, UnitRegistry, UnitState};

/// Cooperative poll interval for [`Supervisor::run`], matching
/// [`inos_fabric::atomic_index`]'s "no OS futex, poll instead" discipline.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Drives the job-dispatch loop over the shared-memory fabric: reads
/// [`JobEnvelope`]s from the Inbox ring, dispatches them through
/// [`Dispatcher`], and writes [`JobResult`]s to the Host Outbox ring.
/// Kernel-originated events (unit lifecycle transitions, panics) go out
/// the Kernel Outbox ring via [`Supervisor::publish_kernel_event`].
pub struct Supervisor {
    bridge: Bridge,
    dispatcher: Dispatcher,
    inbox: Ring,
    host_outbox: Ring,
    kernel_outbox: Ring,
    outbox_high_water_pct: u8,
}

impl Supervisor {
    pub fn new(mut bridge: Bridge, config: &SupervisorConfig) -> Self {
        let fabric = bridge.fabric_mut();
        let inbox = fabric.ring(
            RegionId::Inbox,
            RegionId::InboxReady,
            slot::INBOX_HEAD,
            slot::INBOX_TAIL,
            layout::INBOX_SLOT_BYTES,
        );
        let host_outbox = fabric.ring(
            RegionId::HostOutbox,
            RegionId::HostOutboxReady,
            slot::HOST_OUTBOX_HEAD,
            slot::HOST_OUTBOX_TAIL,
            layout::HOST_OUTBOX_SLOT_BYTES,
        );
        let kernel_outbox = fabric.ring(
            RegionId::KernelOutbox,
            RegionId::KernelOutboxReady,
            slot::KERNEL_OUTBOX_HEAD,
            slot::KERNEL_OUTBOX_TAIL,
            layout::KERNEL_OUTBOX_SLOT_BYTES,
        );
        Self {
            bridge,
            dispatcher: Dispatcher::new(config.ledger_starting_balance),
            inbox,
            host_outbox,
            kernel_outbox,
            outbox_high_water_pct: config.outbox_high_water_pct,
        }
    }

    pub fn registry(&mut self) -> &mut UnitRegistry {
        self.dispatcher.registry()
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Marks the fabric as ready for worker units to begin reading it —
    /// spec.md §3's `KERNEL_READY` slot, set once by the Supervisor after
    /// every region is guarded and every ring is constructed.
    pub fn mark_ready(&self) -> Result<(), SupervisorError> {
        self.bridge
            .atomic_store(slot::KERNEL_READY, 1)
            .map_err(SupervisorError::from)
    }

    /// Submits a job envelope onto the Inbox ring, as an external host
    /// ingress process would. Serializes as JSON; a job envelope whose
    /// serialized form exceeds the ring's slot budget is rejected rather
    /// than silently truncated (spec.md leaves the inbox wire format out
    /// of scope beyond "fixed-size slots", so this is the deliberate
    /// simplification — see `inos_mesh::transport` for the same tradeoff
    /// on the mesh side).
    pub fn submit(&mut self, envelope: &JobEnvelope) -> Result<(), SupervisorError> {
        let bytes = serde_json::to_vec(envelope)?;
        if bytes.len() > layout::INBOX_SLOT_BYTES {
            return Err(SupervisorError::PayloadTooLarge {
                len: bytes.len(),
                limit: layout::INBOX_SLOT_BYTES,
            });
        }
        self.inbox.produce(&bytes)?;
        self.bridge.atomic_add(slot::INBOX_DIRTY, 1);
        Ok(())
    }

    /// Dispatches the next queued job, if any, applying the configured
    /// outbox high-water backpressure: while the Host Outbox is at or
    /// above `outbox_high_water_pct` full, new jobs are left on the Inbox
    /// ring rather than dispatched, so a slow host consumer can't cause
    /// outbox overwrites.
    pub fn poll_once(
        &mut self,
        executor: &mut impl LocalExecutor,
        delegator: &mut impl inos_mesh::Delegator,
    ) -> Option<JobResult> {
        if self.outbox_at_high_water() {
            return None;
        }
        let mut buf = vec![0u8; layout::INBOX_SLOT_BYTES];
        let n = self.inbox.consume(&mut buf).ok()?;
        let envelope: JobEnvelope = serde_json::from_slice(&buf[..n]).ok()?;
        let caller_id = envelope
            .metadata
            .user
            .clone()
            .unwrap_or_else(|| "host".to_string());
        let result = self.dispatcher.dispatch(&caller_id, envelope, executor, delegator);
        self.publish_result(&result);
        Some(result)
    }

    fn outbox_at_high_water(&self) -> bool {
        let occupied = self.host_outbox.len();
        let capacity = self.host_outbox.capacity().max(1);
        (occupied * 100) / capacity >= self.outbox_high_water_pct as usize
    }

    fn publish_result(&mut self, result: &JobResult) {
        match serde_json::to_vec(result) {
            Ok(bytes) if bytes.len() <= layout::HOST_OUTBOX_SLOT_BYTES => {
                if self.host_outbox.produce(&bytes).is_ok() {
                    self.bridge.atomic_add(slot::HOST_OUTBOX_DIRTY, 1);
                } else {
                    tracing::warn!(job_id = %result.job_id, "host outbox full, dropping result");
                }
            }
            Ok(bytes) => tracing::error!(
                job_id = %result.job_id,
                len = bytes.len(),
                "job result exceeds host outbox slot budget"
            ),
            Err(error) => tracing::error!(job_id = %result.job_id, %error, "failed to serialize job result"),
        }
    }

    /// Reads the next result off the Host Outbox, as the external host
    /// ingress process would.
    pub fn poll_host_outbox(&self) -> Option<JobResult> {
        let mut buf = vec![0u8; layout::HOST_OUTBOX_SLOT_BYTES];
        let n = self.host_outbox.consume(&mut buf).ok()?;
        serde_json::from_slice(&buf[..n]).ok()
    }

    /// Publishes a raw kernel event (unit lifecycle transition, panic
    /// notice) onto the Kernel Outbox ring.
    pub fn publish_kernel_event(&mut self, bytes: &[u8]) -> Result<(), SupervisorError> {
        if bytes.len() > layout::KERNEL_OUTBOX_SLOT_BYTES {
            return Err(SupervisorError::PayloadTooLarge {
                len: bytes.len(),
                limit: layout::KERNEL_OUTBOX_SLOT_BYTES,
            });
        }
        self.kernel_outbox.produce(bytes)?;
        self.bridge.atomic_add(slot::KERNEL_OUTBOX_DIRTY, 1);
        Ok(())
    }

    /// Runs the dispatch loop until `should_stop` returns true, waiting on
    /// the Inbox-dirty slot between polls rather than busy-spinning.
    pub fn run(
        &mut self,
        executor: &mut impl LocalExecutor,
        delegator: &mut impl inos_mesh::Delegator,
        mut should_stop: impl FnMut() -> bool,
    ) {
        loop {
            if should_stop() {
                return;
            }
            match self.poll_once(executor, delegator) {
                Some(_) => continue,
                None => {
                    let seen = self.bridge.atomic_load(slot::INBOX_DIRTY);
                    self.bridge.wait(slot::INBOX_DIRTY, seen, POLL_INTERVAL);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inos_events::{DelegateRequest, DelegateResponse, JobMetadata, JobStatus, UnitId};
    use inos_fabric::Fabric;
    use inos_mesh::{Delegator, MeshError};

    struct EchoExecutor;
    impl LocalExecutor for EchoExecutor {
        fn execute(&mut self, _unit: &UnitId, envelope: &JobEnvelope) -> Result<Vec<u8>, JobError> {
            Ok(envelope.input.clone())
        }
    }

    struct NoPeers;
    impl Delegator for NoPeers {
        fn delegate(&mut self, _request: DelegateRequest) -> Result<DelegateResponse, MeshError> {
            Err(MeshError::InsufficientPeers)
        }
    }

    fn config() -> SupervisorConfig {
        SupervisorConfig {
            ledger_starting_balance: 1_000,
            outbox_high_water_pct: 90,
        }
    }

    fn envelope(job_id: &str) -> JobEnvelope {
        JobEnvelope {
            job_id: job_id.into(),
            library: "image".into(),
            method: "resize".into(),
            input: vec![9, 9, 9],
            params: vec![],
            budget: 10,
            priority: 1,
            timeout_ms: 200,
            metadata: JobMetadata::default(),
        }
    }

    #[test]
    fn submitted_job_round_trips_through_inbox_dispatch_and_host_outbox() {
        let fabric = Fabric::create_anon().unwrap();
        let bridge = Bridge::new(fabric);
        let mut sup = Supervisor::new(bridge, &config());
        sup.registry()
            .register(UnitId("u1".into()), vec!["image:resize".into()], 4);

        sup.submit(&envelope("j1")).unwrap();
        let mut exec = EchoExecutor;
        let mut deleg = NoPeers;
        let result = sup.poll_once(&mut exec, &mut deleg).expect("job was queued");
        assert_eq!(result.status, JobStatus::Success);

        let from_outbox = sup.poll_host_outbox().expect("result should be on the outbox");
        assert_eq!(from_outbox.job_id, "j1");
    }

    #[test]
    fn empty_inbox_polls_to_none() {
        let fabric = Fabric::create_anon().unwrap();
        let bridge = Bridge::new(fabric);
        let mut sup = Supervisor::new(bridge, &config());
        let mut exec = EchoExecutor;
        let mut deleg = NoPeers;
        assert!(sup.poll_once(&mut exec, &mut deleg).is_none());
    }

    #[test]
    fn oversized_envelope_is_rejected_before_touching_the_ring() {
        let fabric = Fabric::create_anon().unwrap();
        let bridge = Bridge::new(fabric);
        let mut sup = Supervisor::new(bridge, &config());
        let mut huge = envelope("j2");
        huge.input = vec![0u8; layout::INBOX_SLOT_BYTES * 2];
        assert!(matches!(
            sup.submit(&huge),
            Err(SupervisorError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn mark_ready_flips_the_kernel_ready_slot() {
        let fabric = Fabric::create_anon().unwrap();
        let bridge = Bridge::new(fabric);
        let sup = Supervisor::new(bridge, &config());
        assert!(!sup.bridge().is_ready());
        sup.mark_ready().unwrap();
        assert!(sup.bridge().is_ready());
    }
}
