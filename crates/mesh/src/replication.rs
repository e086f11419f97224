//! Adaptive replication — spec.md §4.4.
//!
//! Target replica count for a chunk is a size-bucketed base, scaled up by
//! observed demand, clamped to the configured `[min_replicas, max_replicas]`
//! window.

use inos_events::{ContentHash, PeerId};

use crate::demand::DemandTracker;

/// Monotonically increasing base replica count by chunk size in bytes.
fn size_bucket(size_bytes: u64) -> u32 {
    match size_bytes {
        0..=65_536 => 1,
        65_537..=1_048_576 => 2,
        1_048_577..=16_777_216 => 3,
        _ => 4,
    }
}

/// Computes the target replica count for a chunk of `size_bytes`, scaled by
/// `demand` in `[0, 1]`, within `[min_replicas, max_replicas]`.
pub fn target_replicas(
    size_bytes: u64,
    demand: f64,
    demand_scaling: f64,
    min_replicas: u32,
    max_replicas: u32,
) -> u32 {
    let base = size_bucket(size_bytes).clamp(min_replicas, max_replicas) as f64;
    let scaled = base * (1.0 + demand_scaling * demand);
    (scaled.round() as u32).clamp(min_replicas, max_replicas)
}

/// A chunk found under-replicated by a self-heal sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationTask {
    pub hash: ContentHash,
    pub current: Vec<PeerId>,
    pub target_count: u32,
}

/// Scans cached chunk entries and emits [`ReplicationTask`]s for chunks
/// whose current replica count falls short of their demand-scaled target.
pub struct ReplicationPlanner {
    demand_scaling: f64,
    min_replicas: u32,
    max_replicas: u32,
}

impl ReplicationPlanner {
    pub fn new(demand_scaling: f64, min_replicas: u32, max_replicas: u32) -> Self {
        Self {
            demand_scaling,
            min_replicas,
            max_replicas,
        }
    }

    /// Evaluates one chunk. Returns `None` if it's already adequately
    /// replicated.
    pub fn evaluate(
        &self,
        hash: ContentHash,
        size_bytes: u64,
        current_peers: &[PeerId],
        demand: &DemandTracker,
    ) -> Option<ReplicationTask> {
        let score = demand.score(&hash);
        let target = target_replicas(
            size_bytes,
            score,
            self.demand_scaling,
            self.min_replicas,
            self.max_replicas,
        );
        if (current_peers.len() as u32) < target {
            Some(ReplicationTask {
                hash,
                current: current_peers.to_vec(),
                target_count: target,
            })
        } else {
            None
        }
    }
}
