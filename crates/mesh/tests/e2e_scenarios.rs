//! End-to-end mesh scenarios that cross module boundaries single-module
//! unit tests don't exercise: a tampered attestation response driving a
//! peer's reputation down, and sustained demand on a chunk driving its
//! replication target up to the configured max.

use std::time::Duration;

use ed25519_dalek::SigningKey;
use inos_events::{ConnectionState, ContentHash, Peer, PeerId};
use inos_mesh::attestation::{respond, verify, AttestationChallenge, AttestationDataSource, Window};
use inos_mesh::demand::DemandTracker;
use inos_mesh::replication::ReplicationPlanner;
use inos_mesh::{MeshError, PeerTable};
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;

struct FakeRegion(Vec<u8>);

impl AttestationDataSource for FakeRegion {
    fn read(&self, window: Window) -> Vec<u8> {
        let start = window.offset as usize;
        let end = (start + window.len as usize).min(self.0.len());
        self.0[start..end].to_vec()
    }
}

/// Scenario 5: a peer returns a signature over a tampered hash. The
/// requester's `verify` must reject it, and the caller reacts by dropping
/// the peer's reputation and marking it disconnected — the same reaction
/// spec.md §7 prescribes for reputation-implicated failures.
#[test]
fn attestation_failure_disconnects_and_drops_reputation() {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    let region = FakeRegion(vec![0xABu8; 8192]);
    let mut rng = StdRng::seed_from_u64(11);
    let challenge = AttestationChallenge::generate(
        PeerId(1),
        PeerId(7),
        1_700_000_000_000,
        region.0.len() as u64,
        &mut rng,
    );

    // The requester's own copy of the region gives it the correct expected
    // digest; the peer's response is then tampered in transit.
    let expected_digest = respond(&signing_key, &challenge, &region).digest;
    let mut response = respond(&signing_key, &challenge, &region);
    response.digest[0] ^= 0xFF;

    let mut table = PeerTable::new(0.5);
    let peer_id = PeerId(7);
    table.insert(Peer::new(peer_id, "10.0.0.7:9000"));
    table.set_state(peer_id, ConnectionState::Connected);

    let result = verify(&response, &challenge, &verifying_key, &expected_digest);
    assert_eq!(result, Err(MeshError::AttestationFailed));

    table.observe_outcome(peer_id, false);
    table.set_state(peer_id, ConnectionState::Disconnected);

    let peer = table.get(peer_id).unwrap();
    assert!(peer.reputation < 0.5, "a failed attestation must move reputation below its initial 0.5");
    assert_eq!(peer.state, ConnectionState::Disconnected);
    assert_eq!(table.connected_peers().count(), 0);
}

/// Scenario 6: register a chunk with a low replica count, drive its
/// demand score to 1.0 with 200 accesses, and confirm the planner raises
/// its replication target toward the configured max.
#[test]
fn sustained_demand_raises_the_replication_target_toward_max() {
    let demand_scaling = 2.0;
    let min_replicas = 1;
    let max_replicas = 5;
    let planner = ReplicationPlanner::new(demand_scaling, min_replicas, max_replicas);
    let mut demand = DemandTracker::new(Duration::from_secs(600));

    let hash = ContentHash([0x42u8; 32]);
    let current_peers = vec![PeerId(1)];

    let before = planner.evaluate(hash, 1 << 20, &current_peers, &demand);
    assert!(before.is_none() || before.unwrap().target_count <= min_replicas.max(1));

    for _ in 0..200 {
        demand.record_access(hash);
    }
    assert_eq!(demand.score(&hash), 1.0, "200 accesses must saturate the demand bucket");

    let task = planner
        .evaluate(hash, 1 << 20, &current_peers, &demand)
        .expect("an under-replicated, high-demand chunk must produce a replication task");
    assert_eq!(task.hash, hash);
    assert_eq!(task.current, current_peers);
    assert!(task.target_count > current_peers.len() as u32);
    assert!(task.target_count <= max_replicas);
}
