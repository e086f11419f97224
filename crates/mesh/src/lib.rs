//! `inos-mesh`: peer attestation, chunk discovery, gossip, adaptive
//! replication, and delegated-job settlement — spec.md §4.4.
//!
//! [`MeshCoordinator`] is the single-writer owner of the peer table, DHT,
//! chunk cache, and demand tracker (spec.md §5's "guarded by a
//! single-writer discipline within the Mesh Coordinator worker"); other
//! components only ever reach it through [`Delegator::delegate`] or the
//! read-only accessors, matching §9's "cyclic relationships... represented
//! by indirection through stable identifiers rather than back-pointers."

pub mod attestation;
pub mod chunk_cache;
pub mod demand;
pub mod dht;
pub mod error;
pub mod gossip;
pub mod peer;
pub mod replication;
pub mod transport;

pub use error::{DelegationError, MeshError};
pub use peer::PeerTable;
pub use transport::{ChannelHub, ChannelTransport, TcpTransport, Transport};

use std::time::{Duration, Instant};

use ed25519_dalek::SigningKey;
use inos_config::MeshConfig;
use inos_events::{
    Chunk, ConnectionState, ContentHash, DelegateOperation, DelegateRequest, DelegateResponse,
    DelegationStatus, MeshEnvelope, MeshEnvelopeMetadata, MeshEvent, MeshEventKind, Peer, PeerId,
};

use attestation::{AttestationChallenge, AttestationResponse};
use chunk_cache::ChunkCache;
use demand::DemandTracker;
use dht::{Dht, NodeId};
use gossip::{GossipDeduper, GossipMessage};
use replication::{ReplicationPlanner, ReplicationTask};

/// Anything able to settle a [`DelegateRequest`] against a peer, chosen by
/// capability and reputation — the seam `inos-supervisor`'s dispatcher
/// delegates through for step 5 of spec.md §4.3's dispatch algorithm.
pub trait Delegator {
    fn delegate(&mut self, request: DelegateRequest) -> Result<DelegateResponse, MeshError>;
}

const DELEGATE_POLL_INTERVAL: Duration = Duration::from_millis(2);
const MIN_REPUTATION_FOR_DELEGATION: f64 = 0.2;

/// Owns the peer table, DHT, chunk cache, demand tracker, and replication
/// planner, and settles delegated jobs over a [`Transport`] — spec.md §4.4.
pub struct MeshCoordinator<T: Transport> {
    local_id: PeerId,
    local_node_id: NodeId,
    signing_key: SigningKey,
    peers: PeerTable,
    dht: Dht,
    cache: ChunkCache,
    demand: DemandTracker,
    replication: ReplicationPlanner,
    dedup: GossipDeduper,
    transport: T,
    next_id: u64,
}

impl<T: Transport> MeshCoordinator<T> {
    pub fn new(local_id: PeerId, signing_key: SigningKey, config: &MeshConfig, transport: T) -> Self {
        let local_node_id = dht::node_id_for_peer(local_id);
        Self {
            local_id,
            local_node_id,
            signing_key,
            peers: PeerTable::new(config.ewma_alpha),
            dht: Dht::new(local_node_id),
            cache: ChunkCache::new(4096, Duration::from_secs(600)),
            demand: DemandTracker::new(Duration::from_secs_f64(config.demand_half_life_secs)),
            replication: ReplicationPlanner::new(
                config.demand_scaling,
                config.min_replicas,
                config.max_replicas,
            ),
            dedup: GossipDeduper::new(),
            transport,
            next_id: 0,
        }
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    fn next_correlation_id(&mut self) -> String {
        self.next_id += 1;
        format!("{}-{}", self.local_id.0, self.next_id)
    }

    /// Registers a freshly-discovered peer as `disconnected` — spec.md §3's
    /// "peers are born disconnected."
    pub fn register_peer(&mut self, peer: Peer) {
        self.dht.insert_peer(peer.id);
        self.peers.insert(peer);
    }

    /// Builds an attestation challenge from this node to `target` over a
    /// region of `region_len` bytes, per spec.md §4.4. `timestamp_unix_ms`
    /// is stamped by the caller at the process boundary, same as
    /// `broadcast_gossip`'s `timestamp_ns`.
    pub fn challenge_peer(
        &self,
        target: PeerId,
        timestamp_unix_ms: u64,
        region_len: u64,
        rng: &mut impl rand::RngCore,
    ) -> AttestationChallenge {
        AttestationChallenge::generate(self.local_id, target, timestamp_unix_ms, region_len, rng)
    }

    /// Validates `response` against `challenge` and promotes `peer` to
    /// `connected` on success, or demotes/drops it on failure — spec.md
    /// §4.4's single-round-trip attestation protocol.
    pub fn complete_attestation(
        &mut self,
        peer: PeerId,
        challenge: &AttestationChallenge,
        response: &AttestationResponse,
        verifying_key: &ed25519_dalek::VerifyingKey,
        expected_digest: &[u8; 32],
    ) -> Result<(), MeshError> {
        match attestation::verify(response, challenge, verifying_key, expected_digest) {
            Ok(()) => {
                self.peers.set_state(peer, ConnectionState::Connected);
                self.peers.observe_outcome(peer, true);
                Ok(())
            }
            Err(e) => {
                self.peers.set_state(peer, ConnectionState::Failed);
                self.peers.observe_outcome(peer, false);
                Err(e)
            }
        }
    }

    /// Publishes `hash` to the DHT and broadcasts a chunk advertisement to
    /// every connected peer — spec.md §4.4's "registration of a local chunk
    /// publishes `(hash -> self)` to the k closest peers," simplified to a
    /// full broadcast since the distilled spec excludes the iterative
    /// network-lookup wire protocol.
    pub fn advertise_chunk(&mut self, hash: ContentHash, size_bytes: u64) {
        self.dht.publish_chunk(&hash, self.local_id);
        self.cache.put(hash, vec![self.local_id], 1.0);
        let kind = MeshEventKind::ChunkAdvertisement {
            hash,
            peer: self.local_id,
        };
        self.broadcast_gossip(kind);
        let _ = size_bytes;
    }

    /// Records an access to `hash` for demand tracking and bumps its LRU
    /// position in the chunk cache.
    pub fn record_access(&mut self, hash: ContentHash) {
        self.demand.record_access(hash);
        self.cache.get(&hash);
    }

    /// `FIND_PEERS_WITH_CHUNK(hash)` — checks the cache first (LRU refresh
    /// on hit), falling back to the DHT's closest-peers lookup.
    pub fn find_peers_with_chunk(&mut self, hash: &ContentHash) -> Vec<PeerId> {
        if let Some((peers, _confidence)) = self.cache.get(hash) {
            return peers;
        }
        self.dht.find_peers_with_chunk(hash)
    }

    /// A peer failed to serve a chunk it advertised — spec.md §3's "a chunk
    /// advertised by a peer must either be retrievable from that peer or
    /// the peer must be demoted in reputation upon failed fetch."
    pub fn report_fetch_failure(&mut self, peer: PeerId) {
        self.peers.observe_outcome(peer, false);
    }

    /// Sweeps known chunks (each paired with its size in bytes) and returns
    /// replication tasks for under-replicated ones — spec.md §4.4's
    /// self-healing sweep, to be enqueued to the Supervisor as replication
    /// jobs by the caller.
    pub fn self_heal(&self, chunks: &[(Chunk, u64)]) -> Vec<ReplicationTask> {
        chunks
            .iter()
            .filter_map(|(c, size_bytes)| {
                self.replication
                    .evaluate(c.hash, *size_bytes, &c.peers, &self.demand)
            })
            .collect()
    }

    fn broadcast_gossip(&mut self, kind: MeshEventKind) {
        let timestamp_ns = 0; // stamped by the caller at the process boundary.
        let nonce = self.next_id;
        self.next_id += 1;
        let message = gossip::publish(&self.signing_key, self.local_id, timestamp_ns, nonce, kind);
        let envelope = gossip_envelope(&message);
        for peer in self.peers.snapshot() {
            if peer.state == ConnectionState::Connected {
                self.transport.send(peer.id, envelope.clone());
            }
        }
    }

    /// Drains inbound gossip/delegation traffic from the transport, feeding
    /// gossip into the dedup filter and the (hash, peer, ledger, peer-state)
    /// side tables, and returns any [`MeshEvent`]s worth publishing to the
    /// event feed.
    pub fn poll_inbound(&mut self) -> Vec<MeshEvent> {
        let mut events = Vec::new();
        while let Some((from, envelope)) = self.transport.poll_recv() {
            if let Ok(message) = serde_json::from_slice::<GossipMessage>(&envelope.payload) {
                if self.dedup.observe(&message) {
                    self.apply_gossip(from, message.kind.clone());
                    events.push(MeshEvent {
                        sequence: self.next_id,
                        timestamp_ns: envelope.timestamp_ns,
                        kind: message.kind,
                    });
                    self.next_id += 1;
                }
            }
        }
        events
    }

    fn apply_gossip(&mut self, from: PeerId, kind: MeshEventKind) {
        match kind {
            MeshEventKind::ChunkAdvertisement { hash, peer } => {
                self.dht.register_remote_publisher(&hash, peer);
                self.cache.add_peer(&hash, peer);
            }
            MeshEventKind::PeerUpdate { peer, state } => {
                self.peers.set_state(peer, state);
            }
            MeshEventKind::ReputationChange { peer, new_reputation } => {
                let delta_is_positive = new_reputation
                    >= self
                        .peers
                        .get(peer)
                        .map(|p| p.reputation)
                        .unwrap_or(0.5);
                self.peers.observe_outcome(peer, delta_is_positive);
            }
            _ => {
                let _ = from;
            }
        }
    }
}

fn gossip_envelope(message: &GossipMessage) -> MeshEnvelope {
    MeshEnvelope {
        id: format!("{}-{}", message.peer.0, message.nonce),
        event_type: format!("mesh:gossip:v1:{}", kind_tag(&message.kind)),
        timestamp_ns: message.timestamp_ns,
        metadata: MeshEnvelopeMetadata::default(),
        payload: serde_json::to_vec(message).expect("GossipMessage always serializes"),
    }
}

fn kind_tag(kind: &MeshEventKind) -> &'static str {
    match kind {
        MeshEventKind::LedgerSync { .. } => "ledgerSync",
        MeshEventKind::PeerList { .. } => "peerList",
        MeshEventKind::ChunkAdvertisement { .. } => "chunkAdvertisement",
        MeshEventKind::ModelAdvertisement { .. } => "modelAdvertisement",
        MeshEventKind::SdpNotify { .. } => "sdpNotify",
        MeshEventKind::SdpRelay { .. } => "sdpRelay",
        MeshEventKind::IceRelay { .. } => "iceRelay",
        MeshEventKind::ReputationChange { .. } => "reputationChange",
        MeshEventKind::PeerUpdate { .. } => "peerUpdate",
        MeshEventKind::ChunkDiscovered { .. } => "chunkDiscovered",
        MeshEventKind::Custom { .. } => "custom",
    }
}

impl<T: Transport> Delegator for MeshCoordinator<T> {
    /// Picks the highest-reputation connected peer advertising
    /// `operation`'s capability string, sends the request, and polls for a
    /// response up to `request.deadline_unix_ms` milliseconds — spec.md
    /// §4.3 step 5 / §4.4's delegation RPC.
    fn delegate(&mut self, request: DelegateRequest) -> Result<DelegateResponse, MeshError> {
        let capability = operation_capability(request.operation);
        let target = self
            .peers
            .connected_peers()
            .filter(|p| p.capabilities.iter().any(|c| c == capability))
            .filter(|p| p.reputation >= MIN_REPUTATION_FOR_DELEGATION)
            .max_by(|a, b| a.reputation.partial_cmp(&b.reputation).unwrap())
            .map(|p| p.id)
            .ok_or(MeshError::InsufficientPeers)?;

        let correlation_id = self.next_correlation_id();
        let envelope = MeshEnvelope {
            id: correlation_id.clone(),
            event_type: "mesh:delegate:v1:request".into(),
            timestamp_ns: 0,
            metadata: MeshEnvelopeMetadata::default(),
            payload: serde_json::to_vec(&request).map_err(|_| MeshError::SignatureInvalid)?,
        };
        self.transport.send(target, envelope);

        let deadline = Instant::now() + Duration::from_millis(request.deadline_unix_ms.max(1));
        while Instant::now() < deadline {
            if let Some((from, reply)) = self.transport.poll_recv() {
                if from == target && reply.id == correlation_id {
                    let response: DelegateResponse = serde_json::from_slice(&reply.payload)
                        .map_err(|_| MeshError::SignatureInvalid)?;
                    if response.status == DelegationStatus::Success {
                        self.peers.observe_outcome(target, true);
                    } else {
                        self.peers.observe_outcome(target, false);
                    }
                    return Ok(response);
                }
            }
            std::thread::sleep(DELEGATE_POLL_INTERVAL);
        }
        self.peers.observe_outcome(target, false);
        Err(MeshError::PeerUnreachable(target.0))
    }
}

fn operation_capability(op: DelegateOperation) -> &'static str {
    match op {
        DelegateOperation::Hash => "mesh:hash",
        DelegateOperation::Compress => "mesh:compress",
        DelegateOperation::Encrypt => "mesh:encrypt",
        DelegateOperation::Custom => "mesh:custom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn config() -> MeshConfig {
        inos_config::MeshConfig {
            ewma_alpha: 0.3,
            demand_half_life_secs: 50.0,
            demand_scaling: 1.0,
            min_replicas: 1,
            max_replicas: 5,
            self_heal_interval_secs: 30,
        }
    }

    #[test]
    fn delegate_with_no_connected_peers_fails_insufficient_peers() {
        let mut hub = ChannelHub::new();
        let transport = hub.join(PeerId(1));
        let key = SigningKey::generate(&mut OsRng);
        let mut coordinator = MeshCoordinator::new(PeerId(1), key, &config(), transport);
        let request = DelegateRequest {
            id: "job-1".into(),
            operation: DelegateOperation::Hash,
            params: vec![],
            deadline_unix_ms: 50,
            bid: 10,
            priority: 1,
        };
        assert_eq!(coordinator.delegate(request), Err(MeshError::InsufficientPeers));
    }

    #[test]
    fn delegate_succeeds_round_trip_against_a_responding_peer() {
        let mut hub = ChannelHub::new();
        let requester_transport = hub.join(PeerId(1));
        let mut responder_transport = hub.join(PeerId(2));

        let key = SigningKey::generate(&mut OsRng);
        let mut coordinator = MeshCoordinator::new(PeerId(1), key, &config(), requester_transport);
        let mut responder_peer = Peer::new(PeerId(2), "peer-2");
        responder_peer.capabilities = vec!["mesh:hash".into()];
        responder_peer.state = ConnectionState::Connected;
        responder_peer.reputation = 0.9;
        coordinator.register_peer(responder_peer);

        let responder_thread = std::thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(1);
            while Instant::now() < deadline {
                if let Some((from, req)) = responder_transport.poll_recv() {
                    let request: DelegateRequest = serde_json::from_slice(&req.payload).unwrap();
                    let response = DelegateResponse {
                        id: request.id,
                        status: DelegationStatus::Success,
                        output: vec![9, 9, 9],
                    };
                    let reply = MeshEnvelope {
                        id: req.id,
                        event_type: "mesh:delegate:v1:response".into(),
                        timestamp_ns: 0,
                        metadata: MeshEnvelopeMetadata::default(),
                        payload: serde_json::to_vec(&response).unwrap(),
                    };
                    responder_transport.send(from, reply);
                    return;
                }
                std::thread::sleep(Duration::from_millis(2));
            }
        });

        let request = DelegateRequest {
            id: "job-2".into(),
            operation: DelegateOperation::Hash,
            params: vec![1, 2, 3],
            deadline_unix_ms: 500,
            bid: 10,
            priority: 1,
        };
        let response = coordinator.delegate(request).unwrap();
        assert_eq!(response.status, DelegationStatus::Success);
        assert_eq!(response.output, vec![9, 9, 9]);
        responder_thread.join().unwrap();
    }

    #[test]
    fn advertised_chunk_is_discoverable_by_hash() {
        let mut hub = ChannelHub::new();
        let transport = hub.join(PeerId(1));
        let key = SigningKey::generate(&mut OsRng);
        let mut coordinator = MeshCoordinator::new(PeerId(1), key, &config(), transport);
        let hash = ContentHash([3u8; 32]);
        coordinator.advertise_chunk(hash, 1024);
        assert_eq!(coordinator.find_peers_with_chunk(&hash), vec![PeerId(1)]);
    }

    #[test]
    fn failed_attestation_demotes_the_peer_and_drops_the_connection() {
        let mut hub = ChannelHub::new();
        let transport = hub.join(PeerId(1));
        let key = SigningKey::generate(&mut OsRng);
        let mut coordinator = MeshCoordinator::new(PeerId(1), key, &config(), transport);
        coordinator.register_peer(Peer::new(PeerId(2), "peer-2"));

        let mut rng = OsRng;
        let challenge = coordinator.challenge_peer(PeerId(2), 1_700_000_000_000, 8192, &mut rng);
        let bad_response = AttestationResponse {
            nonce: challenge.nonce,
            requester: challenge.requester,
            target: challenge.target,
            timestamp_unix_ms: challenge.timestamp_unix_ms,
            version: attestation::ATTESTATION_VERSION,
            digest: [0u8; 32],
            signature: [0u8; 64],
        };
        let other_key = SigningKey::generate(&mut OsRng);
        let result = coordinator.complete_attestation(
            PeerId(2),
            &challenge,
            &bad_response,
            &other_key.verifying_key(),
            &[0u8; 32],
        );
        assert!(result.is_err());
        assert_eq!(
            coordinator.peers().get(PeerId(2)).unwrap().state,
            ConnectionState::Failed
        );
    }
}
