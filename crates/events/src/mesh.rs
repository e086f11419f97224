//! Mesh entity and wire types — spec.md §3/§4.4/§6.

use serde::{Deserialize, Serialize};

use crate::{ContentHash, PeerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Degraded,
    Failed,
}

/// A mesh peer's table entry — spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub address: String,
    pub capabilities: Vec<String>,
    pub bandwidth_estimate: f64,
    pub latency_estimate_ms: f64,
    /// EWMA of successful interactions, in `[0, 1]`.
    pub reputation: f64,
    pub state: ConnectionState,
    pub last_seen_unix_ms: u64,
    pub attested_public_key: Option<[u8; 32]>,
}

impl Peer {
    pub fn new(id: PeerId, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            capabilities: Vec::new(),
            bandwidth_estimate: 0.0,
            latency_estimate_ms: 0.0,
            reputation: 0.5,
            state: ConnectionState::Disconnected,
            last_seen_unix_ms: 0,
            attested_public_key: None,
        }
    }
}

/// A chunk's location record in the chunk cache — spec.md §3/§4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub hash: ContentHash,
    pub peers: Vec<PeerId>,
    pub confidence: f64,
    pub last_access_unix_ms: u64,
}

/// Manifest describing a model distributed across chunks — spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub model_id: String,
    pub total_chunks: u32,
    pub chunk_hashes: Vec<ContentHash>,
    pub merkle_root: ContentHash,
    pub signature: Vec<u8>,
    /// Maps a named layer to the half-open chunk-index range `[start, end)`
    /// that holds it.
    pub layer_ranges: Vec<(String, std::ops::Range<u32>)>,
}

/// Successful-attestation record — spec.md §3/§4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub peer: PeerId,
    pub public_key: [u8; 32],
    pub attested_at_unix_ms: u64,
}

/// Delegated job request sent to a peer — spec.md §4.4/§6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateRequest {
    pub id: String,
    pub operation: DelegateOperation,
    pub params: Vec<u8>,
    pub deadline_unix_ms: u64,
    pub bid: u64,
    pub priority: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DelegateOperation {
    Hash,
    Compress,
    Encrypt,
    Custom,
}

/// Closed status set for a delegation response — spec.md §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DelegationStatus {
    Success,
    InputMissing,
    CapacityExceeded,
    Failed,
    Timeout,
    VerificationFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateResponse {
    pub id: String,
    pub status: DelegationStatus,
    pub output: Vec<u8>,
}

/// Tagged gossip/event payload kind — spec.md §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MeshEventKind {
    LedgerSync { ledger_id: String, balance: i64 },
    PeerList { peers: Vec<PeerId> },
    ChunkAdvertisement { hash: ContentHash, peer: PeerId },
    ModelAdvertisement { model_id: String },
    SdpNotify { sdp: String },
    SdpRelay { target: PeerId, sdp: String },
    IceRelay { target: PeerId, candidate: String },
    ReputationChange { peer: PeerId, new_reputation: f64 },
    PeerUpdate { peer: PeerId, state: ConnectionState },
    ChunkDiscovered { hash: ContentHash, peer: PeerId },
    Custom { name: String, payload: Vec<u8> },
}

/// The common mesh envelope — spec.md §6. Carries a gossip payload, a
/// delegation RPC, or an attestation challenge/response, distinguished by
/// `event_type`'s `"{service}:{action}:v{N}:{state}"` convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshEnvelope {
    pub id: String,
    pub event_type: String,
    pub timestamp_ns: i64,
    pub metadata: MeshEnvelopeMetadata,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeshEnvelopeMetadata {
    pub user_id: Option<String>,
    pub device_id: Option<String>,
    pub trace_context: Option<String>,
    pub security_token: Option<String>,
    pub credit_ledger_id: Option<String>,
}

/// One entry in the Event Feed ring — spec.md §4.6. Fixed-size so it fits
/// the ring's 256-byte slot stride: the unbounded parts of [`MeshEventKind`]
/// (strings, vecs) are serialized to a length-prefixed JSON blob and
/// truncated if they would overflow the slot, matching the ring's
/// never-overwrite, drop-on-full discipline rather than growing the slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshEvent {
    pub sequence: u64,
    pub timestamp_ns: i64,
    pub kind: MeshEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_starts_disconnected_with_neutral_reputation() {
        let p = Peer::new(PeerId(1), "127.0.0.1:9000");
        assert_eq!(p.state, ConnectionState::Disconnected);
        assert_eq!(p.reputation, 0.5);
    }

    #[test]
    fn mesh_event_kind_round_trips_through_json() {
        let ev = MeshEventKind::ChunkAdvertisement {
            hash: ContentHash([1u8; 32]),
            peer: PeerId(42),
        };
        let s = serde_json::to_string(&ev).unwrap();
        let back: MeshEventKind = serde_json::from_str(&s).unwrap();
        match back {
            MeshEventKind::ChunkAdvertisement { peer, .. } => assert_eq!(peer, PeerId(42)),
            _ => panic!("wrong variant"),
        }
    }
}
