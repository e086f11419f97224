//! Kademlia-style DHT — spec.md §4.4.
//!
//! 160-bit keys (a BLAKE3 hash truncated to 20 bytes), k-buckets by XOR
//! distance from the local node id. `FIND_PEERS_WITH_CHUNK` is a local
//! k-closest lookup rather than an iterative network query, since the
//! distilled spec excludes the wire protocol for cross-peer lookups
//! (spec.md's Non-goals: "a protocol specification for mesh wire format
//! beyond the envelope shape").

use std::collections::BTreeMap;

use inos_events::{ContentHash, PeerId};

pub const KEY_BITS: usize = 160;
pub const BUCKET_COUNT: usize = KEY_BITS;
pub const K: usize = 20;

pub type NodeId = [u8; 20];

pub fn node_id_for_peer(peer: PeerId) -> NodeId {
    let hash = blake3::hash(&peer.0.to_le_bytes());
    let mut id = [0u8; 20];
    id.copy_from_slice(&hash.as_bytes()[..20]);
    id
}

pub fn chunk_key(hash: &ContentHash) -> NodeId {
    let mut id = [0u8; 20];
    id.copy_from_slice(&hash.0[..20]);
    id
}

fn xor_distance(a: &NodeId, b: &NodeId) -> NodeId {
    let mut out = [0u8; 20];
    for i in 0..20 {
        out[i] = a[i] ^ b[i];
    }
    out
}

fn bucket_index(distance: &NodeId) -> usize {
    for (byte_idx, byte) in distance.iter().enumerate() {
        if *byte != 0 {
            let leading = byte.leading_zeros() as usize;
            return KEY_BITS - 1 - (byte_idx * 8 + leading);
        }
    }
    0
}

/// A local node's routing table: one k-bucket per distance bit, plus a
/// direct `(hash -> publishers)` registry used to serve
/// `FIND_PEERS_WITH_CHUNK` locally.
pub struct Dht {
    local_id: NodeId,
    buckets: Vec<Vec<PeerId>>,
    chunk_publishers: BTreeMap<NodeId, Vec<PeerId>>,
}

impl Dht {
    pub fn new(local_id: NodeId) -> Self {
        Self {
            local_id,
            buckets: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
            chunk_publishers: BTreeMap::new(),
        }
    }

    pub fn insert_peer(&mut self, peer: PeerId) {
        let id = node_id_for_peer(peer);
        if id == self.local_id {
            return;
        }
        let bucket = &mut self.buckets[bucket_index(&xor_distance(&self.local_id, &id))];
        if !bucket.contains(&peer) {
            if bucket.len() >= K {
                bucket.remove(0);
            }
            bucket.push(peer);
        }
    }

    /// Publishes `(hash -> self)` to the `K` peers closest to `hash`'s key.
    pub fn publish_chunk(&mut self, hash: &ContentHash, self_peer: PeerId) {
        let key = chunk_key(hash);
        let entry = self.chunk_publishers.entry(key).or_default();
        if !entry.contains(&self_peer) {
            entry.push(self_peer);
        }
    }

    pub fn register_remote_publisher(&mut self, hash: &ContentHash, peer: PeerId) {
        let key = chunk_key(hash);
        let entry = self.chunk_publishers.entry(key).or_default();
        if !entry.contains(&peer) {
            entry.push(peer);
        }
    }

    /// `FIND_PEERS_WITH_CHUNK(hash)`: returns known publishers, else the
    /// `K` peers closest to the chunk's key as lookup candidates.
    pub fn find_peers_with_chunk(&self, hash: &ContentHash) -> Vec<PeerId> {
        let key = chunk_key(hash);
        if let Some(publishers) = self.chunk_publishers.get(&key) {
            return publishers.clone();
        }
        self.closest_peers(&key, K)
    }

    fn closest_peers(&self, target: &NodeId, n: usize) -> Vec<PeerId> {
        let mut all: Vec<PeerId> = self.buckets.iter().flatten().copied().collect();
        all.sort_by_key(|p| xor_distance(&node_id_for_peer(*p), target));
        all.truncate(n);
        all
    }
}
