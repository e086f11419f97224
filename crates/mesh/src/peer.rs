//! Peer table — spec.md §3/§4.4.

use std::collections::HashMap;

use inos_events::{ConnectionState, Peer, PeerId};

/// Peer table keyed by peer id, with EWMA bandwidth/latency/reputation
/// estimators — spec.md §4.4. Single-writer discipline: only the Mesh
/// Coordinator worker mutates it; external reads go through
/// [`PeerTable::snapshot`].
pub struct PeerTable {
    peers: HashMap<PeerId, Peer>,
    ewma_alpha: f64,
}

impl PeerTable {
    pub fn new(ewma_alpha: f64) -> Self {
        Self {
            peers: HashMap::new(),
            ewma_alpha,
        }
    }

    pub fn insert(&mut self, peer: Peer) {
        self.peers.insert(peer.id, peer);
    }

    pub fn get(&self, id: PeerId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    pub fn set_state(&mut self, id: PeerId, state: ConnectionState) {
        if let Some(p) = self.peers.get_mut(&id) {
            p.state = state;
        }
    }

    /// Folds a new latency sample into the peer's EWMA estimator.
    pub fn observe_latency(&mut self, id: PeerId, sample_ms: f64) {
        if let Some(p) = self.peers.get_mut(&id) {
            p.latency_estimate_ms = ewma(p.latency_estimate_ms, sample_ms, self.ewma_alpha);
        }
    }

    pub fn observe_bandwidth(&mut self, id: PeerId, sample: f64) {
        if let Some(p) = self.peers.get_mut(&id) {
            p.bandwidth_estimate = ewma(p.bandwidth_estimate, sample, self.ewma_alpha);
        }
    }

    /// Folds a success (1.0) or failure (0.0) outcome into the peer's
    /// reputation EWMA.
    pub fn observe_outcome(&mut self, id: PeerId, success: bool) {
        if let Some(p) = self.peers.get_mut(&id) {
            let sample = if success { 1.0 } else { 0.0 };
            p.reputation = ewma(p.reputation, sample, self.ewma_alpha).clamp(0.0, 1.0);
        }
    }

    pub fn connected_peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers
            .values()
            .filter(|p| p.state == ConnectionState::Connected)
    }

    pub fn snapshot(&self) -> Vec<Peer> {
        self.peers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

fn ewma(prev: f64, sample: f64, alpha: f64) -> f64 {
    alpha * sample + (1.0 - alpha) * prev
}
