//! Chunk cache — bounded LRU with TTL, spec.md §3/§4.4.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use inos_events::{ContentHash, PeerId};

struct Entry {
    peers: Vec<PeerId>,
    confidence: f64,
    last_access: Instant,
    inserted: Instant,
}

pub struct ChunkCache {
    entries: HashMap<ContentHash, Entry>,
    /// Access order, most-recently-used at the back.
    order: Vec<ContentHash>,
    capacity: usize,
    ttl: Duration,
}

impl ChunkCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            capacity,
            ttl,
        }
    }

    fn touch(&mut self, hash: &ContentHash) {
        if let Some(pos) = self.order.iter().position(|h| h == hash) {
            let h = self.order.remove(pos);
            self.order.push(h);
        }
    }

    pub fn put(&mut self, hash: ContentHash, peers: Vec<PeerId>, confidence: f64) {
        let now = Instant::now();
        if !self.entries.contains_key(&hash) && self.entries.len() >= self.capacity {
            if let Some(evicted) = self.order.first().copied() {
                self.entries.remove(&evicted);
                self.order.remove(0);
            }
        }
        self.entries.insert(
            hash,
            Entry {
                peers,
                confidence,
                last_access: now,
                inserted: now,
            },
        );
        self.touch(&hash);
    }

    pub fn get(&mut self, hash: &ContentHash) -> Option<(Vec<PeerId>, f64)> {
        let expired = self
            .entries
            .get(hash)
            .map(|e| e.inserted.elapsed() > self.ttl)
            .unwrap_or(false);
        if expired {
            self.entries.remove(hash);
            self.order.retain(|h| h != hash);
            return None;
        }
        let result = self.entries.get_mut(hash).map(|e| {
            e.last_access = Instant::now();
            (e.peers.clone(), e.confidence)
        });
        if result.is_some() {
            self.touch(hash);
        }
        result
    }

    pub fn add_peer(&mut self, hash: &ContentHash, peer: PeerId) {
        if let Some(e) = self.entries.get_mut(hash) {
            if !e.peers.contains(&peer) {
                e.peers.push(peer);
            }
        }
    }

    /// Sweeps expired entries, returning how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let expired: Vec<ContentHash> = self
            .entries
            .iter()
            .filter(|(_, e)| e.inserted.elapsed() > ttl)
            .map(|(h, _)| *h)
            .collect();
        for h in &expired {
            self.entries.remove(h);
            self.order.retain(|x| x != h);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
