//! Gossip dispatch — spec.md §4.4.
//!
//! Envelopes are tagged by [`MeshEventKind`], content-addressed with a
//! BLAKE3 digest over the serialized payload, and signed with the
//! publisher's Ed25519 key. Receivers suppress duplicates by
//! `(peer, timestamp, nonce)` so a re-broadcast storm doesn't re-process
//! the same event twice.

use std::collections::HashSet;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use inos_events::{MeshEventKind, PeerId};
use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// A signed gossip message, serializable so it can cross a [`crate::Transport`]
/// boundary as a [`inos_events::MeshEnvelope`] payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipMessage {
    pub peer: PeerId,
    pub timestamp_ns: i64,
    pub nonce: u64,
    pub kind: MeshEventKind,
    #[serde(with = "serde_bytes_32")]
    pub digest: [u8; 32],
    #[serde(with = "serde_bytes_64")]
    pub signature: [u8; 64],
}

mod serde_bytes_32 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        bytes.to_vec().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let v = Vec::<u8>::deserialize(d)?;
        v.try_into().map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

mod serde_bytes_64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], s: S) -> Result<S::Ok, S::Error> {
        bytes.to_vec().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 64], D::Error> {
        let v = Vec::<u8>::deserialize(d)?;
        v.try_into().map_err(|_| serde::de::Error::custom("expected 64 bytes"))
    }
}

fn canonical_bytes(peer: PeerId, timestamp_ns: i64, nonce: u64, kind: &MeshEventKind) -> Vec<u8> {
    let kind_json = serde_json::to_vec(kind).expect("MeshEventKind always serializes");
    let mut buf = Vec::with_capacity(kind_json.len() + 24);
    buf.extend_from_slice(&peer.0.to_le_bytes());
    buf.extend_from_slice(&timestamp_ns.to_le_bytes());
    buf.extend_from_slice(&nonce.to_le_bytes());
    buf.extend_from_slice(&kind_json);
    buf
}

/// Builds and signs a gossip message ready to broadcast.
pub fn publish(
    signing_key: &SigningKey,
    peer: PeerId,
    timestamp_ns: i64,
    nonce: u64,
    kind: MeshEventKind,
) -> GossipMessage {
    let bytes = canonical_bytes(peer, timestamp_ns, nonce, &kind);
    let digest: [u8; 32] = blake3::hash(&bytes).into();
    let signature = signing_key.sign(&digest).to_bytes();
    GossipMessage {
        peer,
        timestamp_ns,
        nonce,
        kind,
        digest,
        signature,
    }
}

/// Verifies a received gossip message's digest and signature against the
/// claimed publisher's key.
pub fn verify(message: &GossipMessage, verifying_key: &VerifyingKey) -> Result<(), MeshError> {
    let bytes = canonical_bytes(message.peer, message.timestamp_ns, message.nonce, &message.kind);
    let expected_digest: [u8; 32] = blake3::hash(&bytes).into();
    if expected_digest != message.digest {
        return Err(MeshError::SignatureInvalid);
    }
    let signature = Signature::from_bytes(&message.signature);
    verifying_key
        .verify(&message.digest, &signature)
        .map_err(|_| MeshError::SignatureInvalid)
}

/// Suppresses re-delivery of gossip already seen from the same
/// `(peer, timestamp, nonce)` triple.
#[derive(Default)]
pub struct GossipDeduper {
    seen: HashSet<(PeerId, i64, u64)>,
}

impl GossipDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this message has not been observed before (and
    /// records it as seen), `false` if it's a duplicate.
    pub fn observe(&mut self, message: &GossipMessage) -> bool {
        self.seen
            .insert((message.peer, message.timestamp_ns, message.nonce))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
