//! Wire and event types exchanged across the shared-memory fabric and the
//! mesh's peer RPC/gossip channels.
//!
//! Types that live inside a ring slot (fixed stride, read by a hot loop) are
//! `#[repr(C)]` POD structs, following `lithos_events::TopOfBook`. Types that
//! cross a process boundary over a socket (job envelopes arriving from an
//! external ingress, mesh gossip) are plain structs with `serde` derives,
//! since their size isn't constrained to a fixed ring stride.

pub mod control;
pub mod job;
pub mod mesh;

pub use control::ControlFrame;
pub use job::{JobEnvelope, JobMetadata, JobResult, JobStatus};
pub use mesh::{
    Attestation, Chunk, ConnectionState, DelegateOperation, DelegateRequest, DelegateResponse,
    DelegationStatus, MeshEnvelope, MeshEnvelopeMetadata, MeshEvent, MeshEventKind, ModelManifest,
    Peer,
};

/// Stable identifier for a compute/storage unit. Newtype over a string id,
/// following `lithos_events::SymbolId`'s pattern of wrapping a primitive so
/// the wire format can't be confused with an unrelated string.
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct UnitId(pub String);

/// Stable identifier for a mesh peer.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PeerId(pub u64);

/// BLAKE3 content hash, as raw bytes (not base64/hex) for in-process use;
/// `Display`/`serde` render it as lowercase hex, matching how chunk hashes
/// appear in the mesh envelope's `payload`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentHash({})", self)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_displays_as_lowercase_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xde;
        bytes[1] = 0xad;
        let h = ContentHash(bytes);
        assert!(h.to_string().starts_with("dead"));
    }
}
