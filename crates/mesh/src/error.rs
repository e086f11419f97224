//! Mesh/delegation error kinds — spec.md §7.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("peer {0} is unreachable")]
    PeerUnreachable(u64),
    #[error("no peer advertises chunk {0}")]
    ChunkNotFound(String),
    #[error("circuit to peer {0} is open after repeated failures")]
    CircuitOpen(u64),
    #[error("not enough connected peers to satisfy the request")]
    InsufficientPeers,
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("peer {0} reputation is below the admission threshold")]
    LowReputation(u64),
    #[error("attestation challenge/response failed")]
    AttestationFailed,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DelegationError {
    #[error("target peer lacks the requested input chunk")]
    InputMissing,
    #[error("target peer is over capacity")]
    CapacityExceeded,
    #[error("responder could not verify its own result")]
    VerificationFailed,
}
