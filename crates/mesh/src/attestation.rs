//! Peer attestation — spec.md §4.4.
//!
//! A single-round-trip challenge/response: the requester picks a nonce and
//! a handful of byte windows it expects the peer to hold, names itself and
//! the target peer, and stamps the request time; the responder hashes
//! those windows with SHA-256 and signs the result (plus the echoed
//! identity/timestamp) with its Ed25519 key. The requester checks the
//! echoed nonce, protocol version, requester/target/timestamp, and
//! signature before trusting the peer's claimed identity. Any mismatch is
//! `AttestationFailed` and the caller should drop the connection.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use inos_events::PeerId;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::MeshError;

pub const ATTESTATION_VERSION: u32 = 1;
const RANDOM_WINDOW_COUNT: usize = 4;
const FULL_WINDOW_BYTES: u32 = 2048;

/// One byte range the challenge asks the responder to prove it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub len: u32,
}

/// Something that can serve raw bytes for a [`Window`] — a memory-mapped
/// region, a chunk store, or a test double.
pub trait AttestationDataSource {
    fn read(&self, window: Window) -> Vec<u8>;
}

#[derive(Debug, Clone)]
pub struct AttestationChallenge {
    pub nonce: [u8; 32],
    pub requester: PeerId,
    pub target: PeerId,
    pub timestamp_unix_ms: u64,
    pub windows: Vec<Window>,
}

impl AttestationChallenge {
    /// Builds a challenge from `requester` to `target` against a region of
    /// `region_len` bytes: a handful of small random windows plus one full
    /// 2KiB window, per spec.md. `timestamp_unix_ms` is stamped by the
    /// caller, same as `gossip::publish`'s `timestamp_ns`.
    pub fn generate(
        requester: PeerId,
        target: PeerId,
        timestamp_unix_ms: u64,
        region_len: u64,
        rng: &mut impl RngCore,
    ) -> Self {
        let mut nonce = [0u8; 32];
        rng.fill_bytes(&mut nonce);
        let mut windows = Vec::with_capacity(RANDOM_WINDOW_COUNT + 1);
        for _ in 0..RANDOM_WINDOW_COUNT {
            windows.push(random_window(region_len, 64, rng));
        }
        windows.push(random_window(region_len, FULL_WINDOW_BYTES, rng));
        Self {
            nonce,
            requester,
            target,
            timestamp_unix_ms,
            windows,
        }
    }
}

fn random_window(region_len: u64, len: u32, rng: &mut impl RngCore) -> Window {
    let len = len.min(region_len.max(1) as u32);
    let span = region_len.saturating_sub(len as u64).max(1);
    let offset = rng.next_u64() % span;
    Window { offset, len }
}

#[derive(Debug, Clone)]
pub struct AttestationResponse {
    pub nonce: [u8; 32],
    pub requester: PeerId,
    pub target: PeerId,
    pub timestamp_unix_ms: u64,
    pub version: u32,
    pub digest: [u8; 32],
    pub signature: [u8; 64],
}

fn canonical_payload(
    nonce: &[u8; 32],
    requester: PeerId,
    target: PeerId,
    timestamp_unix_ms: u64,
    version: u32,
    digest: &[u8; 32],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 8 + 8 + 8 + 4 + 32);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(&requester.0.to_le_bytes());
    buf.extend_from_slice(&target.0.to_le_bytes());
    buf.extend_from_slice(&timestamp_unix_ms.to_le_bytes());
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(digest);
    buf
}

fn hash_windows(source: &impl AttestationDataSource, challenge: &AttestationChallenge) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(challenge.nonce);
    for window in &challenge.windows {
        hasher.update(source.read(*window));
    }
    hasher.finalize().into()
}

/// Responder side: hash the requested windows and sign the result.
pub fn respond(
    signing_key: &SigningKey,
    challenge: &AttestationChallenge,
    source: &impl AttestationDataSource,
) -> AttestationResponse {
    let digest = hash_windows(source, challenge);
    let payload = canonical_payload(
        &challenge.nonce,
        challenge.requester,
        challenge.target,
        challenge.timestamp_unix_ms,
        ATTESTATION_VERSION,
        &digest,
    );
    let signature = signing_key.sign(&payload);
    AttestationResponse {
        nonce: challenge.nonce,
        requester: challenge.requester,
        target: challenge.target,
        timestamp_unix_ms: challenge.timestamp_unix_ms,
        version: ATTESTATION_VERSION,
        digest,
        signature: signature.to_bytes(),
    }
}

/// Requester side: verify the echoed nonce, protocol version,
/// requester/target/timestamp, and signature, then compare the digest
/// against bytes the requester holds itself (e.g. its own cached copy of
/// the chunk).
pub fn verify(
    response: &AttestationResponse,
    challenge: &AttestationChallenge,
    verifying_key: &VerifyingKey,
    expected_digest: &[u8; 32],
) -> Result<(), MeshError> {
    if response.nonce != challenge.nonce {
        return Err(MeshError::AttestationFailed);
    }
    if response.version != ATTESTATION_VERSION {
        return Err(MeshError::AttestationFailed);
    }
    if response.requester != challenge.requester
        || response.target != challenge.target
        || response.timestamp_unix_ms != challenge.timestamp_unix_ms
    {
        return Err(MeshError::AttestationFailed);
    }
    let payload = canonical_payload(
        &response.nonce,
        response.requester,
        response.target,
        response.timestamp_unix_ms,
        response.version,
        &response.digest,
    );
    let signature = Signature::from_bytes(&response.signature);
    if verifying_key.verify(&payload, &signature).is_err() {
        return Err(MeshError::AttestationFailed);
    }
    if &response.digest != expected_digest {
        return Err(MeshError::AttestationFailed);
    }
    Ok(())
}
