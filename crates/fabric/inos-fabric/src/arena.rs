//! Session-scoped bump arena — spec.md §4.1.
//!
//! Allocation is a single `fetch_add` on the atomic-index bump-pointer slot,
//! rounded up to a 64-byte alignment so no two allocations share a cache
//! line. There is no per-call free; the arena is reclaimed wholesale when a
//! session ends (the Supervisor resets the bump slot to zero). Callers that
//! need arena space from outside the process that owns the bump slot go
//! through the request/response ring pair instead of calling `alloc`
//! directly.

use crate::atomic_index::AtomicIndex;
use crate::error::FabricError;
use crate::layout::slot;

const ALLOC_ALIGN: i32 = 64;

fn align_up(x: i32, align: i32) -> i32 {
    (x + align - 1) & !(align - 1)
}

/// A bump allocator over a single fixed-size arena region.
pub struct Arena {
    index: AtomicIndex,
    capacity: i32,
}

impl Arena {
    /// # Safety
    /// `capacity` must equal the arena region's length in bytes, and the
    /// arena bump slot must not be used for anything else.
    pub unsafe fn new(index: AtomicIndex, capacity: usize) -> Self {
        Self {
            index,
            capacity: capacity as i32,
        }
    }

    /// Resets the bump pointer to zero. Only the Supervisor, at session
    /// start, should call this.
    pub fn reset(&self) {
        // store bypasses fetch_add semantics deliberately: this isn't a
        // concurrent operation, it's a one-time session boundary.
        let _ = self.index.store(slot::ARENA_BUMP, 0);
    }

    /// Bytes currently in use.
    pub fn used(&self) -> usize {
        self.index.load(slot::ARENA_BUMP).max(0) as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Reserves `len` bytes, returning the offset (relative to the arena
    /// region's start) of the allocation. Never blocks, never frees.
    ///
    /// Returns [`FabricError::ArenaExhausted`] without mutating the bump
    /// pointer if the allocation would exceed the arena's capacity.
    pub fn alloc(&self, len: usize) -> Result<usize, FabricError> {
        let want = align_up(len as i32, ALLOC_ALIGN);
        let prev = self.index.add(slot::ARENA_BUMP, want);
        if prev.saturating_add(want) > self.capacity {
            // Roll back: another thread may have allocated between our
            // fetch_add and this check, so we can't just subtract `want`
            // unconditionally if it would underflow below `prev` — but
            // fetch_add already reserved the space for us, so undoing it
            // with a matching subtraction is always correct regardless of
            // what anyone else did concurrently.
            self.index.add(slot::ARENA_BUMP, -want);
            return Err(FabricError::ArenaExhausted);
        }
        Ok(prev as usize)
    }
}

/// One arena allocation request, as written to the arena-request ring:
/// `{requester_id: u32, len: u32}` plus padding to the ring's 32-byte slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaRequest {
    pub requester_id: u32,
    pub len: u32,
}

impl ArenaRequest {
    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..4].copy_from_slice(&self.requester_id.to_le_bytes());
        out[4..8].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            requester_id: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            len: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        }
    }
}

/// One arena allocation response, as written to the arena-response ring:
/// `{requester_id: u32, offset: u32}`, or `offset = u32::MAX` for
/// `ArenaExhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaResponse {
    pub requester_id: u32,
    pub offset: u32,
}

impl ArenaResponse {
    pub const EXHAUSTED: u32 = u32::MAX;

    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..4].copy_from_slice(&self.requester_id.to_le_bytes());
        out[4..8].copy_from_slice(&self.offset.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            requester_id: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            offset: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        }
    }
}
