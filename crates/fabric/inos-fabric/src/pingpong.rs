//! Ping-pong double buffering — spec.md §4.1/§5.
//!
//! A single writer owns two fixed buffers, `A` and `B`. It always writes the
//! *inactive* half, then publishes the new data with a release fence before
//! flipping the active-index slot and bumping the epoch slot. Readers load
//! the active index (acquire), read from that half, and compare the epoch
//! before and after to detect a flip mid-read — the same release-store /
//! acquire-load / epoch-compare discipline `lithos-icc`'s seqlock uses,
//! generalized here to a pair of whole buffers instead of a single word.

use std::sync::atomic::Ordering;

use crate::atomic_index::AtomicIndex;

/// One side of a ping-pong pair, as a raw byte window.
#[derive(Clone, Copy)]
struct Half {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for Half {}
unsafe impl Sync for Half {}

/// A ping-pong double buffer backed by two raw regions and two atomic-index
/// slots: `active_slot` (0 or 1, which half readers should read) and
/// `epoch_slot` (bumped once per publish, used by readers to detect a torn
/// read).
pub struct PingPong {
    index: AtomicIndex,
    active_slot: usize,
    epoch_slot: usize,
    a: Half,
    b: Half,
}

unsafe impl Send for PingPong {}
unsafe impl Sync for PingPong {}

impl PingPong {
    /// # Safety
    /// `a` and `b` must each point to `len` valid bytes, non-overlapping,
    /// for the fabric's lifetime. `active_slot`/`epoch_slot` must not be
    /// shared with any other use.
    pub unsafe fn new(
        index: AtomicIndex,
        active_slot: usize,
        epoch_slot: usize,
        a: *mut u8,
        b: *mut u8,
        len: usize,
    ) -> Self {
        Self {
            index,
            active_slot,
            epoch_slot,
            a: Half { ptr: a, len },
            b: Half { ptr: b, len },
        }
    }

    fn half(&self, which: i32) -> Half {
        if which == 0 {
            self.a
        } else {
            self.b
        }
    }

    /// Index (0 or 1) of the half readers should currently read.
    pub fn active(&self) -> i32 {
        self.index.load(self.active_slot)
    }

    /// Current publish epoch. Odd/even has no special meaning here (unlike
    /// a seqlock); only "did this change between two observations" matters.
    pub fn epoch(&self) -> i32 {
        self.index.load(self.epoch_slot)
    }

    /// Writes `f` into the inactive half, then publishes it: release-store
    /// the new data, flip `active_slot`, and bump `epoch_slot`. Only the
    /// single declared writer may call this.
    pub fn publish(&self, f: impl FnOnce(&mut [u8])) {
        let current_active = self.index.load(self.active_slot);
        let inactive = 1 - current_active;
        let half = self.half(inactive);
        let buf = unsafe { std::slice::from_raw_parts_mut(half.ptr, half.len) };
        f(buf);
        // Release: the write above must be visible to any thread that
        // subsequently observes the flipped active index.
        self.index
            .store(self.active_slot, inactive)
            .expect("ping-pong active slot write should never hit the panic latch");
        self.index.add(self.epoch_slot, 1);
    }

    /// Reads the currently-active half via `f`, retrying if a publish raced
    /// with the read (detected by the epoch changing across the read).
    /// Returns the epoch the read was taken at.
    pub fn read<R>(&self, mut f: impl FnMut(&[u8]) -> R) -> (R, i32) {
        loop {
            let epoch_before = self.index.load(self.epoch_slot);
            std::sync::atomic::fence(Ordering::Acquire);
            let active = self.index.load(self.active_slot);
            let half = self.half(active);
            let buf = unsafe { std::slice::from_raw_parts(half.ptr, half.len) };
            let result = f(buf);
            let epoch_after = self.index.load(self.epoch_slot);
            if epoch_before == epoch_after {
                return (result, epoch_after);
            }
        }
    }
}
