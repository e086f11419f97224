//! The atomic index array `A` — spec.md §3.
//!
//! A fixed number of `AtomicI32` words overlaid on the start of `S`. Every
//! worker sees the same words; ownership of each slot (who is allowed to
//! write it) is a convention enforced by callers, not by this type — the
//! same "single declared writer per slot, `fetch_add` for multi-writer
//! slots" policy spec.md §5 describes.

use std::mem::align_of;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

use crate::layout::{slot, ATOMIC_INDEX_WORDS};

/// Cadence of the cooperative-polling fallback used by [`AtomicIndex::wait`].
///
/// spec.md §4.1 allows this fallback whenever the host lacks a blocking-wait
/// primitive; this implementation always uses it (no OS futex dependency),
/// trading a little latency for portability — the same trade-off the host
/// project makes in `bins/onyx`'s 1ms poll loop.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Outcome of [`AtomicIndex::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The slot's value changed away from `expected` before the timeout.
    Woken,
    /// The timeout elapsed with the slot still equal to `expected`.
    TimedOut,
    /// The slot already differed from `expected` when `wait` was called.
    NotEqual,
}

/// A view over the 64-word atomic index array living at the start of `S`.
///
/// `AtomicIndex` does not own the backing memory; it borrows it for the
/// lifetime of the fabric. Cloning is cheap (it's a raw pointer plus a
/// marker) and intentional: every worker thread holds its own `AtomicIndex`
/// pointing at the same words.
#[derive(Clone, Copy)]
pub struct AtomicIndex {
    base: *const AtomicI32,
}

// SAFETY: every access goes through `AtomicI32` operations, which are safe
// to share across threads by construction. The raw pointer only disables
// the auto-derived Send/Sync; it does not change the actual safety story.
unsafe impl Send for AtomicIndex {}
unsafe impl Sync for AtomicIndex {}

impl AtomicIndex {
    /// Wraps `ATOMIC_INDEX_WORDS` words starting at `base`.
    ///
    /// # Safety
    /// `base` must point to at least `ATOMIC_INDEX_WORDS * 4` valid,
    /// writable bytes for the entire lifetime of the returned `AtomicIndex`,
    /// and must be 4-byte aligned.
    pub unsafe fn from_raw(base: *mut u8) -> Self {
        debug_assert_eq!(base as usize % align_of::<AtomicI32>(), 0);
        Self {
            base: base as *const AtomicI32,
        }
    }

    #[inline]
    fn slot_ptr(&self, slot: usize) -> &AtomicI32 {
        assert!(slot < ATOMIC_INDEX_WORDS, "atomic index slot {slot} out of range");
        // SAFETY: bounds-checked above; `from_raw`'s contract guarantees the
        // whole array is valid for the fabric's lifetime.
        unsafe { &*self.base.add(slot) }
    }

    /// Zero-initializes every slot. Called once at fabric boot.
    pub fn reset(&self) {
        for i in 0..ATOMIC_INDEX_WORDS {
            self.slot_ptr(i).store(0, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn load(&self, slot: usize) -> i32 {
        self.slot_ptr(slot).load(Ordering::Acquire)
    }

    /// Stores `value` into `slot`, unless the panic latch (slot 3) is set
    /// and `slot` isn't the panic slot itself — per spec.md §4.1's
    /// `PanicLatched` failure semantics.
    #[inline]
    pub fn store(&self, slot: usize, value: i32) -> Result<(), PanicLatched> {
        if slot != self::slot::PANIC && self.is_panicked() {
            return Err(PanicLatched);
        }
        self.slot_ptr(slot).store(value, Ordering::Release);
        Ok(())
    }

    /// Unconditional store, bypassing the panic latch. Only `reset` and the
    /// panic-latching path itself should use this.
    #[inline]
    fn store_raw(&self, slot: usize, value: i32) {
        self.slot_ptr(slot).store(value, Ordering::Release);
    }

    /// Atomically adds `delta` to `slot`, returning the prior value. Used
    /// for epoch bumps and multi-writer counters (ring tail/head, arena
    /// bump pointer).
    #[inline]
    pub fn add(&self, slot: usize, delta: i32) -> i32 {
        self.slot_ptr(slot).fetch_add(delta, Ordering::AcqRel)
    }

    /// Compare-and-swap, used by ring consumers to advance `head`.
    #[inline]
    pub fn compare_exchange(&self, slot: usize, current: i32, new: i32) -> Result<i32, i32> {
        self.slot_ptr(slot)
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
    }

    pub fn is_panicked(&self) -> bool {
        self.slot_ptr(self::slot::PANIC).load(Ordering::Acquire) != 0
    }

    /// Latches the panic slot to `code` (non-zero). Idempotent.
    pub fn latch_panic(&self, code: i32) {
        debug_assert_ne!(code, 0, "panic code must be non-zero to latch");
        self.store_raw(self::slot::PANIC, code);
    }

    /// Blocks the calling thread (via cooperative polling) until `slot`'s
    /// value differs from `expected`, or `timeout` elapses.
    ///
    /// `wait(slot, expected, Duration::ZERO)` is a non-blocking peek, per
    /// spec.md §8's boundary behavior.
    pub fn wait(&self, slot: usize, expected: i32, timeout: Duration) -> WaitOutcome {
        let current = self.load(slot);
        if current != expected {
            return WaitOutcome::NotEqual;
        }
        if timeout.is_zero() {
            return WaitOutcome::TimedOut;
        }
        let deadline = Instant::now() + timeout;
        loop {
            std::thread::sleep(POLL_INTERVAL.min(timeout));
            if self.load(slot) != expected {
                return WaitOutcome::Woken;
            }
            if Instant::now() >= deadline {
                return WaitOutcome::TimedOut;
            }
        }
    }

    /// No-op landing pad for API parity with spec.md §4.1's `wake`. Since
    /// this implementation always uses cooperative polling (see
    /// [`POLL_INTERVAL`]), no thread is ever parked in the OS scheduler for
    /// `wake` to release.
    pub fn wake(&self, _slot: usize, _n: u32) {}
}

/// Returned by [`AtomicIndex::store`] when the panic latch is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("fabric panic latch is set; only reads and panic-slot writes are permitted")]
pub struct PanicLatched;

#[cfg(test)]
mod tests {
    use super::*;

    fn new_index() -> (Vec<u8>, AtomicIndex) {
        let mut buf = vec![0u8; crate::layout::ATOMIC_INDEX_BYTES];
        let idx = unsafe { AtomicIndex::from_raw(buf.as_mut_ptr()) };
        idx.reset();
        (buf, idx)
    }

    #[test]
    fn store_then_load_roundtrips() {
        let (_buf, idx) = new_index();
        idx.store(slot::PHYSICS_EPOCH, 7).unwrap();
        assert_eq!(idx.load(slot::PHYSICS_EPOCH), 7);
    }

    #[test]
    fn add_returns_previous_value() {
        let (_buf, idx) = new_index();
        idx.store(slot::GLOBAL_EPOCH, 10).unwrap();
        let prev = idx.add(slot::GLOBAL_EPOCH, 5);
        assert_eq!(prev, 10);
        assert_eq!(idx.load(slot::GLOBAL_EPOCH), 15);
    }

    #[test]
    fn wait_zero_timeout_is_nonblocking_peek() {
        let (_buf, idx) = new_index();
        idx.store(slot::PHYSICS_EPOCH, 3).unwrap();
        assert_eq!(
            idx.wait(slot::PHYSICS_EPOCH, 3, Duration::ZERO),
            WaitOutcome::TimedOut
        );
        assert_eq!(
            idx.wait(slot::PHYSICS_EPOCH, 4, Duration::ZERO),
            WaitOutcome::NotEqual
        );
    }

    #[test]
    fn wait_wakes_when_another_thread_bumps_the_epoch() {
        let (_buf, idx) = new_index();
        idx.store(slot::PHYSICS_EPOCH, 0).unwrap();
        let idx2 = idx;
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            idx2.add(slot::PHYSICS_EPOCH, 1);
        });
        let outcome = idx.wait(slot::PHYSICS_EPOCH, 0, Duration::from_secs(1));
        handle.join().unwrap();
        assert_eq!(outcome, WaitOutcome::Woken);
    }

    #[test]
    fn panic_latch_blocks_further_writes_except_to_panic_slot() {
        let (_buf, idx) = new_index();
        idx.latch_panic(42);
        assert!(idx.is_panicked());
        assert!(idx.store(slot::PHYSICS_EPOCH, 1).is_err());
        // Re-latching is permitted (idempotent).
        idx.latch_panic(42);
    }
}
