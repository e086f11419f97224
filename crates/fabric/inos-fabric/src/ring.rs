//! Lock-free SPMC/MPSC ring queues — spec.md §4.1.
//!
//! Each ring has a power-of-two capacity `C` and two atomic-index slots,
//! `head` and `tail`, that only ever increase. A producer claims a slot with
//! `fetch_add(tail, 1)`; if the claimed position has lapped `head` by `C` the
//! ring is full and the claim is rolled back rather than overwriting unread
//! data. A consumer advances `head` with a compare-exchange loop so multiple
//! consumers can drain the same ring without losing or duplicating an entry.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::atomic_index::AtomicIndex;
use crate::error::FabricError;

/// A fixed-capacity ring of `SLOT_BYTES`-sized slots backed by two
/// [`AtomicIndex`] slots for `head`/`tail` and a raw byte buffer for the
/// payload.
///
/// `CAPACITY` must be a power of two; this is checked once in [`Ring::new`]
/// rather than encoded in the type, since the region sizes in `layout.rs`
/// are plain `usize` constants.
pub struct Ring {
    index: AtomicIndex,
    head_slot: usize,
    tail_slot: usize,
    data: *mut u8,
    capacity: usize,
    slot_bytes: usize,
    /// One byte per slot: 0 = empty, 1 = written-but-unread, 2 = claimed.
    /// Lets a consumer tell "producer claimed this slot but hasn't finished
    /// writing it yet" apart from "slot holds a finished item", without
    /// which a fast consumer could read a half-written payload.
    ready: *const AtomicU8,
}

unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    /// # Safety
    /// - `data` must point to `capacity * slot_bytes` valid, writable bytes.
    /// - `ready` must point to `capacity` valid, writable `AtomicU8` bytes,
    ///   distinct from `data`, for the fabric's lifetime.
    /// - `index` must outlive the returned `Ring`, and `head_slot`/`tail_slot`
    ///   must not be used for anything else.
    pub unsafe fn new(
        index: AtomicIndex,
        head_slot: usize,
        tail_slot: usize,
        data: *mut u8,
        ready: *mut u8,
        capacity: usize,
        slot_bytes: usize,
    ) -> Self {
        assert!(capacity.is_power_of_two(), "ring capacity must be a power of two");
        Self {
            index,
            head_slot,
            tail_slot,
            data,
            capacity,
            slot_bytes,
            ready: ready as *const AtomicU8,
        }
    }

    fn ready_cell(&self, index: usize) -> &AtomicU8 {
        unsafe { &*self.ready.add(index % self.capacity) }
    }

    fn slot_bytes_mut(&self, index: usize) -> &mut [u8] {
        let start = (index % self.capacity) * self.slot_bytes;
        unsafe { std::slice::from_raw_parts_mut(self.data.add(start), self.slot_bytes) }
    }

    fn slot_bytes_ref(&self, index: usize) -> &[u8] {
        let start = (index % self.capacity) * self.slot_bytes;
        unsafe { std::slice::from_raw_parts(self.data.add(start), self.slot_bytes) }
    }

    /// Number of items currently in the ring, as of this observation.
    pub fn len(&self) -> usize {
        let tail = self.index.load(self.tail_slot);
        let head = self.index.load(self.head_slot);
        (tail - head).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claims the next slot and copies `item` into it. `item.len()` must not
    /// exceed `slot_bytes`; the remainder of the slot is zero-padded.
    ///
    /// Returns [`FabricError::QueueFull`] without mutating the ring if the
    /// producer would overtake the consumer — overwriting unread data is
    /// never permitted.
    pub fn produce(&self, item: &[u8]) -> Result<(), FabricError> {
        assert!(item.len() <= self.slot_bytes, "item exceeds ring slot size");
        let tail = self.index.add(self.tail_slot, 1);
        let head = self.index.load(self.head_slot);
        if tail - head >= self.capacity as i32 {
            // Roll back: nothing was written, and fetch_add already
            // committed the bump, so hand the slot back.
            self.index.add(self.tail_slot, -1);
            return Err(FabricError::QueueFull);
        }
        let idx = tail as usize;
        let dst = self.slot_bytes_mut(idx);
        dst[..item.len()].copy_from_slice(item);
        dst[item.len()..].fill(0);
        self.ready_cell(idx).store(1, Ordering::Release);
        Ok(())
    }

    /// Consumes the oldest ready item into `out`, returning the number of
    /// bytes written. Returns [`FabricError::QueueEmpty`] if `head == tail`
    /// or the next slot hasn't finished being written yet.
    pub fn consume(&self, out: &mut [u8]) -> Result<usize, FabricError> {
        loop {
            let head = self.index.load(self.head_slot);
            let tail = self.index.load(self.tail_slot);
            if head >= tail {
                return Err(FabricError::QueueEmpty);
            }
            let idx = head as usize;
            if self.ready_cell(idx).load(Ordering::Acquire) != 1 {
                return Err(FabricError::QueueEmpty);
            }
            match self
                .index
                .compare_exchange(self.head_slot, head, head + 1)
            {
                Ok(_) => {
                    let n = self.slot_bytes.min(out.len());
                    out[..n].copy_from_slice(&self.slot_bytes_ref(idx)[..n]);
                    self.ready_cell(idx).store(0, Ordering::Release);
                    return Ok(n);
                }
                Err(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::slot;

    struct Harness {
        _index_buf: Vec<u8>,
        _data_buf: Vec<u8>,
        _ready_buf: Vec<u8>,
        ring: Ring,
    }

    fn make_ring(capacity: usize, slot_bytes: usize) -> Harness {
        let mut index_buf = vec![0u8; crate::layout::ATOMIC_INDEX_BYTES];
        let index = unsafe { AtomicIndex::from_raw(index_buf.as_mut_ptr()) };
        index.reset();
        let mut data_buf = vec![0u8; capacity * slot_bytes];
        let mut ready_buf = vec![0u8; capacity];
        let ring = unsafe {
            Ring::new(
                index,
                slot::EVENT_HEAD,
                slot::EVENT_TAIL,
                data_buf.as_mut_ptr(),
                ready_buf.as_mut_ptr(),
                capacity,
                slot_bytes,
            )
        };
        Harness {
            _index_buf: index_buf,
            _data_buf: data_buf,
            _ready_buf: ready_buf,
            ring,
        }
    }

    #[test]
    fn produce_then_consume_roundtrips() {
        let h = make_ring(4, 8);
        h.ring.produce(b"hello").unwrap();
        let mut out = [0u8; 8];
        let n = h.ring.consume(&mut out).unwrap();
        assert_eq!(&out[..n], b"hello\0\0\0");
    }

    #[test]
    fn consume_on_empty_ring_errs() {
        let h = make_ring(4, 8);
        let mut out = [0u8; 8];
        assert_eq!(h.ring.consume(&mut out), Err(FabricError::QueueEmpty));
    }

    #[test]
    fn full_ring_rejects_without_overwriting() {
        let h = make_ring(2, 4);
        h.ring.produce(b"aa").unwrap();
        h.ring.produce(b"bb").unwrap();
        assert_eq!(h.ring.produce(b"cc"), Err(FabricError::QueueFull));
        let mut out = [0u8; 4];
        let n = h.ring.consume(&mut out).unwrap();
        assert_eq!(&out[..n], b"aa\0\0");
        // Now there's room again.
        h.ring.produce(b"cc").unwrap();
        let n = h.ring.consume(&mut out).unwrap();
        assert_eq!(&out[..n], b"bb\0\0");
        let n = h.ring.consume(&mut out).unwrap();
        assert_eq!(&out[..n], b"cc\0\0");
    }

    #[test]
    fn fifo_order_is_preserved_across_wraparound() {
        let h = make_ring(2, 4);
        for round in 0..5u8 {
            h.ring.produce(&[round]).unwrap();
            let mut out = [0u8; 4];
            h.ring.consume(&mut out).unwrap();
            assert_eq!(out[0], round);
        }
    }
}
