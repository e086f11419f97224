//! Region guards — spec.md §3/§4.1.
//!
//! A side table of versioned bounds descriptors. Every non-hot-path bridge
//! read is checked against the guard for the region it targets; a region
//! can be re-declared with a new length by bumping its version (e.g. after
//! arena growth), and a guard check against a stale version fails loudly
//! instead of silently reading the wrong bytes.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::FabricError;
use crate::layout::{RegionId, REGION_GUARD_CAPACITY};

/// One guard entry, 16 bytes: `{offset, length, version, flags}`.
#[repr(C)]
struct GuardEntry {
    offset: AtomicU32,
    length: AtomicU32,
    version: AtomicU32,
    flags: AtomicU32,
}

const _: () = assert!(std::mem::size_of::<GuardEntry>() == 16);

/// Flag bit set once a guard slot has been published at least once.
const FLAG_PUBLISHED: u32 = 1;

/// The region-guard table: up to [`REGION_GUARD_CAPACITY`] entries.
///
/// Entries are addressed by [`RegionId::guard_index`], not by a generic
/// free-list — every region the fabric defines gets exactly one guard slot,
/// assigned at compile time. This keeps lookups a single array index rather
/// than a scan.
#[derive(Clone, Copy)]
pub struct GuardTable {
    base: *const GuardEntry,
}

unsafe impl Send for GuardTable {}
unsafe impl Sync for GuardTable {}

impl GuardTable {
    /// # Safety
    /// `base` must point to at least `REGION_GUARD_CAPACITY * 16` valid,
    /// writable bytes, 4-byte aligned, for the fabric's lifetime.
    pub unsafe fn from_raw(base: *mut u8) -> Self {
        Self {
            base: base as *const GuardEntry,
        }
    }

    fn entry(&self, index: usize) -> &GuardEntry {
        assert!(index < REGION_GUARD_CAPACITY, "guard index out of range");
        // SAFETY: bounds-checked; `from_raw`'s contract covers the rest.
        unsafe { &*self.base.add(index) }
    }

    /// Zeroes every guard slot. Called once at fabric boot.
    pub fn reset(&self) {
        for i in 0..REGION_GUARD_CAPACITY {
            let e = self.entry(i);
            e.offset.store(0, Ordering::Relaxed);
            e.length.store(0, Ordering::Relaxed);
            e.version.store(0, Ordering::Relaxed);
            e.flags.store(0, Ordering::Relaxed);
        }
    }

    /// Publishes (or republishes) the guard for `region` at `version`.
    /// Called by the Supervisor at boot for every declared region, and
    /// again whenever a region's effective length changes.
    pub fn publish(&self, region: RegionId, version: u32) {
        let (offset, length) = region.window();
        let e = self.entry(guard_index(region));
        e.offset.store(offset as u32, Ordering::Relaxed);
        e.length.store(length as u32, Ordering::Relaxed);
        e.version.store(version, Ordering::Release);
        e.flags.store(FLAG_PUBLISHED, Ordering::Release);
    }

    /// Validates that `region` is published with exactly `expected_version`
    /// and that its recorded window still matches the compile-time layout.
    pub fn check(&self, region: RegionId, expected_version: u32) -> Result<(), FabricError> {
        let e = self.entry(guard_index(region));
        if e.flags.load(Ordering::Acquire) & FLAG_PUBLISHED == 0 {
            return Err(FabricError::GuardViolation);
        }
        if e.version.load(Ordering::Acquire) != expected_version {
            return Err(FabricError::GuardViolation);
        }
        let (offset, length) = region.window();
        if e.offset.load(Ordering::Relaxed) != offset as u32
            || e.length.load(Ordering::Relaxed) != length as u32
        {
            return Err(FabricError::GuardViolation);
        }
        Ok(())
    }

    /// Current version recorded for `region`, or `None` if never published.
    pub fn version_of(&self, region: RegionId) -> Option<u32> {
        let e = self.entry(guard_index(region));
        if e.flags.load(Ordering::Acquire) & FLAG_PUBLISHED == 0 {
            None
        } else {
            Some(e.version.load(Ordering::Acquire))
        }
    }
}

/// Assigns each [`RegionId`] a stable guard-table slot.
fn guard_index(region: RegionId) -> usize {
    use RegionId::*;
    match region {
        AtomicFlags => 0,
        SupervisorAlloc => 1,
        ModuleRegistry => 2,
        BloomFilter => 3,
        SupervisorHeaders => 4,
        SyscallTable => 5,
        MeshMetrics => 6,
        GlobalAnalytics => 7,
        Economics => 8,
        IdentityRegistry => 9,
        SocialGraph => 10,
        PatternExchange => 11,
        JobHistory => 12,
        Coordination => 13,
        Inbox => 14,
        HostOutbox => 15,
        KernelOutbox => 16,
        Arena => 17,
        Diagnostics => 18,
        BridgeMetrics => 19,
        ArenaRequestQueue => 20,
        ArenaResponseQueue => 21,
        MeshEventQueue => 22,
        InboxReady => 23,
        HostOutboxReady => 24,
        KernelOutboxReady => 25,
        ArenaRequestReady => 26,
        ArenaResponseReady => 27,
        MeshEventReady => 28,
        RegionGuards => 29,
        EntityStateHeader => 30,
        StateBufferA => 31,
        StateBufferB => 32,
        MatrixBufferA => 33,
        MatrixBufferB => 34,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_table() -> (Vec<u8>, GuardTable) {
        let mut buf = vec![0u8; REGION_GUARD_CAPACITY * 16];
        let t = unsafe { GuardTable::from_raw(buf.as_mut_ptr()) };
        t.reset();
        (buf, t)
    }

    #[test]
    fn unpublished_region_fails_guard_check() {
        let (_buf, t) = new_table();
        assert_eq!(
            t.check(RegionId::Inbox, 1),
            Err(FabricError::GuardViolation)
        );
    }

    #[test]
    fn published_region_passes_with_matching_version() {
        let (_buf, t) = new_table();
        t.publish(RegionId::Inbox, 1);
        assert!(t.check(RegionId::Inbox, 1).is_ok());
    }

    #[test]
    fn stale_version_after_resize_fails_until_rebumped() {
        let (_buf, t) = new_table();
        t.publish(RegionId::Arena, 1);
        assert!(t.check(RegionId::Arena, 1).is_ok());
        assert_eq!(
            t.check(RegionId::Arena, 2),
            Err(FabricError::GuardViolation)
        );
        t.publish(RegionId::Arena, 2);
        assert!(t.check(RegionId::Arena, 2).is_ok());
    }
}
