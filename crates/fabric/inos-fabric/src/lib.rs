//! `inos-fabric`: the shared-memory fabric `S`.
//!
//! Generalizes `lithos-icc`'s single-ring-per-file shared memory model into a
//! single fixed-layout region carrying many regions side by side: an atomic
//! index array, a batch of typed data regions, several ring queues, a
//! ping-pong pair, a bump arena, and a region-guard table. One process (the
//! Supervisor) owns the backing mapping; every other worker maps the same
//! file or receives the same anonymous mapping via `fork`, per spec.md §4.1.

pub mod arena;
pub mod atomic_index;
pub mod error;
pub mod guard;
pub mod layout;
pub mod pingpong;
pub mod ring;

use std::path::Path;
use std::time::Duration;

use inos_mmap::SharedRegion;

pub use arena::{Arena, ArenaRequest, ArenaResponse};
pub use atomic_index::{AtomicIndex, WaitOutcome};
pub use error::FabricError;
pub use guard::GuardTable;
pub use layout::{RegionId, TOTAL_REGION_BYTES};
pub use pingpong::PingPong;
pub use ring::Ring;

/// The shared-memory fabric: a mapped region plus the typed views over it.
///
/// `Fabric` owns the backing `SharedRegion` and hands out raw windows into
/// it; higher layers (`inos-bridge`, `inos-supervisor`, `inos-physics`) wrap
/// those windows in domain types. `Fabric` itself knows nothing about job
/// envelopes or entity state — only bytes, offsets, and the atomic
/// primitives spec.md §4.1 defines over them.
pub struct Fabric {
    region: SharedRegion,
    index: AtomicIndex,
    guards: GuardTable,
}

impl Fabric {
    /// Maps a fresh anonymous region sized per [`layout::TOTAL_REGION_BYTES`]
    /// and zero-initializes the atomic index and guard table. Used by a
    /// single-process deployment or as the parent side of a `fork`-shared
    /// mapping.
    pub fn create_anon() -> Result<Self, FabricError> {
        let region = SharedRegion::create_anon(layout::TOTAL_REGION_BYTES)
            .map_err(|_| FabricError::OutOfBounds)?;
        Ok(Self::from_region(region, true))
    }

    /// Maps `path` as the backing file, creating and sizing it if it doesn't
    /// exist. Used for cross-process deployments where workers map the same
    /// file independently rather than inheriting via `fork`.
    pub fn create_file(path: impl AsRef<Path>) -> Result<Self, FabricError> {
        let region = SharedRegion::create_file(path, layout::TOTAL_REGION_BYTES as u64)
            .map_err(|_| FabricError::OutOfBounds)?;
        Ok(Self::from_region(region, true))
    }

    /// Opens an existing backing file without touching its contents — used
    /// by a worker joining a fabric another process already initialized.
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, FabricError> {
        let region = SharedRegion::open_file(path).map_err(|_| FabricError::OutOfBounds)?;
        if region.len() != layout::TOTAL_REGION_BYTES {
            return Err(FabricError::OutOfBounds);
        }
        Ok(Self::from_region(region, false))
    }

    fn from_region(mut region: SharedRegion, initialize: bool) -> Self {
        let base = region.as_mut_ptr();
        let index = unsafe { AtomicIndex::from_raw(base) };
        let (guards_off, _) = RegionId::RegionGuards.window();
        let guards = unsafe { GuardTable::from_raw(base.add(guards_off)) };
        if initialize {
            index.reset();
            guards.reset();
            for id in ALL_REGIONS {
                guards.publish(*id, 1);
            }
        }
        Self {
            region,
            index,
            guards,
        }
    }

    pub fn size(&self) -> usize {
        self.region.len()
    }

    pub fn atomic_index(&self) -> AtomicIndex {
        self.index
    }

    pub fn guards(&self) -> &GuardTable {
        &self.guards
    }

    /// Raw read of `region`'s bytes. Checked against the guard table unless
    /// `region` is [`RegionId::RegionGuards`] itself (which has no guard).
    pub fn read_raw(&self, region: RegionId) -> Result<&[u8], FabricError> {
        if region != RegionId::RegionGuards {
            if let Some(version) = self.guards.version_of(region) {
                self.guards.check(region, version)?;
            }
        }
        let (offset, len) = region.window();
        if offset + len > self.region.len() {
            return Err(FabricError::OutOfBounds);
        }
        Ok(&self.region.as_slice()[offset..offset + len])
    }

    /// Raw write window into `region`'s bytes. Same guard semantics as
    /// [`Fabric::read_raw`].
    pub fn write_raw(&mut self, region: RegionId) -> Result<&mut [u8], FabricError> {
        if region != RegionId::RegionGuards {
            if let Some(version) = self.guards.version_of(region) {
                self.guards.check(region, version)?;
            }
        }
        let (offset, len) = region.window();
        let total = self.region.len();
        if offset + len > total {
            return Err(FabricError::OutOfBounds);
        }
        Ok(&mut self.region.as_mut_slice()[offset..offset + len])
    }

    /// Returns a raw pointer to the start of `region`, for constructing a
    /// typed view ([`Ring`], [`PingPong`], [`Arena`]) over it. The caller is
    /// responsible for respecting the region's declared length.
    pub fn region_ptr(&mut self, region: RegionId) -> *mut u8 {
        let (offset, _) = region.window();
        unsafe { self.region.as_mut_ptr().add(offset) }
    }

    /// Builds a [`Ring`] over `data`/`ready`, using `head_slot`/`tail_slot`
    /// in the shared atomic index. Capacity is derived from `data`'s
    /// declared region length, so callers can't construct a ring whose
    /// capacity disagrees with `layout.rs`.
    ///
    /// # Panics
    /// If `data`'s region length isn't a multiple of `slot_bytes`, or if
    /// `ready`'s region length is smaller than the resulting capacity.
    pub fn ring(
        &mut self,
        data: RegionId,
        ready: RegionId,
        head_slot: usize,
        tail_slot: usize,
        slot_bytes: usize,
    ) -> Ring {
        let (_, data_len) = data.window();
        let (_, ready_len) = ready.window();
        assert_eq!(
            data_len % slot_bytes,
            0,
            "{data:?} length is not a multiple of slot_bytes"
        );
        let capacity = data_len / slot_bytes;
        assert!(
            ready_len >= capacity,
            "{ready:?} is too small to back {data:?} as a ready table"
        );
        let data_ptr = self.region_ptr(data);
        let ready_ptr = self.region_ptr(ready);
        unsafe {
            Ring::new(
                self.index,
                head_slot,
                tail_slot,
                data_ptr,
                ready_ptr,
                capacity,
                slot_bytes,
            )
        }
    }

    pub fn atomic_load(&self, slot: usize) -> i32 {
        self.index.load(slot)
    }

    pub fn atomic_store(&self, slot: usize, value: i32) -> Result<(), FabricError> {
        self.index.store(slot, value).map_err(Into::into)
    }

    pub fn atomic_add(&self, slot: usize, delta: i32) -> i32 {
        self.index.add(slot, delta)
    }

    pub fn wait(&self, slot: usize, expected: i32, timeout: Duration) -> WaitOutcome {
        self.index.wait(slot, expected, timeout)
    }

    pub fn wake(&self, slot: usize, n: u32) {
        self.index.wake(slot, n)
    }
}

const ALL_REGIONS: &[RegionId] = &[
    RegionId::AtomicFlags,
    RegionId::SupervisorAlloc,
    RegionId::ModuleRegistry,
    RegionId::BloomFilter,
    RegionId::SupervisorHeaders,
    RegionId::SyscallTable,
    RegionId::MeshMetrics,
    RegionId::GlobalAnalytics,
    RegionId::Economics,
    RegionId::IdentityRegistry,
    RegionId::SocialGraph,
    RegionId::PatternExchange,
    RegionId::JobHistory,
    RegionId::Coordination,
    RegionId::Inbox,
    RegionId::HostOutbox,
    RegionId::KernelOutbox,
    RegionId::Arena,
    RegionId::Diagnostics,
    RegionId::BridgeMetrics,
    RegionId::ArenaRequestQueue,
    RegionId::ArenaResponseQueue,
    RegionId::MeshEventQueue,
    RegionId::InboxReady,
    RegionId::HostOutboxReady,
    RegionId::KernelOutboxReady,
    RegionId::ArenaRequestReady,
    RegionId::ArenaResponseReady,
    RegionId::MeshEventReady,
    RegionId::EntityStateHeader,
    RegionId::StateBufferA,
    RegionId::StateBufferB,
    RegionId::MatrixBufferA,
    RegionId::MatrixBufferB,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_fabric_has_all_regions_guarded() {
        let fabric = Fabric::create_anon().unwrap();
        for id in ALL_REGIONS {
            assert!(fabric.read_raw(*id).is_ok());
        }
    }

    #[test]
    fn atomic_store_and_load_roundtrip_through_fabric() {
        let fabric = Fabric::create_anon().unwrap();
        fabric
            .atomic_store(layout::slot::GLOBAL_EPOCH, 42)
            .unwrap();
        assert_eq!(fabric.atomic_load(layout::slot::GLOBAL_EPOCH), 42);
    }

    #[test]
    fn out_of_range_window_is_rejected() {
        let fabric = Fabric::create_anon().unwrap();
        assert_eq!(fabric.size(), layout::TOTAL_REGION_BYTES);
    }

    #[test]
    fn ring_built_over_inbox_regions_round_trips() {
        let mut fabric = Fabric::create_anon().unwrap();
        let ring = fabric.ring(
            RegionId::Inbox,
            RegionId::InboxReady,
            layout::slot::INBOX_HEAD,
            layout::slot::INBOX_TAIL,
            layout::INBOX_SLOT_BYTES,
        );
        assert_eq!(ring.capacity(), layout::INBOX_CAPACITY);
        ring.produce(b"job").unwrap();
        let mut out = vec![0u8; layout::INBOX_SLOT_BYTES];
        let n = ring.consume(&mut out).unwrap();
        assert_eq!(&out[..n][..3], b"job");
    }
}
