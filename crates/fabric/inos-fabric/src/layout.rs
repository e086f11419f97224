//! Compile-time layout of the shared region `S`.
//!
//! Every offset here is a constant, never computed from a runtime-sized
//! input. This mirrors `lithos_icc::shm_layout`'s `RingHeader`/`bytes_for_ring`
//! approach of fixing the binary shape ahead of time; the difference is that
//! `S` carries many regions side by side instead of one ring per file.
//!
//! Sizes are picked for a reference single-process deployment (comfortably
//! inside the 32 MiB .. 1 GiB window spec.md §3 allows) and round each region
//! up to a 64-byte boundary so no region shares a cache line with the next
//! header.

#[inline(always)]
const fn align_up(x: usize, align: usize) -> usize {
    (x + align - 1) & !(align - 1)
}

// ─── Atomic index array ────────────────────────────────────────────────────
//
// Resolves the spec's open question about slots 0..31 ("first 128 bytes / 32
// words") vs. the table's use of slots up to 38: the array is widened to 64
// words (256 bytes). Slots 0..31 are the literal legacy array; 32..63 are a
// contiguous extension in the same region. Callers address both halves
// through the same `AtomicIndex::load`/`store` API.

pub const ATOMIC_INDEX_WORDS: usize = 64;
pub const ATOMIC_INDEX_BYTES: usize = ATOMIC_INDEX_WORDS * 4;

pub mod slot {
    //! Named atomic index slots, per spec.md §3's reserved-slot table.
    pub const KERNEL_READY: usize = 0;
    pub const INBOX_DIRTY: usize = 1;
    pub const HOST_OUTBOX_DIRTY: usize = 2;
    pub const PANIC: usize = 3;
    pub const DOMAIN_SENSOR: usize = 4;
    pub const DOMAIN_ACTOR: usize = 5;
    pub const DOMAIN_STORAGE: usize = 6;
    pub const DOMAIN_SYSTEM: usize = 7;
    pub const PULSE: usize = 8;
    pub const VISIBILITY: usize = 9;
    pub const POWER: usize = 10;
    // 11..15 reserved.
    pub const ARENA_BUMP: usize = 16;
    // 17, 18: legacy mutex slots, unused.
    pub const METRICS_EPOCH: usize = 19;
    pub const PHYSICS_EPOCH: usize = 20;
    pub const MATRIX_EPOCH: usize = 21;
    pub const PINGPONG_ACTIVE: usize = 22;
    pub const REGISTRY_EPOCH: usize = 23;
    pub const EVOLUTION_EPOCH: usize = 24;
    pub const HEALTH_EPOCH: usize = 25;
    pub const LEARNING_EPOCH: usize = 26;
    pub const ECONOMY_EPOCH: usize = 27;
    pub const COUNT_EPOCH: usize = 28;
    pub const GLOBAL_EPOCH: usize = 29;
    pub const KERNEL_OUTBOX_DIRTY: usize = 30;
    pub const CONTEXT_ID: usize = 31;
    // Extended array (see module docs).
    pub const DELEGATED_JOB_EPOCH: usize = 32;
    pub const USER_JOB_EPOCH: usize = 33;
    pub const CHUNK_JOB_EPOCH: usize = 34;
    pub const MESH_EVENT_EPOCH: usize = 35;
    pub const EVENT_HEAD: usize = 36;
    pub const EVENT_TAIL: usize = 37;
    pub const EVENT_DROPPED: usize = 38;
    // Head/tail counter pairs for the remaining rings. Not in spec.md's
    // reserved-slot table (which only names the Mesh Event Queue's), added
    // here in the extended half of the array for the other five rings
    // `inos-fabric::Ring` needs a counter pair for.
    pub const INBOX_HEAD: usize = 39;
    pub const INBOX_TAIL: usize = 40;
    pub const HOST_OUTBOX_HEAD: usize = 41;
    pub const HOST_OUTBOX_TAIL: usize = 42;
    pub const KERNEL_OUTBOX_HEAD: usize = 43;
    pub const KERNEL_OUTBOX_TAIL: usize = 44;
    pub const ARENA_REQUEST_HEAD: usize = 45;
    pub const ARENA_REQUEST_TAIL: usize = 46;
    pub const ARENA_RESPONSE_HEAD: usize = 47;
    pub const ARENA_RESPONSE_TAIL: usize = 48;
}

// ─── Region sizes ───────────────────────────────────────────────────────────

pub const SUPERVISOR_ALLOC_BYTES: usize = 64 * 1024;
pub const MODULE_REGISTRY_CAPACITY: usize = 256;
pub const MODULE_REGISTRY_ENTRY_BYTES: usize = 128;
pub const MODULE_REGISTRY_BYTES: usize = MODULE_REGISTRY_CAPACITY * MODULE_REGISTRY_ENTRY_BYTES;
pub const BLOOM_FILTER_BYTES: usize = 64 * 1024;
pub const SUPERVISOR_HEADERS_BYTES: usize = 4096;
pub const SYSCALL_TABLE_CAPACITY: usize = 512;
pub const SYSCALL_TABLE_ENTRY_BYTES: usize = 64;
pub const SYSCALL_TABLE_BYTES: usize = SYSCALL_TABLE_CAPACITY * SYSCALL_TABLE_ENTRY_BYTES;
pub const MESH_METRICS_BYTES: usize = 4096;
pub const GLOBAL_ANALYTICS_BYTES: usize = 4096;
pub const ECONOMICS_BYTES: usize = 64 * 1024;
pub const IDENTITY_REGISTRY_CAPACITY: usize = 1024;
pub const IDENTITY_REGISTRY_ENTRY_BYTES: usize = 64;
pub const IDENTITY_REGISTRY_BYTES: usize = IDENTITY_REGISTRY_CAPACITY * IDENTITY_REGISTRY_ENTRY_BYTES;
pub const SOCIAL_GRAPH_BYTES: usize = 64 * 1024;
pub const PATTERN_EXCHANGE_BYTES: usize = 64 * 1024;
pub const JOB_HISTORY_CAPACITY: usize = 4096;
pub const JOB_HISTORY_ENTRY_BYTES: usize = 64;
pub const JOB_HISTORY_BYTES: usize = JOB_HISTORY_CAPACITY * JOB_HISTORY_ENTRY_BYTES;
pub const COORDINATION_BYTES: usize = 4096;

pub const INBOX_CAPACITY: usize = 4096;
pub const INBOX_SLOT_BYTES: usize = 256;
pub const INBOX_BYTES: usize = INBOX_CAPACITY * INBOX_SLOT_BYTES;

pub const HOST_OUTBOX_CAPACITY: usize = 4096;
pub const HOST_OUTBOX_SLOT_BYTES: usize = 512;
pub const HOST_OUTBOX_BYTES: usize = HOST_OUTBOX_CAPACITY * HOST_OUTBOX_SLOT_BYTES;

pub const KERNEL_OUTBOX_CAPACITY: usize = 4096;
pub const KERNEL_OUTBOX_SLOT_BYTES: usize = 512;
pub const KERNEL_OUTBOX_BYTES: usize = KERNEL_OUTBOX_CAPACITY * KERNEL_OUTBOX_SLOT_BYTES;

pub const ARENA_BYTES: usize = 32 * 1024 * 1024;

pub const DIAGNOSTICS_BYTES: usize = 4096;
pub const BRIDGE_METRICS_BYTES: usize = 4096;

pub const ARENA_REQUEST_CAPACITY: usize = 1024;
pub const ARENA_REQUEST_SLOT_BYTES: usize = 32;
pub const ARENA_REQUEST_BYTES: usize = ARENA_REQUEST_CAPACITY * ARENA_REQUEST_SLOT_BYTES;

pub const ARENA_RESPONSE_CAPACITY: usize = 1024;
pub const ARENA_RESPONSE_SLOT_BYTES: usize = 16;
pub const ARENA_RESPONSE_BYTES: usize = ARENA_RESPONSE_CAPACITY * ARENA_RESPONSE_SLOT_BYTES;

pub const MESH_EVENT_CAPACITY: usize = 8192;
pub const MESH_EVENT_SLOT_BYTES: usize = 256;
pub const MESH_EVENT_BYTES: usize = MESH_EVENT_CAPACITY * MESH_EVENT_SLOT_BYTES;

// Each ring's "ready" side table: one byte per slot, distinct from the
// payload bytes, so a consumer can tell "producer claimed this slot but
// hasn't finished writing it" apart from "slot holds a finished item" (see
// `ring.rs`). Sized off each ring's own capacity constant above.
pub const INBOX_READY_BYTES: usize = INBOX_CAPACITY;
pub const HOST_OUTBOX_READY_BYTES: usize = HOST_OUTBOX_CAPACITY;
pub const KERNEL_OUTBOX_READY_BYTES: usize = KERNEL_OUTBOX_CAPACITY;
pub const ARENA_REQUEST_READY_BYTES: usize = ARENA_REQUEST_CAPACITY;
pub const ARENA_RESPONSE_READY_BYTES: usize = ARENA_RESPONSE_CAPACITY;
pub const MESH_EVENT_READY_BYTES: usize = MESH_EVENT_CAPACITY;

pub const REGION_GUARD_CAPACITY: usize = 256;
pub const REGION_GUARD_ENTRY_BYTES: usize = 16;
pub const REGION_GUARDS_BYTES: usize = REGION_GUARD_CAPACITY * REGION_GUARD_ENTRY_BYTES;

/// Number of simultaneously-tracked entities in the batched physics unit.
pub const ENTITY_CAPACITY: usize = 1024;
/// Bytes per entity record: position(12) + velocity(12) + orientation quat(16)
/// + angular velocity(12) + control inputs(16) + flags/checksum(8), rounded
/// up to a 16-byte multiple.
pub const ENTITY_STRIDE_BYTES: usize = 80;
pub const ENTITY_STATE_HEADER_BYTES: usize = 64;
pub const STATE_BUFFER_BYTES: usize = ENTITY_CAPACITY * ENTITY_STRIDE_BYTES;

pub const MATRIX_STRIDE_BYTES: usize = 16;
pub const MATRIX_BUFFER_BYTES: usize = ENTITY_CAPACITY * MATRIX_STRIDE_BYTES;

// ─── Offsets ────────────────────────────────────────────────────────────────
//
// Each region starts immediately after the previous one, rounded up to a
// 64-byte boundary. Declared in the order spec.md §3's region table lists
// them.

pub const OFFSET_ATOMIC_FLAGS: usize = 0;
pub const OFFSET_SUPERVISOR_ALLOC: usize = align_up(OFFSET_ATOMIC_FLAGS + ATOMIC_INDEX_BYTES, 64);
pub const OFFSET_MODULE_REGISTRY: usize =
    align_up(OFFSET_SUPERVISOR_ALLOC + SUPERVISOR_ALLOC_BYTES, 64);
pub const OFFSET_BLOOM_FILTER: usize =
    align_up(OFFSET_MODULE_REGISTRY + MODULE_REGISTRY_BYTES, 64);
pub const OFFSET_SUPERVISOR_HEADERS: usize =
    align_up(OFFSET_BLOOM_FILTER + BLOOM_FILTER_BYTES, 64);
pub const OFFSET_SYSCALL_TABLE: usize =
    align_up(OFFSET_SUPERVISOR_HEADERS + SUPERVISOR_HEADERS_BYTES, 64);
pub const OFFSET_MESH_METRICS: usize = align_up(OFFSET_SYSCALL_TABLE + SYSCALL_TABLE_BYTES, 64);
pub const OFFSET_GLOBAL_ANALYTICS: usize =
    align_up(OFFSET_MESH_METRICS + MESH_METRICS_BYTES, 64);
pub const OFFSET_ECONOMICS: usize =
    align_up(OFFSET_GLOBAL_ANALYTICS + GLOBAL_ANALYTICS_BYTES, 64);
pub const OFFSET_IDENTITY_REGISTRY: usize = align_up(OFFSET_ECONOMICS + ECONOMICS_BYTES, 64);
pub const OFFSET_SOCIAL_GRAPH: usize =
    align_up(OFFSET_IDENTITY_REGISTRY + IDENTITY_REGISTRY_BYTES, 64);
pub const OFFSET_PATTERN_EXCHANGE: usize =
    align_up(OFFSET_SOCIAL_GRAPH + SOCIAL_GRAPH_BYTES, 64);
pub const OFFSET_JOB_HISTORY: usize =
    align_up(OFFSET_PATTERN_EXCHANGE + PATTERN_EXCHANGE_BYTES, 64);
pub const OFFSET_COORDINATION: usize = align_up(OFFSET_JOB_HISTORY + JOB_HISTORY_BYTES, 64);
pub const OFFSET_INBOX: usize = align_up(OFFSET_COORDINATION + COORDINATION_BYTES, 64);
pub const OFFSET_HOST_OUTBOX: usize = align_up(OFFSET_INBOX + INBOX_BYTES, 64);
pub const OFFSET_KERNEL_OUTBOX: usize = align_up(OFFSET_HOST_OUTBOX + HOST_OUTBOX_BYTES, 64);
pub const OFFSET_ARENA: usize = align_up(OFFSET_KERNEL_OUTBOX + KERNEL_OUTBOX_BYTES, 64);
pub const OFFSET_DIAGNOSTICS: usize = align_up(OFFSET_ARENA + ARENA_BYTES, 64);
pub const OFFSET_BRIDGE_METRICS: usize =
    align_up(OFFSET_DIAGNOSTICS + DIAGNOSTICS_BYTES, 64);
pub const OFFSET_ARENA_REQUEST: usize =
    align_up(OFFSET_BRIDGE_METRICS + BRIDGE_METRICS_BYTES, 64);
pub const OFFSET_ARENA_RESPONSE: usize =
    align_up(OFFSET_ARENA_REQUEST + ARENA_REQUEST_BYTES, 64);
pub const OFFSET_MESH_EVENT_QUEUE: usize =
    align_up(OFFSET_ARENA_RESPONSE + ARENA_RESPONSE_BYTES, 64);
pub const OFFSET_INBOX_READY: usize =
    align_up(OFFSET_MESH_EVENT_QUEUE + MESH_EVENT_BYTES, 64);
pub const OFFSET_HOST_OUTBOX_READY: usize =
    align_up(OFFSET_INBOX_READY + INBOX_READY_BYTES, 64);
pub const OFFSET_KERNEL_OUTBOX_READY: usize =
    align_up(OFFSET_HOST_OUTBOX_READY + HOST_OUTBOX_READY_BYTES, 64);
pub const OFFSET_ARENA_REQUEST_READY: usize =
    align_up(OFFSET_KERNEL_OUTBOX_READY + KERNEL_OUTBOX_READY_BYTES, 64);
pub const OFFSET_ARENA_RESPONSE_READY: usize =
    align_up(OFFSET_ARENA_REQUEST_READY + ARENA_REQUEST_READY_BYTES, 64);
pub const OFFSET_MESH_EVENT_READY: usize =
    align_up(OFFSET_ARENA_RESPONSE_READY + ARENA_RESPONSE_READY_BYTES, 64);
pub const OFFSET_REGION_GUARDS: usize =
    align_up(OFFSET_MESH_EVENT_READY + MESH_EVENT_READY_BYTES, 64);
pub const OFFSET_ENTITY_STATE_HEADER: usize =
    align_up(OFFSET_REGION_GUARDS + REGION_GUARDS_BYTES, 64);
pub const OFFSET_STATE_BUFFER_A: usize =
    align_up(OFFSET_ENTITY_STATE_HEADER + ENTITY_STATE_HEADER_BYTES, 64);
pub const OFFSET_STATE_BUFFER_B: usize = align_up(OFFSET_STATE_BUFFER_A + STATE_BUFFER_BYTES, 64);
pub const OFFSET_MATRIX_BUFFER_A: usize =
    align_up(OFFSET_STATE_BUFFER_B + STATE_BUFFER_BYTES, 64);
pub const OFFSET_MATRIX_BUFFER_B: usize =
    align_up(OFFSET_MATRIX_BUFFER_A + MATRIX_BUFFER_BYTES, 64);

/// Total size of `S` for the reference layout above. Falls inside the
/// 32 MiB .. 1 GiB window spec.md §3 requires, rounded up to a 4 KiB page.
pub const TOTAL_REGION_BYTES: usize =
    align_up(OFFSET_MATRIX_BUFFER_B + MATRIX_BUFFER_BYTES, 4096);

/// Identifies one entry of the region table. Mirrors spec.md §3's
/// "compile-time catalog of (name, offset, length) triples".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RegionId {
    AtomicFlags,
    SupervisorAlloc,
    ModuleRegistry,
    BloomFilter,
    SupervisorHeaders,
    SyscallTable,
    MeshMetrics,
    GlobalAnalytics,
    Economics,
    IdentityRegistry,
    SocialGraph,
    PatternExchange,
    JobHistory,
    Coordination,
    Inbox,
    HostOutbox,
    KernelOutbox,
    Arena,
    Diagnostics,
    BridgeMetrics,
    ArenaRequestQueue,
    ArenaResponseQueue,
    MeshEventQueue,
    InboxReady,
    HostOutboxReady,
    KernelOutboxReady,
    ArenaRequestReady,
    ArenaResponseReady,
    MeshEventReady,
    RegionGuards,
    EntityStateHeader,
    StateBufferA,
    StateBufferB,
    MatrixBufferA,
    MatrixBufferB,
}

impl RegionId {
    /// Returns the `(offset, length)` window for this region within `S`.
    pub const fn window(self) -> (usize, usize) {
        use RegionId::*;
        match self {
            AtomicFlags => (OFFSET_ATOMIC_FLAGS, ATOMIC_INDEX_BYTES),
            SupervisorAlloc => (OFFSET_SUPERVISOR_ALLOC, SUPERVISOR_ALLOC_BYTES),
            ModuleRegistry => (OFFSET_MODULE_REGISTRY, MODULE_REGISTRY_BYTES),
            BloomFilter => (OFFSET_BLOOM_FILTER, BLOOM_FILTER_BYTES),
            SupervisorHeaders => (OFFSET_SUPERVISOR_HEADERS, SUPERVISOR_HEADERS_BYTES),
            SyscallTable => (OFFSET_SYSCALL_TABLE, SYSCALL_TABLE_BYTES),
            MeshMetrics => (OFFSET_MESH_METRICS, MESH_METRICS_BYTES),
            GlobalAnalytics => (OFFSET_GLOBAL_ANALYTICS, GLOBAL_ANALYTICS_BYTES),
            Economics => (OFFSET_ECONOMICS, ECONOMICS_BYTES),
            IdentityRegistry => (OFFSET_IDENTITY_REGISTRY, IDENTITY_REGISTRY_BYTES),
            SocialGraph => (OFFSET_SOCIAL_GRAPH, SOCIAL_GRAPH_BYTES),
            PatternExchange => (OFFSET_PATTERN_EXCHANGE, PATTERN_EXCHANGE_BYTES),
            JobHistory => (OFFSET_JOB_HISTORY, JOB_HISTORY_BYTES),
            Coordination => (OFFSET_COORDINATION, COORDINATION_BYTES),
            Inbox => (OFFSET_INBOX, INBOX_BYTES),
            HostOutbox => (OFFSET_HOST_OUTBOX, HOST_OUTBOX_BYTES),
            KernelOutbox => (OFFSET_KERNEL_OUTBOX, KERNEL_OUTBOX_BYTES),
            Arena => (OFFSET_ARENA, ARENA_BYTES),
            Diagnostics => (OFFSET_DIAGNOSTICS, DIAGNOSTICS_BYTES),
            BridgeMetrics => (OFFSET_BRIDGE_METRICS, BRIDGE_METRICS_BYTES),
            ArenaRequestQueue => (OFFSET_ARENA_REQUEST, ARENA_REQUEST_BYTES),
            ArenaResponseQueue => (OFFSET_ARENA_RESPONSE, ARENA_RESPONSE_BYTES),
            MeshEventQueue => (OFFSET_MESH_EVENT_QUEUE, MESH_EVENT_BYTES),
            InboxReady => (OFFSET_INBOX_READY, INBOX_READY_BYTES),
            HostOutboxReady => (OFFSET_HOST_OUTBOX_READY, HOST_OUTBOX_READY_BYTES),
            KernelOutboxReady => (OFFSET_KERNEL_OUTBOX_READY, KERNEL_OUTBOX_READY_BYTES),
            ArenaRequestReady => (OFFSET_ARENA_REQUEST_READY, ARENA_REQUEST_READY_BYTES),
            ArenaResponseReady => (OFFSET_ARENA_RESPONSE_READY, ARENA_RESPONSE_READY_BYTES),
            MeshEventReady => (OFFSET_MESH_EVENT_READY, MESH_EVENT_READY_BYTES),
            RegionGuards => (OFFSET_REGION_GUARDS, REGION_GUARDS_BYTES),
            EntityStateHeader => (OFFSET_ENTITY_STATE_HEADER, ENTITY_STATE_HEADER_BYTES),
            StateBufferA => (OFFSET_STATE_BUFFER_A, STATE_BUFFER_BYTES),
            StateBufferB => (OFFSET_STATE_BUFFER_B, STATE_BUFFER_BYTES),
            MatrixBufferA => (OFFSET_MATRIX_BUFFER_A, MATRIX_BUFFER_BYTES),
            MatrixBufferB => (OFFSET_MATRIX_BUFFER_B, MATRIX_BUFFER_BYTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every region must lie fully inside `S` and never overlap the one
    /// after it — the core invariant from spec.md §8.
    #[test]
    fn regions_are_in_bounds_and_non_overlapping() {
        let ids = [
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
            RegionId::RegionGuards,
            RegionId::EntityStateHeader,
            RegionId::StateBufferA,
            RegionId::StateBufferB,
            RegionId::MatrixBufferA,
            RegionId::MatrixBufferB,
        ];
        let mut prev_end = 0usize;
        for id in ids {
            let (offset, len) = id.window();
            assert!(offset >= prev_end, "{id:?} overlaps the previous region");
            assert!(
                offset + len <= TOTAL_REGION_BYTES,
                "{id:?} window exceeds total region size"
            );
            prev_end = offset + len;
        }
    }

    #[test]
    fn total_region_size_is_in_spec_window() {
        assert!(TOTAL_REGION_BYTES >= 32 * 1024 * 1024);
        assert!(TOTAL_REGION_BYTES <= 1024 * 1024 * 1024);
        assert_eq!(TOTAL_REGION_BYTES % 4096, 0);
    }
}
