//! `inos-bridge`: the process-wide accessor over the shared-memory fabric.
//!
//! Wraps an [`inos_fabric::Fabric`] with cached typed views and metrics
//! bookkeeping, following `lithos_icc`'s pattern of a thin consumer-side
//! wrapper around the raw mmap plus `lithos_perf_recorder`'s
//! feature-gated-metrics idiom (see [`metrics`]).

pub mod metrics;

use inos_fabric::{layout, AtomicIndex, Fabric, FabricError, RegionId};
use metrics::BridgeMetrics;

/// A read-only `(offset, length)` window into the fabric, handed back by
/// [`Bridge::get_region_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionView {
    pub offset: usize,
    pub length: usize,
}

pub struct Bridge {
    fabric: Fabric,
    metrics: BridgeMetrics,
}

impl Bridge {
    pub fn new(mut fabric: Fabric) -> Self {
        let metrics_ptr = fabric.region_ptr(RegionId::BridgeMetrics);
        let metrics = unsafe { BridgeMetrics::from_raw(metrics_ptr) };
        metrics.reset();
        Self { fabric, metrics }
    }

    /// `true` once the Supervisor has set the kernel-ready flag.
    pub fn is_ready(&self) -> bool {
        self.fabric.atomic_load(layout::slot::KERNEL_READY) == 1
    }

    pub fn atomic_load(&self, slot: usize) -> i32 {
        self.fabric.atomic_load(slot)
    }

    pub fn atomic_store(&self, slot: usize, value: i32) -> Result<(), FabricError> {
        self.fabric.atomic_store(slot, value)
    }

    pub fn atomic_add(&self, slot: usize, delta: i32) -> i32 {
        self.fabric.atomic_add(slot, delta)
    }

    pub fn wait(&self, slot: usize, expected: i32, timeout: std::time::Duration) -> inos_fabric::WaitOutcome {
        self.fabric.wait(slot, expected, timeout)
    }

    pub fn atomic_index(&self) -> AtomicIndex {
        self.fabric.atomic_index()
    }

    /// Returns the declared window for `region`, recording a bridge-metrics
    /// hit or miss depending on whether the guard check passes.
    pub fn get_region_view(&self, region: RegionId) -> Option<RegionView> {
        match self.fabric.read_raw(region) {
            Ok(_) => {
                self.metrics.record_hit();
                let (offset, length) = region.window();
                Some(RegionView { offset, length })
            }
            Err(_) => {
                self.metrics.record_miss();
                None
            }
        }
    }

    pub fn read_region(&self, region: RegionId) -> Result<&[u8], FabricError> {
        let start = std::time::Instant::now();
        let result = self.fabric.read_raw(region);
        self.metrics.record_latency(start.elapsed().as_nanos() as u64);
        match &result {
            Ok(_) => self.metrics.record_hit(),
            Err(_) => self.metrics.record_miss(),
        }
        result
    }

    pub fn write_region(&mut self, region: RegionId) -> Result<&mut [u8], FabricError> {
        self.fabric.write_raw(region)
    }

    pub fn region_ptr(&mut self, region: RegionId) -> *mut u8 {
        self.fabric.region_ptr(region)
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    pub fn fabric(&self) -> &Fabric {
        &self.fabric
    }

    pub fn fabric_mut(&mut self) -> &mut Fabric {
        &mut self.fabric
    }
}
