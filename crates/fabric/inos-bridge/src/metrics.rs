//! Bridge metrics — spec.md §4.2.
//!
//! Hit/miss counters are always recorded into the bridge-metrics region so
//! external dashboards can sample them. Latency histograms are gated behind
//! the `record-latency` feature, mirroring `lithos_perf_recorder`'s
//! zero-cost-when-off split: without the feature, `record_latency` compiles
//! to nothing and the histogram buckets are never touched.

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of log2-spaced latency buckets kept when `record-latency` is on.
pub const LATENCY_BUCKETS: usize = 16;

#[repr(C)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    buckets: [AtomicU64; LATENCY_BUCKETS],
}

/// A view over the bridge-metrics region. Does not own the memory; callers
/// construct it over the region `Fabric::write_raw(RegionId::BridgeMetrics)`
/// hands back.
pub struct BridgeMetrics {
    counters: *const Counters,
}

unsafe impl Send for BridgeMetrics {}
unsafe impl Sync for BridgeMetrics {}

impl BridgeMetrics {
    /// # Safety
    /// `base` must point to at least `size_of::<Counters>()` valid bytes,
    /// 8-byte aligned, for the fabric's lifetime.
    pub unsafe fn from_raw(base: *mut u8) -> Self {
        Self {
            counters: base as *const Counters,
        }
    }

    fn counters(&self) -> &Counters {
        unsafe { &*self.counters }
    }

    pub fn reset(&self) {
        let c = self.counters();
        c.hits.store(0, Ordering::Relaxed);
        c.misses.store(0, Ordering::Relaxed);
        for b in &c.buckets {
            b.store(0, Ordering::Relaxed);
        }
    }

    pub fn record_hit(&self) {
        self.counters().hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.counters().misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.counters().hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.counters().misses.load(Ordering::Relaxed)
    }

    #[cfg(feature = "record-latency")]
    pub fn record_latency(&self, duration_ns: u64) {
        let bucket = bucket_for(duration_ns);
        self.counters().buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(not(feature = "record-latency"))]
    #[inline(always)]
    pub fn record_latency(&self, _duration_ns: u64) {}

    #[cfg(feature = "record-latency")]
    pub fn latency_histogram(&self) -> [u64; LATENCY_BUCKETS] {
        let mut out = [0u64; LATENCY_BUCKETS];
        for (i, b) in self.counters().buckets.iter().enumerate() {
            out[i] = b.load(Ordering::Relaxed);
        }
        out
    }
}

#[cfg(feature = "record-latency")]
fn bucket_for(duration_ns: u64) -> usize {
    // log2-spaced: bucket 0 is <1us, bucket i covers [2^(i-1)us, 2^i us).
    let micros = duration_ns / 1000;
    let bucket = 64 - micros.saturating_add(1).leading_zeros() as usize;
    bucket.min(LATENCY_BUCKETS - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_metrics() -> (Vec<u8>, BridgeMetrics) {
        let mut buf = vec![0u8; std::mem::size_of::<Counters>()];
        let m = unsafe { BridgeMetrics::from_raw(buf.as_mut_ptr()) };
        m.reset();
        (buf, m)
    }

    #[test]
    fn hits_and_misses_count_independently() {
        let (_buf, m) = new_metrics();
        m.record_hit();
        m.record_hit();
        m.record_miss();
        assert_eq!(m.hits(), 2);
        assert_eq!(m.misses(), 1);
    }

    #[cfg(feature = "record-latency")]
    #[test]
    fn latency_samples_land_in_increasing_buckets() {
        let (_buf, m) = new_metrics();
        m.record_latency(500); // < 1us
        m.record_latency(50_000); // 50us
        let hist = m.latency_histogram();
        assert!(hist.iter().sum::<u64>() == 2);
    }
}
