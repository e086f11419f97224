//! Demand tracker — spec.md §4.4.
//!
//! Per-chunk access counter with exponential decay. Bucketed by raw access
//! count, then attenuated by recency: `score = bucket(count) * exp(-dt /
//! half_life)`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use inos_events::ContentHash;

struct Record {
    count: u64,
    last_access: Instant,
}

pub struct DemandTracker {
    records: HashMap<ContentHash, Record>,
    half_life: Duration,
}

impl DemandTracker {
    pub fn new(half_life: Duration) -> Self {
        Self {
            records: HashMap::new(),
            half_life,
        }
    }

    pub fn record_access(&mut self, hash: ContentHash) {
        let r = self.records.entry(hash).or_insert(Record {
            count: 0,
            last_access: Instant::now(),
        });
        r.count += 1;
        r.last_access = Instant::now();
    }

    /// Current demand score in `[0, 1]` for `hash`, or `0.0` if it has
    /// never been accessed.
    pub fn score(&self, hash: &ContentHash) -> f64 {
        let Some(r) = self.records.get(hash) else {
            return 0.0;
        };
        let bucket = bucket_score(r.count);
        let dt = r.last_access.elapsed().as_secs_f64();
        let half_life = self.half_life.as_secs_f64();
        let decay = if half_life > 0.0 {
            (-dt / half_life).exp()
        } else {
            1.0
        };
        bucket * decay
    }
}

fn bucket_score(count: u64) -> f64 {
    match count {
        0..=5 => 0.0,
        6..=20 => 0.5,
        21..=100 => 0.8,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_climbs_through_buckets_as_access_count_grows() {
        let mut tracker = DemandTracker::new(Duration::from_secs(3600));
        let hash = ContentHash([1u8; 32]);
        for _ in 0..6 {
            tracker.record_access(hash);
        }
        assert_eq!(tracker.score(&hash), 0.5);
        for _ in 0..95 {
            tracker.record_access(hash);
        }
        assert_eq!(tracker.score(&hash), 1.0);
    }

    #[test]
    fn unaccessed_chunk_has_zero_score() {
        let tracker = DemandTracker::new(Duration::from_secs(50));
        assert_eq!(tracker.score(&ContentHash([2u8; 32])), 0.0);
    }

    #[test]
    fn score_decays_toward_zero_after_the_half_life() {
        let mut tracker = DemandTracker::new(Duration::from_millis(5));
        let hash = ContentHash([3u8; 32]);
        for _ in 0..200 {
            tracker.record_access(hash);
        }
        let immediate = tracker.score(&hash);
        std::thread::sleep(Duration::from_millis(20));
        let later = tracker.score(&hash);
        assert!(later < immediate);
    }
}
