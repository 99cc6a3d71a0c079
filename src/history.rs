//! Bounded metric snapshot history
//!
//! Append-only ordered buffer evicted by age and capacity. After every
//! insert, the buffer holds at most `max_size` entries and every retained
//! entry is within `window` of the newest timestamp. Single writer: only the
//! monitoring tick appends.

use crate::metrics::MetricSnapshot;
use std::collections::VecDeque;
use std::time::Duration;

/// Insertion-ordered snapshot store with age and capacity limits
#[derive(Debug)]
pub struct SampleHistory {
    samples: VecDeque<MetricSnapshot>,
    max_size: usize,
    window: Duration,
}

impl SampleHistory {
    pub fn new(max_size: usize, window: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_size),
            max_size,
            window,
        }
    }

    /// Insert a snapshot, then evict entries older than the retention window
    /// and oldest-first entries beyond capacity. No error conditions; the
    /// bounds are self-enforcing.
    pub fn append(&mut self, snapshot: MetricSnapshot) {
        let newest = snapshot.timestamp;
        self.samples.push_back(snapshot);

        while let Some(front) = self.samples.front() {
            if newest.duration_since(front.timestamp) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        while self.samples.len() > self.max_size {
            self.samples.pop_front();
        }
    }

    /// Retained snapshots in insertion order, optionally only the last `n`
    pub fn window(&self, n: Option<usize>) -> Vec<MetricSnapshot> {
        let len = self.samples.len();
        let skip = n.map_or(0, |n| len.saturating_sub(n));
        self.samples.iter().skip(skip).copied().collect()
    }

    pub fn latest(&self) -> Option<&MetricSnapshot> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
