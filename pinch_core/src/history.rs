//! Bounded per-finger position history.
//!
//! `SampleRing` is the circular buffer: append overwrites the oldest item
//! once full, reads are by logical offset from either end, and
//! `total_added` keeps counting past the capacity. `PositionHistory` wraps a
//! ring of `FingerSample`s with the time of the last append.

use crate::error::HistoryError;
use crate::frame::FingerSample;
use std::collections::VecDeque;
use std::time::Duration;

/// Fixed-capacity ring with overwrite-on-full semantics.
#[derive(Debug, Clone)]
pub struct SampleRing<T> {
    items: VecDeque<T>,
    capacity: usize,
    total_added: u64,
}

impl<T> SampleRing<T> {
    /// Creates an empty ring. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            total_added: 0,
        }
    }

    /// Appends an item, dropping the oldest one when the ring is full.
    pub fn push(&mut self, item: T) {
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
        self.total_added += 1;
    }

    /// Item at `offset` counted from the oldest retained item.
    pub fn read_from_start(&self, offset: usize) -> Result<&T, HistoryError> {
        self.items.get(offset).ok_or(HistoryError::OffsetOutOfRange {
            offset,
            len: self.items.len(),
        })
    }

    /// Item at `offset` counted back from the newest item.
    pub fn read_from_end(&self, offset: usize) -> Result<&T, HistoryError> {
        let len = self.items.len();
        if offset >= len {
            return Err(HistoryError::OffsetOutOfRange { offset, len });
        }
        self.read_from_start(len - 1 - offset)
    }

    /// Current occupancy.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items ever pushed, including overwritten ones.
    pub fn total_added(&self) -> u64 {
        self.total_added
    }
}

/// The recent positions of one finger of one hand.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    samples: SampleRing<FingerSample>,
    last_update: Duration,
}

impl PositionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: SampleRing::new(capacity),
            last_update: Duration::ZERO,
        }
    }

    /// Records a sample that arrived at `at`.
    pub fn append(&mut self, sample: FingerSample, at: Duration) {
        self.samples.push(sample);
        self.last_update = at;
    }

    pub fn read_from_start(&self, offset: usize) -> Result<&FingerSample, HistoryError> {
        self.samples.read_from_start(offset)
    }

    pub fn read_from_end(&self, offset: usize) -> Result<&FingerSample, HistoryError> {
        self.samples.read_from_end(offset)
    }

    /// The newest sample.
    pub fn latest(&self) -> Result<&FingerSample, HistoryError> {
        self.read_from_end(0)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    pub fn total_added(&self) -> u64 {
        self.samples.total_added()
    }

    pub fn last_update(&self) -> Duration {
        self.last_update
    }

    /// Time elapsed between the last append and `now` (zero if `now` is earlier).
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.last_update)
    }
}
