/// Pre-roll buffer module
///
/// Keeps the most recent samples of the stream so that a detected sound can be
/// back-filled with the audio that preceded its confirmation.

use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use tracing::debug;

/// Fixed-capacity circular history of the most recent samples
pub struct PreRoll {
    ring: HeapRb<f32>,
}

impl PreRoll {
    /// Create an empty pre-roll holding at most `capacity` samples.
    ///
    /// `capacity` must be non-zero; callers validate it through
    /// [`DetectorConfig::validate`](crate::detector::DetectorConfig::validate).
    pub fn with_capacity(capacity: usize) -> Self {
        debug!("Creating pre-roll buffer with capacity: {} samples", capacity);

        Self {
            ring: HeapRb::new(capacity),
        }
    }

    /// Record a sample, overwriting the oldest one once the buffer is full
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.ring.push_overwrite(sample);
    }

    /// Iterate over the held samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.ring.iter().copied()
    }

    /// Copy the held samples into a new vector, oldest first
    pub fn snapshot(&self) -> Vec<f32> {
        self.iter().collect()
    }

    /// Replace the storage with one of `new_capacity` slots.
    ///
    /// The most recent `min(len, new_capacity)` samples are kept in
    /// chronological order at the start of the new buffer; the remaining
    /// slots are empty. `new_capacity` must be non-zero.
    pub fn resize(&mut self, new_capacity: usize) {
        if new_capacity == self.capacity() {
            return;
        }

        let mut ring = HeapRb::new(new_capacity);
        for &sample in self.ring.iter() {
            ring.push_overwrite(sample);
        }

        debug!(
            "Resized pre-roll buffer: {} -> {} samples ({} kept)",
            self.capacity(),
            new_capacity,
            ring.occupied_len()
        );
        self.ring = ring;
    }

    /// Forget all held samples and restart writing from the beginning
    pub fn clear(&mut self) {
        let occupied = self.ring.occupied_len();
        self.ring.skip(occupied);
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }

    /// Number of slots not yet written since the last reset or resize
    pub fn vacant_len(&self) -> usize {
        self.ring.vacant_len()
    }
}
