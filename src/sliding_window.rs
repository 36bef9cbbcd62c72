#![forbid(unsafe_code)]

use tracing::trace;

////////////////////////////////////////////////////////////////////////////////

pub const MAX_DISTANCE: usize = 32 * (1 << 10);
pub const MAX_MATCH: usize = 258;

pub const DEFAULT_WINDOW_CAPACITY: usize = 3 * MAX_DISTANCE;
/// Smallest capacity that still leaves room for one maximal match after a
/// compaction.
pub const MIN_WINDOW_CAPACITY: usize = MAX_DISTANCE + MAX_MATCH + 1;

/// Decoded-output history. Bytes in `[cur - d, cur)` are valid for every
/// back-reference distance `d <= min(cur, MAX_DISTANCE)`.
pub struct SlidingWindow {
    data: Vec<u8>,
    cur: usize,
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WINDOW_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(MIN_WINDOW_CAPACITY)],
            cur: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn buffer(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn write_buffer(&mut self) -> &mut [u8] {
        &mut self.data[self.cur..]
    }

    /// Forgets all history; the next member starts from an empty window.
    pub fn reset(&mut self) {
        self.cur = 0;
    }

    pub fn boundary(&self) -> usize {
        self.cur
    }

    /// The `n` bytes written past the boundary and not yet slid over.
    pub fn pending(&self, n: usize) -> &[u8] {
        &self.data[self.cur..self.cur + n]
    }

    /// Commits `n` freshly written bytes. Once the cursor passes
    /// `MAX_DISTANCE`, the last `MAX_DISTANCE` bytes move to the front.
    pub fn slide(&mut self, n: usize) {
        let end = self.cur + n;
        debug_assert!(end <= self.data.len());

        if end > MAX_DISTANCE {
            self.data.copy_within(end - MAX_DISTANCE..end, 0);
            self.cur = MAX_DISTANCE;
            trace!(discarded = end - MAX_DISTANCE, "window compacted");
        } else {
            self.cur = end;
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
