/// Per-fight accumulator state shared by the stack trackers.
///
/// Each tracker owns its own instances; nothing here is shared between
/// analyzers and no locking is needed because dispatch is single-threaded.
use tracing::warn;

// ---------------------------------------------------------------------------
// Current stack level (inactive = 0, active-at-N for N >= 1)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackLevel {
    level: u32,
}

impl StackLevel {
    pub fn current(&self) -> u32 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.level > 0
    }

    /// inactive -> active-1. A fresh apply always restarts at one stack.
    pub fn apply(&mut self) {
        self.level = 1;
    }

    /// active-N -> active-M. A stack change down to 0 means the buff is gone.
    pub fn set(&mut self, level: u32) {
        self.level = level;
    }

    /// active-N -> inactive
    pub fn remove(&mut self) {
        self.level = 0;
    }
}

// ---------------------------------------------------------------------------
// Time-in-level histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LevelDurations {
    /// durations[i] = ms spent at stack level i. Index 0 is the "inactive" bucket.
    durations:      Vec<u64>,
    last_level:     u32,
    start_ms:       u64,
    last_update_ms: u64,
}

impl LevelDurations {
    pub fn new(max_level: u32, start_ms: u64) -> Self {
        Self {
            durations:      vec![0; max_level as usize + 1],
            last_level:     0,
            start_ms,
            last_update_ms: start_ms,
        }
    }

    pub fn max_level(&self) -> u32 {
        (self.durations.len() - 1) as u32
    }

    /// Credit the time since the previous transition to the previous level,
    /// then move to `new_level`.
    pub fn transition(&mut self, timestamp_ms: u64, new_level: u32) {
        let elapsed = timestamp_ms.saturating_sub(self.last_update_ms);
        self.durations[self.last_level as usize] += elapsed;
        self.last_update_ms = self.last_update_ms.max(timestamp_ms);

        let max = self.max_level();
        self.last_level = if new_level > max {
            warn!("Stack level {} exceeds max {}: clamping", new_level, max);
            max
        } else {
            new_level
        };
    }

    /// Synthetic same-level transition capturing the final interval.
    pub fn close(&mut self, timestamp_ms: u64) {
        let level = self.last_level;
        self.transition(timestamp_ms, level);
    }

    pub fn durations(&self) -> &[u64] {
        &self.durations
    }

    pub fn last_level(&self) -> u32 {
        self.last_level
    }

    /// Sum of all buckets, including level 0.
    pub fn total_ms(&self) -> u64 {
        self.durations.iter().sum()
    }

    /// Time covered since the fight started, up to the last transition.
    pub fn elapsed_ms(&self) -> u64 {
        self.last_update_ms.saturating_sub(self.start_ms)
    }
}
