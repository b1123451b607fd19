//! Score, level and line counters plus the level → gravity speed curve.

use std::time::Duration;

/// Points per lock, indexed by rows cleared at once.
pub const LINE_SCORES: [u32; 5] = [0, 40, 100, 300, 1200];

/// Lines needed per level.
const LINES_PER_LEVEL: u32 = 10;

const BASE_DROP_MS: u32 = 1000;
const DROP_STEP_MS: u32 = 100;
const MIN_DROP_MS: u32 = 100;

/// Gravity period for a level: 1000 ms at level 1, 100 ms faster per level, floored at 100 ms.
pub fn drop_interval_for_level(level: u32) -> Duration {
    let faster_by = level.saturating_sub(1).saturating_mul(DROP_STEP_MS);
    let ms = BASE_DROP_MS.saturating_sub(faster_by).max(MIN_DROP_MS);
    Duration::from_millis(u64::from(ms))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progression {
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub drop_interval: Duration,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new()
    }
}

impl Progression {
    pub fn new() -> Self {
        Self {
            score: 0,
            level: 1,
            lines: 0,
            drop_interval: drop_interval_for_level(1),
        }
    }

    /// Apply one clear event: score at the current level, then level and speed
    /// from the new line total. Returns points awarded.
    pub fn record_clear(&mut self, cleared: u32) -> u32 {
        if cleared == 0 {
            return 0;
        }
        // only up to four rows can go at once with the classic catalog
        let base = LINE_SCORES
            .get(cleared as usize)
            .copied()
            .unwrap_or(LINE_SCORES[LINE_SCORES.len() - 1]);
        let points = base.saturating_mul(self.level);
        self.score = self.score.saturating_add(points);
        self.lines = self.lines.saturating_add(cleared);
        self.level = self.lines / LINES_PER_LEVEL + 1;
        self.drop_interval = drop_interval_for_level(self.level);
        points
    }
}
