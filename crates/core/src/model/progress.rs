use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::LevelIndex;

/// Highest unlocked level boundary for a user.
///
/// Levels `[0, value)` are completed and level `value` (when it exists) is the next
/// playable one. Combining marks always takes the maximum, so merges are commutative
/// and idempotent.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressMark(u32);

impl ProgressMark {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn new(highest_unlocked: u32) -> Self {
        Self(highest_unlocked)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Mark reached by completing `level`.
    #[must_use]
    pub fn after_completing(level: LevelIndex) -> Self {
        Self(level.value().saturating_add(1))
    }

    /// Merge rule shared by optimistic updates, store writes and refreshes.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    #[must_use]
    pub fn advanced_by(self, level: LevelIndex) -> Self {
        self.merge(Self::after_completing(level))
    }

    /// Caps the mark at the catalog length.
    #[must_use]
    pub fn clamped(self, level_count: u32) -> Self {
        Self(self.0.min(level_count))
    }

    #[must_use]
    pub fn is_unlocked(&self, level: LevelIndex) -> bool {
        level.value() <= self.0
    }

    #[must_use]
    pub fn is_completed(&self, level: LevelIndex) -> bool {
        level.value() < self.0
    }

    #[must_use]
    pub fn is_current(&self, level: LevelIndex) -> bool {
        level.value() == self.0
    }
}

impl fmt::Debug for ProgressMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgressMark({})", self.0)
    }
}

impl fmt::Display for ProgressMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_boundary_matches_value_for_every_mark() {
        let level_count = 6;
        for value in 0..=level_count {
            let mark = ProgressMark::new(value);
            for level in 0..level_count {
                let level = LevelIndex::new(level);
                assert_eq!(mark.is_unlocked(level), level.value() <= value);
                assert_eq!(mark.is_completed(level), level.value() < value);
                assert_eq!(mark.is_current(level), level.value() == value);
            }
        }
    }

    #[test]
    fn advancing_is_idempotent() {
        let once = ProgressMark::ZERO.advanced_by(LevelIndex::new(2));
        let mut many = ProgressMark::ZERO;
        for _ in 0..5 {
            many = many.advanced_by(LevelIndex::new(2));
        }
        assert_eq!(once, many);
        assert_eq!(once.value(), 3);
    }

    #[test]
    fn advancing_is_order_independent() {
        let start = ProgressMark::new(1);
        let a = start.advanced_by(LevelIndex::new(4)).advanced_by(LevelIndex::new(0));
        let b = start.advanced_by(LevelIndex::new(0)).advanced_by(LevelIndex::new(4));
        assert_eq!(a, b);
        assert_eq!(a.value(), 5);
    }

    #[test]
    fn smaller_level_never_lowers_mark() {
        let mark = ProgressMark::new(4).advanced_by(LevelIndex::new(1));
        assert_eq!(mark.value(), 4);
    }

    #[test]
    fn clamped_caps_at_level_count() {
        assert_eq!(ProgressMark::new(9).clamped(2), ProgressMark::new(2));
        assert_eq!(ProgressMark::new(1).clamped(2), ProgressMark::new(1));
    }
}
