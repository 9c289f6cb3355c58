use quest_core::model::{Catalog, LevelIndex, ProgressMark};

/// What the level list offers for a playable level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelAction {
    Continue,
    Replay,
}

impl LevelAction {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            LevelAction::Continue => "Continue",
            LevelAction::Replay => "Replay",
        }
    }
}

/// One row of the level list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSlot {
    pub index: LevelIndex,
    pub title: String,
    pub description: String,
    pub challenge_count: usize,
    pub unlocked: bool,
    pub completed: bool,
    pub current: bool,
    /// `None` for locked levels.
    pub action: Option<LevelAction>,
}

/// Read-only projection of the catalog at a given progress.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSelector {
    slots: Vec<LevelSlot>,
    completed_levels: u32,
    level_count: u32,
}

impl LevelSelector {
    #[must_use]
    pub fn project(catalog: &Catalog, progress: ProgressMark) -> Self {
        let level_count = catalog.level_count();
        let progress = progress.clamped(level_count);

        let slots = catalog
            .levels()
            .iter()
            .zip(0..level_count)
            .map(|(level, raw)| {
                let index = LevelIndex::new(raw);
                let unlocked = progress.is_unlocked(index);
                let completed = progress.is_completed(index);
                let current = progress.is_current(index);
                // an unlocked level that is not completed is always the current one
                let action = if completed {
                    Some(LevelAction::Replay)
                } else if current {
                    Some(LevelAction::Continue)
                } else {
                    None
                };
                LevelSlot {
                    index,
                    title: level.title.clone(),
                    description: level.description.clone(),
                    challenge_count: level.challenge_count(),
                    unlocked,
                    completed,
                    current,
                    action,
                }
            })
            .collect();

        Self {
            slots,
            completed_levels: progress.value(),
            level_count,
        }
    }

    #[must_use]
    pub fn slots(&self) -> &[LevelSlot] {
        &self.slots
    }

    #[must_use]
    pub fn slot(&self, index: LevelIndex) -> Option<&LevelSlot> {
        self.slots.get(index.as_usize())
    }

    #[must_use]
    pub fn completed_levels(&self) -> u32 {
        self.completed_levels
    }

    #[must_use]
    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    /// Fraction of levels completed, in `[0, 1]`.
    #[must_use]
    pub fn progress_ratio(&self) -> f64 {
        if self.level_count == 0 {
            return 0.0;
        }
        f64::from(self.completed_levels) / f64::from(self.level_count)
    }

    /// Reset is only offered once something has been completed.
    #[must_use]
    pub fn can_reset(&self) -> bool {
        self.completed_levels > 0
    }

    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.completed_levels == self.level_count
    }
}
