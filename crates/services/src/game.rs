use std::sync::Arc;

use quest_core::evaluator::{Answer, Verdict};
use quest_core::model::{Catalog, Challenge, ChallengeIndex, Level, LevelIndex, Matching};
use quest_core::tracker::{LevelCompletionTracker, LevelState, TrackerError};
use rand::rng;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::GameError;
use crate::notify::{Notification, Notifier};
use crate::progress::{LevelSelector, ProgressReconciler, SyncOutcome};

/// One visit to a level. Dropping it discards every draft and verdict.
#[derive(Debug)]
pub struct LevelRun {
    level: Level,
    tracker: LevelCompletionTracker,
}

impl LevelRun {
    #[must_use]
    pub fn index(&self) -> LevelIndex {
        self.tracker.level()
    }

    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    #[must_use]
    pub fn state(&self) -> LevelState {
        self.tracker.state()
    }

    #[must_use]
    pub fn tracker(&self) -> &LevelCompletionTracker {
        &self.tracker
    }

    /// Drafts and navigation go through the tracker directly.
    pub fn tracker_mut(&mut self) -> &mut LevelCompletionTracker {
        &mut self.tracker
    }

    #[must_use]
    pub fn current_index(&self) -> ChallengeIndex {
        self.tracker.current()
    }

    #[must_use]
    pub fn current_challenge(&self) -> Option<&Challenge> {
        self.level.challenge(self.tracker.current())
    }

    fn challenge_at(&self, index: ChallengeIndex) -> Result<Challenge, TrackerError> {
        self.level
            .challenge(index)
            .cloned()
            .ok_or(TrackerError::ChallengeOutOfRange {
                index,
                count: self.level.challenge_count(),
            })
    }
}

/// Right-hand options of a matching challenge in display order.
///
/// With `shuffle` off the options keep pair order, which gives the answer away.
#[must_use]
pub fn match_options(matching: &Matching, shuffle: bool) -> Vec<String> {
    let mut options: Vec<String> = matching.pairs.iter().map(|p| p.right.clone()).collect();
    if shuffle {
        options.shuffle(&mut rng());
    }
    options
}

/// Result of submitting one answer.
#[derive(Debug)]
pub struct SubmitOutcome {
    /// `None` when the answer was empty and nothing was judged.
    pub verdict: Option<Verdict>,
    /// True only for the submission that completed the level.
    pub level_completed: bool,
    /// Background store write started by the completion. `None` when the write could
    /// not be started; the user has been notified.
    pub sync: Option<JoinHandle<SyncOutcome>>,
}

/// Drives levels and challenges on top of the progress reconciler.
#[derive(Clone)]
pub struct GameService {
    catalog: Arc<Catalog>,
    progress: ProgressReconciler,
    notifier: Arc<dyn Notifier>,
}

impl GameService {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        progress: ProgressReconciler,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            progress,
            notifier,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressReconciler {
        &self.progress
    }

    #[must_use]
    pub fn selector(&self) -> LevelSelector {
        self.progress.selector(&self.catalog)
    }

    /// Enter a level at the current local progress.
    ///
    /// Entering a locked level succeeds; the run reports `LevelState::Locked` and
    /// rejects submissions.
    ///
    /// # Errors
    ///
    /// Returns `GameError::LevelOutOfRange` for an index past the catalog.
    pub fn start_level(&self, index: LevelIndex) -> Result<LevelRun, GameError> {
        let level = self
            .catalog
            .level(index)
            .ok_or(GameError::LevelOutOfRange {
                level: index,
                level_count: self.catalog.level_count(),
            })?
            .clone();
        let tracker = LevelCompletionTracker::enter(index, &level, self.progress.local_progress());
        debug!(level = %index, state = ?tracker.state(), "level entered");
        Ok(LevelRun { level, tracker })
    }

    /// Submit `answer` for the run's current challenge.
    ///
    /// # Errors
    ///
    /// See [`GameService::submit_at`].
    pub fn submit(&self, run: &mut LevelRun, answer: Answer) -> Result<SubmitOutcome, GameError> {
        let index = run.current_index();
        self.submit_at(run, index, answer)
    }

    /// Submit whatever draft the tracker holds for the current challenge.
    ///
    /// # Errors
    ///
    /// See [`GameService::submit_at`].
    pub fn submit_draft(&self, run: &mut LevelRun) -> Result<SubmitOutcome, GameError> {
        let index = run.current_index();
        let challenge = run.challenge_at(index)?;
        let answer = run
            .tracker
            .draft_answer(index, &challenge)
            .unwrap_or_else(|| Answer::choice(""));
        self.submit_at(run, index, answer)
    }

    /// Judge `answer` for the challenge at `index`.
    ///
    /// The submission that completes the level raises a "Level completed!" notification
    /// and starts the progress write.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Tracker` when the level is locked or the index is unknown.
    /// A completion that cannot be recorded (nobody signed in, no runtime) still returns
    /// the verdict; it raises a failure notification and carries no `sync` handle.
    pub fn submit_at(
        &self,
        run: &mut LevelRun,
        index: ChallengeIndex,
        answer: Answer,
    ) -> Result<SubmitOutcome, GameError> {
        let challenge = run.challenge_at(index)?;
        let submission = run.tracker.submit(index, &challenge, answer)?;

        let Some(completed) = submission.completed else {
            return Ok(SubmitOutcome {
                verdict: submission.verdict,
                level_completed: false,
                sync: None,
            });
        };

        let sync = match self.progress.advance(completed.level) {
            Ok(sync) => {
                self.notifier.notify(Notification::success(
                    "Level completed! Great job! You can now move to the next level.",
                ));
                Some(sync)
            }
            Err(err) => {
                warn!(level = %completed.level, error = %err, "completion not recorded");
                self.notifier.notify(Notification::failure(format!(
                    "Failed to complete level: {err}"
                )));
                None
            }
        };
        Ok(SubmitOutcome {
            verdict: submission.verdict,
            level_completed: true,
            sync,
        })
    }
}
