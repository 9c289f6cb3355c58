use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::evaluator::{Answer, MatchMapping, Verdict, evaluate};
use crate::model::{Challenge, ChallengeIndex, Level, LevelIndex, ProgressMark};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("level {0} is locked")]
    Locked(LevelIndex),

    #[error("challenge {index} is out of range (level has {count})")]
    ChallengeOutOfRange { index: ChallengeIndex, count: usize },
}

//
// ─── STATES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelState {
    Locked,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptStatus {
    #[default]
    Unanswered,
    SubmittedCorrect,
    SubmittedIncorrect,
}

/// Ephemeral per-challenge state: the last submission result plus the draft answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeAttempt {
    pub status: AttemptStatus,
    pub selected_choice: Option<String>,
    pub matches: MatchMapping,
}

impl ChallengeAttempt {
    #[must_use]
    pub fn has_submitted(&self) -> bool {
        self.status != AttemptStatus::Unanswered
    }

    fn clear(&mut self) {
        self.status = AttemptStatus::Unanswered;
        self.selected_choice = None;
        self.matches.clear();
    }
}

/// Emitted once, on the `InProgress -> Completed` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCompleted {
    pub level: LevelIndex,
}

/// Result of submitting an answer through the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// `None` when the candidate was empty and nothing was judged.
    pub verdict: Option<Verdict>,
    pub completed: Option<LevelCompleted>,
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// Session-scoped completion state for one level.
///
/// Created when the user enters a level and dropped on navigation away; nothing here
/// is persisted. Earned unlocks live in the progress mark instead.
pub struct LevelCompletionTracker {
    level: LevelIndex,
    state: LevelState,
    attempts: Vec<ChallengeAttempt>,
    completed: BTreeSet<ChallengeIndex>,
    current: usize,
}

impl LevelCompletionTracker {
    /// Enter `level`; it starts `Locked` when its index is beyond `progress`.
    #[must_use]
    pub fn enter(index: LevelIndex, level: &Level, progress: ProgressMark) -> Self {
        let state = if progress.is_unlocked(index) {
            LevelState::InProgress
        } else {
            LevelState::Locked
        };

        Self {
            level: index,
            state,
            attempts: vec![ChallengeAttempt::default(); level.challenge_count()],
            completed: BTreeSet::new(),
            current: 0,
        }
    }

    #[must_use]
    pub fn level(&self) -> LevelIndex {
        self.level
    }

    #[must_use]
    pub fn state(&self) -> LevelState {
        self.state
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state == LevelState::Locked
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == LevelState::Completed
    }

    #[must_use]
    pub fn challenge_count(&self) -> usize {
        self.attempts.len()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Fraction of challenges completed, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn completion_ratio(&self) -> f64 {
        if self.attempts.is_empty() {
            return 0.0;
        }
        self.completed.len() as f64 / self.attempts.len() as f64
    }

    #[must_use]
    pub fn is_challenge_completed(&self, index: ChallengeIndex) -> bool {
        self.completed.contains(&index)
    }

    #[must_use]
    pub fn attempt(&self, index: ChallengeIndex) -> Option<&ChallengeAttempt> {
        self.attempts.get(index.as_usize())
    }

    // ─── Navigation ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn current(&self) -> ChallengeIndex {
        // challenge counts are validated to fit in u32
        ChallengeIndex::new(u32::try_from(self.current).unwrap_or(u32::MAX))
    }

    /// Moves to the next challenge; returns `false` at the last one.
    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.attempts.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the previous challenge; returns `false` at the first one.
    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// # Errors
    ///
    /// Returns `TrackerError::ChallengeOutOfRange` for an unknown index.
    pub fn go_to(&mut self, index: ChallengeIndex) -> Result<(), TrackerError> {
        self.check_index(index)?;
        self.current = index.as_usize();
        Ok(())
    }

    // ─── Drafts ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `TrackerError` if the level is locked or the index is unknown.
    pub fn select_choice(
        &mut self,
        index: ChallengeIndex,
        choice: impl Into<String>,
    ) -> Result<(), TrackerError> {
        let attempt = self.attempt_mut(index)?;
        attempt.selected_choice = Some(choice.into());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TrackerError` if the level is locked or the index is unknown.
    pub fn assign_match(
        &mut self,
        index: ChallengeIndex,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Result<(), TrackerError> {
        let attempt = self.attempt_mut(index)?;
        attempt.matches.assign(left, right);
        Ok(())
    }

    /// Clears the submission and draft so the challenge can be tried again.
    ///
    /// The challenge stays in the completion set.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if the level is locked or the index is unknown.
    pub fn retry(&mut self, index: ChallengeIndex) -> Result<(), TrackerError> {
        self.attempt_mut(index)?.clear();
        Ok(())
    }

    /// Builds the candidate answer from the draft held for `index`.
    #[must_use]
    pub fn draft_answer(&self, index: ChallengeIndex, challenge: &Challenge) -> Option<Answer> {
        let attempt = self.attempt(index)?;
        Some(match challenge {
            Challenge::MultipleChoice(_) => {
                Answer::Choice(attempt.selected_choice.clone().unwrap_or_default())
            }
            Challenge::Matching(_) => Answer::Matches(attempt.matches.clone()),
        })
    }

    // ─── Submission ───────────────────────────────────────────────────────────

    /// Evaluates `answer` for `challenge` at `index` and records the result.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if the level is locked or the index is unknown.
    pub fn submit(
        &mut self,
        index: ChallengeIndex,
        challenge: &Challenge,
        answer: Answer,
    ) -> Result<Submission, TrackerError> {
        self.attempt_mut(index)?;
        let Some(verdict) = evaluate(challenge, &answer) else {
            return Ok(Submission {
                verdict: None,
                completed: None,
            });
        };

        let attempt = self.attempt_mut(index)?;
        match answer {
            Answer::Choice(choice) => attempt.selected_choice = Some(choice),
            Answer::Matches(mapping) => attempt.matches = mapping,
        }

        let completed = self.record(index, &verdict)?;
        Ok(Submission {
            verdict: Some(verdict),
            completed,
        })
    }

    /// Records a verdict; returns `Some` only on the transition into `Completed`.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if the level is locked or the index is unknown.
    pub fn record(
        &mut self,
        index: ChallengeIndex,
        verdict: &Verdict,
    ) -> Result<Option<LevelCompleted>, TrackerError> {
        let attempt = self.attempt_mut(index)?;
        if !verdict.correct {
            attempt.status = AttemptStatus::SubmittedIncorrect;
            return Ok(None);
        }

        attempt.status = AttemptStatus::SubmittedCorrect;
        self.completed.insert(index);

        if self.state == LevelState::InProgress && self.completed.len() == self.attempts.len() {
            self.state = LevelState::Completed;
            return Ok(Some(LevelCompleted { level: self.level }));
        }
        Ok(None)
    }

    fn check_index(&self, index: ChallengeIndex) -> Result<(), TrackerError> {
        if index.as_usize() >= self.attempts.len() {
            return Err(TrackerError::ChallengeOutOfRange {
                index,
                count: self.attempts.len(),
            });
        }
        Ok(())
    }

    fn attempt_mut(
        &mut self,
        index: ChallengeIndex,
    ) -> Result<&mut ChallengeAttempt, TrackerError> {
        if self.is_locked() {
            return Err(TrackerError::Locked(self.level));
        }
        self.check_index(index)?;
        let count = self.attempts.len();
        self.attempts
            .get_mut(index.as_usize())
            .ok_or(TrackerError::ChallengeOutOfRange { index, count })
    }
}

impl fmt::Debug for LevelCompletionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelCompletionTracker")
            .field("level", &self.level)
            .field("state", &self.state)
            .field("challenges", &self.attempts.len())
            .field("completed", &self.completed.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchingPair;

    fn build_level() -> Level {
        Level::new(
            "Basics",
            "Warm-up",
            "Once upon a time",
            vec![
                Challenge::multiple_choice("Q1", vec!["a".into(), "b".into()], "a", "a wins"),
                Challenge::matching(
                    "Q2",
                    vec![MatchingPair::new("A", "1"), MatchingPair::new("B", "2")],
                    "in order",
                ),
            ],
        )
    }

    fn ix(i: u32) -> ChallengeIndex {
        ChallengeIndex::new(i)
    }

    fn solve_all(tracker: &mut LevelCompletionTracker, level: &Level) -> Vec<LevelCompleted> {
        let mut events = Vec::new();
        let first = tracker
            .submit(ix(0), &level.challenges[0], Answer::choice("a"))
            .unwrap();
        events.extend(first.completed);
        let second = tracker
            .submit(
                ix(1),
                &level.challenges[1],
                Answer::Matches([("A", "1"), ("B", "2")].into_iter().collect()),
            )
            .unwrap();
        events.extend(second.completed);
        events
    }

    #[test]
    fn initial_state_follows_progress() {
        let level = build_level();
        let open = LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);
        assert_eq!(open.state(), LevelState::InProgress);

        let locked = LevelCompletionTracker::enter(LevelIndex::new(1), &level, ProgressMark::ZERO);
        assert_eq!(locked.state(), LevelState::Locked);

        let replay =
            LevelCompletionTracker::enter(LevelIndex::new(1), &level, ProgressMark::new(2));
        assert_eq!(replay.state(), LevelState::InProgress);
    }

    #[test]
    fn completes_exactly_once() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);

        let events = solve_all(&mut tracker, &level);
        assert_eq!(events, vec![LevelCompleted { level: LevelIndex::new(0) }]);
        assert!(tracker.is_complete());

        let again = tracker
            .submit(ix(0), &level.challenges[0], Answer::choice("a"))
            .unwrap();
        assert!(again.verdict.unwrap().correct);
        assert_eq!(again.completed, None);
        assert_eq!(tracker.state(), LevelState::Completed);
    }

    #[test]
    fn resubmitting_a_completed_challenge_does_not_complete_level() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);

        for _ in 0..3 {
            let submission = tracker
                .submit(ix(0), &level.challenges[0], Answer::choice("a"))
                .unwrap();
            assert_eq!(submission.completed, None);
        }
        assert_eq!(tracker.completed_count(), 1);
        assert_eq!(tracker.state(), LevelState::InProgress);
    }

    #[test]
    fn incorrect_answer_is_recorded_but_not_completed() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);

        let submission = tracker
            .submit(ix(0), &level.challenges[0], Answer::choice("b"))
            .unwrap();
        assert!(!submission.verdict.unwrap().correct);
        assert_eq!(
            tracker.attempt(ix(0)).unwrap().status,
            AttemptStatus::SubmittedIncorrect
        );
        assert!(!tracker.is_challenge_completed(ix(0)));
    }

    #[test]
    fn empty_answer_changes_nothing() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);

        let submission = tracker
            .submit(ix(1), &level.challenges[1], Answer::Matches(MatchMapping::new()))
            .unwrap();
        assert_eq!(submission.verdict, None);
        assert!(!tracker.attempt(ix(1)).unwrap().has_submitted());
    }

    #[test]
    fn locked_level_rejects_submissions() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(3), &level, ProgressMark::new(1));

        let err = tracker
            .submit(ix(0), &level.challenges[0], Answer::choice("a"))
            .unwrap_err();
        assert_eq!(err, TrackerError::Locked(LevelIndex::new(3)));
    }

    #[test]
    fn out_of_range_challenge_is_rejected() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);

        let err = tracker.select_choice(ix(5), "a").unwrap_err();
        assert_eq!(
            err,
            TrackerError::ChallengeOutOfRange {
                index: ix(5),
                count: 2
            }
        );
    }

    #[test]
    fn retry_keeps_completion() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);

        tracker
            .submit(ix(0), &level.challenges[0], Answer::choice("a"))
            .unwrap();
        tracker.retry(ix(0)).unwrap();

        let attempt = tracker.attempt(ix(0)).unwrap();
        assert_eq!(attempt.status, AttemptStatus::Unanswered);
        assert_eq!(attempt.selected_choice, None);
        assert!(tracker.is_challenge_completed(ix(0)));
    }

    #[test]
    fn drafts_build_answers() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);

        tracker.assign_match(ix(1), "A", "1").unwrap();
        tracker.assign_match(ix(1), "B", "2").unwrap();
        let answer = tracker.draft_answer(ix(1), &level.challenges[1]).unwrap();
        let submission = tracker.submit(ix(1), &level.challenges[1], answer).unwrap();
        assert!(submission.verdict.unwrap().correct);

        let empty = tracker.draft_answer(ix(0), &level.challenges[0]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn navigation_is_clamped() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);

        assert!(!tracker.previous());
        assert!(tracker.next());
        assert_eq!(tracker.current(), ix(1));
        assert!(!tracker.next());
        tracker.go_to(ix(0)).unwrap();
        assert_eq!(tracker.current(), ix(0));
        assert!(tracker.go_to(ix(2)).is_err());
    }

    #[test]
    fn completion_ratio_tracks_set_size() {
        let level = build_level();
        let mut tracker =
            LevelCompletionTracker::enter(LevelIndex::new(0), &level, ProgressMark::ZERO);
        assert!(tracker.completion_ratio().abs() < f64::EPSILON);

        tracker
            .submit(ix(0), &level.challenges[0], Answer::choice("a"))
            .unwrap();
        assert!((tracker.completion_ratio() - 0.5).abs() < f64::EPSILON);
    }
}
