use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quest_core::evaluator::Answer;
use quest_core::model::{Challenge, LevelIndex, ProgressMark, UserId};
use quest_core::time::fixed_clock;
use services::{
    AppServices, LevelAction, LevelRun, ProgressReconciler, RecordingNotifier, StaticIdentity,
    SyncOutcome,
};
use storage::repository::{InMemoryRepository, ProgressRecord, ProgressRepository, StorageError};

fn correct_answer(challenge: &Challenge) -> Answer {
    match challenge {
        Challenge::MultipleChoice(mc) => Answer::choice(mc.correct_choice.clone()),
        Challenge::Matching(m) => Answer::Matches(
            m.pairs
                .iter()
                .map(|p| (p.left.clone(), p.right.clone()))
                .collect(),
        ),
    }
}

async fn play_through(services: &AppServices, run: &mut LevelRun) -> Option<SyncOutcome> {
    let game = services.game();
    let mut sync = None;
    loop {
        let answer = correct_answer(run.current_challenge().unwrap());
        let outcome = game.submit(run, answer).unwrap();
        if let Some(handle) = outcome.sync {
            sync = Some(handle.await.unwrap());
        }
        if !run.tracker_mut().next() {
            return sync;
        }
    }
}

#[tokio::test]
async fn two_level_campaign_then_reset() {
    let notifier = Arc::new(RecordingNotifier::new());
    let services = AppServices::in_memory(
        fixed_clock(),
        AppServices::load_catalog(None).unwrap(),
        Arc::new(StaticIdentity::signed_in(UserId::new("ada").unwrap())),
        notifier.clone(),
    );
    let progress = services.progress();
    let game = services.game();

    assert_eq!(progress.load().await.unwrap(), ProgressMark::ZERO);
    assert!(progress.is_unlocked(LevelIndex::new(0)));
    assert!(!progress.is_unlocked(LevelIndex::new(1)));

    let mut first = game.start_level(LevelIndex::new(0)).unwrap();
    let synced = play_through(&services, &mut first).await;
    assert_eq!(
        synced,
        Some(SyncOutcome::Confirmed {
            local: ProgressMark::new(1)
        })
    );
    assert!(progress.is_unlocked(LevelIndex::new(1)));

    let selector = game.selector();
    assert_eq!(selector.slots()[0].action, Some(LevelAction::Replay));
    assert_eq!(selector.slots()[1].action, Some(LevelAction::Continue));

    let mut second = game.start_level(LevelIndex::new(1)).unwrap();
    play_through(&services, &mut second).await;
    assert_eq!(progress.local_progress(), ProgressMark::new(2));
    assert!(game.selector().all_completed());

    // replaying a finished level writes again but changes nothing
    let mut replay = game.start_level(LevelIndex::new(0)).unwrap();
    play_through(&services, &mut replay).await;
    assert_eq!(progress.local_progress(), ProgressMark::new(2));

    let report = services.reports().all_users().await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].current_level, 2);
    assert_eq!(report[0].total_levels, 2);

    notifier.drain();
    let outcome = progress.reset().unwrap().await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Confirmed {
            local: ProgressMark::ZERO
        }
    );
    assert!(!progress.is_unlocked(LevelIndex::new(1)));
    assert_eq!(notifier.drain().len(), 1);
    assert!(!game.selector().can_reset());
}

/// Store whose writes always fail.
#[derive(Default)]
struct DownStore {
    reads: InMemoryRepository,
    writes: AtomicUsize,
}

#[async_trait]
impl ProgressRepository for DownStore {
    async fn read_progress(&self, user: &UserId) -> Result<ProgressMark, StorageError> {
        self.reads.read_progress(user).await
    }

    async fn record_level_completion(
        &self,
        _user: &UserId,
        _level: LevelIndex,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Connection("store unavailable".into()))
    }

    async fn reset_progress(&self, _user: &UserId, _at: DateTime<Utc>) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Connection("store unavailable".into()))
    }

    async fn list_progress(&self) -> Result<Vec<ProgressRecord>, StorageError> {
        self.reads.list_progress().await
    }
}

#[tokio::test]
async fn completion_survives_a_failed_write() {
    let store = Arc::new(DownStore::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let progress = ProgressReconciler::new(
        fixed_clock(),
        Arc::new(StaticIdentity::signed_in(UserId::new("ada").unwrap())),
        store.clone(),
        notifier.clone(),
        2,
    );
    progress.load().await.unwrap();

    let outcome = progress
        .advance(LevelIndex::new(0))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Failed);
    assert_eq!(progress.local_progress(), ProgressMark::new(1));
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    let seen = notifier.drain();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_failure());

    // a later read of the stale store does not take the unlock away
    assert_eq!(progress.load().await.unwrap(), ProgressMark::new(1));
}
