use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use quest_core::model::{Catalog, LevelIndex, ProgressMark, UserId};
use storage::repository::{ProgressRepository, StorageError};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::selector::LevelSelector;
use crate::error::ProgressError;
use crate::identity::IdentityProvider;
use crate::notify::{Notification, Notifier};
use crate::Clock;

/// Result of a background store write started by `advance` or `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The store accepted the write; `local` is local progress after the follow-up read.
    Confirmed { local: ProgressMark },
    /// The store rejected the write and the user has been notified.
    Failed,
}

#[derive(Debug, Default)]
struct LocalProgress {
    mark: ProgressMark,
    initialized: bool,
    /// Bumped by every confirmed reset. Reads started under an older epoch are
    /// not merged, so they cannot resurrect progress the reset cleared.
    epoch: u64,
}

/// Keeps the player's local progress in step with the durable store.
///
/// Completions are applied locally before the store confirms them and are never
/// rolled back. Resets wait for the store. Every read from the store is merged with
/// `max`, so local progress only drops through a confirmed reset.
///
/// Store writes run one at a time in the order `advance` and `reset` were called.
#[derive(Clone)]
pub struct ProgressReconciler {
    clock: Clock,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProgressRepository>,
    notifier: Arc<dyn Notifier>,
    level_count: u32,
    local: Arc<Mutex<LocalProgress>>,
    /// Finishes when the most recently queued write (and its refresh) is done.
    last_write: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
}

impl ProgressReconciler {
    #[must_use]
    pub fn new(
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProgressRepository>,
        notifier: Arc<dyn Notifier>,
        level_count: u32,
    ) -> Self {
        Self {
            clock,
            identity,
            store,
            notifier,
            level_count,
            local: Arc::new(Mutex::new(LocalProgress::default())),
            last_write: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    #[must_use]
    pub fn local_progress(&self) -> ProgressMark {
        self.lock().mark
    }

    /// Whether the first store read has landed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    #[must_use]
    pub fn is_unlocked(&self, level: LevelIndex) -> bool {
        level.value() < self.level_count && self.lock().mark.is_unlocked(level)
    }

    /// Projects the level list for `catalog` at the current local progress.
    #[must_use]
    pub fn selector(&self, catalog: &Catalog) -> LevelSelector {
        LevelSelector::project(catalog, self.local_progress())
    }

    /// Sets local progress to a persisted value, replacing whatever was held.
    pub fn initialize(&self, persisted: ProgressMark) {
        let mut local = self.lock();
        local.mark = persisted.clamped(self.level_count);
        local.initialized = true;
    }

    /// Reads the store and folds the result into local progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` when nobody is signed in and
    /// `ProgressError::StoreUnavailable` when the read fails. A failed read is also
    /// reported to the notifier and leaves local progress untouched.
    pub async fn load(&self) -> Result<ProgressMark, ProgressError> {
        let user = self.current_user()?;
        let epoch = self.lock().epoch;
        match self.store.read_progress(&user).await {
            Ok(remote) => {
                let local = self.merge_remote(remote, epoch);
                debug!(user = %user, remote = %remote, local = %local, "progress loaded");
                Ok(local)
            }
            Err(err) => {
                warn!(user = %user, error = %err, "progress read failed");
                self.notifier
                    .notify(Notification::failure(format!("Failed to load progress: {err}")));
                Err(err.into())
            }
        }
    }

    /// Applies completion of `level` locally and writes it to the store in the background.
    ///
    /// The local change is visible as soon as this returns. The write is sent even when
    /// the level was already completed; the store keeps the maximum.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` when nobody is signed in,
    /// `ProgressError::LevelOutOfRange` for a level past the catalog and
    /// `ProgressError::RuntimeUnavailable` when called outside a tokio runtime. None of
    /// them touch local progress.
    pub fn advance(&self, level: LevelIndex) -> Result<JoinHandle<SyncOutcome>, ProgressError> {
        let user = self.current_user()?;
        if level.value() >= self.level_count {
            return Err(ProgressError::LevelOutOfRange {
                level,
                level_count: self.level_count,
            });
        }
        let runtime = current_runtime()?;

        let local = {
            let mut state = self.lock();
            state.mark = state.mark.advanced_by(level);
            state.mark
        };
        debug!(user = %user, level = %level, local = %local, "completion applied locally");

        let at = self.clock.now();
        let write = self.clone().record_completion(user, level, at);
        Ok(self.spawn_in_order(&runtime, write))
    }

    /// Asks the store to clear progress; local progress drops to zero only once it confirms.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` when nobody is signed in and
    /// `ProgressError::RuntimeUnavailable` when called outside a tokio runtime.
    pub fn reset(&self) -> Result<JoinHandle<SyncOutcome>, ProgressError> {
        let user = self.current_user()?;
        let runtime = current_runtime()?;
        let at = self.clock.now();
        let write = self.clone().clear(user, at);
        Ok(self.spawn_in_order(&runtime, write))
    }

    // Chains each write behind the previous one so the store sees them in call order.
    fn spawn_in_order<F>(&self, runtime: &Handle, write: F) -> JoinHandle<SyncOutcome>
    where
        F: Future<Output = SyncOutcome> + Send + 'static,
    {
        let (done, turn) = oneshot::channel::<()>();
        let previous = self
            .last_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(turn);

        runtime.spawn(async move {
            if let Some(previous) = previous {
                // a dropped sender releases the turn as well
                let _ = previous.await;
            }
            let outcome = write.await;
            drop(done);
            outcome
        })
    }

    async fn record_completion(
        self,
        user: UserId,
        level: LevelIndex,
        at: DateTime<Utc>,
    ) -> SyncOutcome {
        if let Err(err) = self.store.record_level_completion(&user, level, at).await {
            warn!(user = %user, level = %level, error = %err, "completion write failed");
            self.notifier.notify(Notification::failure(format!(
                "Failed to complete level: {err}"
            )));
            return SyncOutcome::Failed;
        }
        info!(user = %user, level = %level, "level completion stored");
        SyncOutcome::Confirmed {
            local: self.refresh(&user).await,
        }
    }

    async fn clear(self, user: UserId, at: DateTime<Utc>) -> SyncOutcome {
        if let Err(err) = self.store.reset_progress(&user, at).await {
            warn!(user = %user, error = %err, "progress reset failed");
            self.notifier.notify(Notification::failure(format!(
                "Failed to reset progress: {err}"
            )));
            return SyncOutcome::Failed;
        }

        {
            let mut state = self.lock();
            state.mark = ProgressMark::ZERO;
            state.initialized = true;
            state.epoch += 1;
        }
        info!(user = %user, "progress reset");
        self.notifier
            .notify(Notification::success("Progress reset successfully!"));

        SyncOutcome::Confirmed {
            local: self.refresh(&user).await,
        }
    }

    // Follow-up read after a confirmed write. A failure here only costs freshness.
    async fn refresh(&self, user: &UserId) -> ProgressMark {
        let epoch = self.lock().epoch;
        match self.store.read_progress(user).await {
            Ok(remote) => self.merge_remote(remote, epoch),
            Err(err) => {
                warn!(user = %user, error = %err, "progress refresh failed");
                self.notifier
                    .notify(Notification::failure(format!("Failed to load progress: {err}")));
                self.local_progress()
            }
        }
    }

    fn merge_remote(&self, remote: ProgressMark, epoch: u64) -> ProgressMark {
        let remote = remote.clamped(self.level_count);
        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(remote = %remote, "dropping progress read issued before a reset");
            return state.mark;
        }
        state.mark = state.mark.merge(remote);
        state.initialized = true;
        state.mark
    }

    fn current_user(&self) -> Result<UserId, ProgressError> {
        self.identity
            .current_user()
            .ok_or(ProgressError::NotAuthenticated)
    }

    fn lock(&self) -> MutexGuard<'_, LocalProgress> {
        self.local.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn current_runtime() -> Result<Handle, ProgressError> {
    Handle::try_current().map_err(|_| ProgressError::RuntimeUnavailable)
}

impl std::fmt::Debug for ProgressReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReconciler")
            .field("level_count", &self.level_count)
            .field("local", &*self.lock())
            .finish_non_exhaustive()
    }
}
