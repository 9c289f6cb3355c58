use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quest_core::model::{LevelIndex, Profile, ProgressMark, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted progress row for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub mark: ProgressMark,
    pub updated_at: DateTime<Utc>,
}

/// Durable per-user progress.
///
/// Writes are monotonic: recording a completion never lowers the stored mark, so
/// duplicate or reordered writes converge on the same value. Only `reset_progress`
/// moves it back to zero.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Read a user's progress; users without a record read as zero.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached or the row is malformed.
    async fn read_progress(&self, user: &UserId) -> Result<ProgressMark, StorageError>;

    /// Record completion of `level`, storing `max(current, level + 1)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn record_level_completion(
        &self,
        user: &UserId,
        level: LevelIndex,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Clear a user's progress back to zero.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn reset_progress(&self, user: &UserId, at: DateTime<Utc>) -> Result<(), StorageError>;

    /// List every stored progress record ordered by user id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails.
    async fn list_progress(&self) -> Result<Vec<ProgressRecord>, StorageError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch the profile for a user, if one has been saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails or the stored name is invalid.
    async fn get_profile(&self, user: &UserId) -> Result<Option<Profile>, StorageError>;

    /// Insert or replace the profile for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn save_profile(
        &self,
        user: &UserId,
        profile: &Profile,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<UserId, ProgressRecord>>>,
    profiles: Arc<Mutex<HashMap<UserId, Profile>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn read_progress(&self, user: &UserId) -> Result<ProgressMark, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(user).map_or(ProgressMark::ZERO, |r| r.mark))
    }

    async fn record_level_completion(
        &self,
        user: &UserId,
        level: LevelIndex,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let record = guard.entry(user.clone()).or_insert_with(|| ProgressRecord {
            user_id: user.clone(),
            mark: ProgressMark::ZERO,
            updated_at: at,
        });
        record.mark = record.mark.advanced_by(level);
        record.updated_at = at;
        Ok(())
    }

    async fn reset_progress(&self, user: &UserId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            user.clone(),
            ProgressRecord {
                user_id: user.clone(),
                mark: ProgressMark::ZERO,
                updated_at: at,
            },
        );
        Ok(())
    }

    async fn list_progress(&self) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(records)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user: &UserId) -> Result<Option<Profile>, StorageError> {
        let guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(user).cloned())
    }

    async fn save_profile(
        &self,
        user: &UserId,
        profile: &Profile,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(user.clone(), profile.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo);
        Self { progress, profiles }
    }
}
