use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quest_core::model::{LevelIndex, ProgressMark, UserId};

use crate::repository::{ProgressRecord, ProgressRepository, StorageError};

use super::SqliteRepository;
use super::mapping::{map_progress_row, mark_from_i64};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn read_progress(&self, user: &UserId) -> Result<ProgressMark, StorageError> {
        let value: Option<i64> = sqlx::query_scalar(
            r"
            SELECT highest_unlocked
            FROM user_progress
            WHERE user_id = ?1
            ",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        value.map_or(Ok(ProgressMark::ZERO), mark_from_i64)
    }

    async fn record_level_completion(
        &self,
        user: &UserId,
        level: LevelIndex,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let reached = ProgressMark::after_completing(level);
        sqlx::query(
            r"
            INSERT INTO user_progress (user_id, highest_unlocked, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                highest_unlocked = MAX(user_progress.highest_unlocked, excluded.highest_unlocked),
                updated_at = excluded.updated_at
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(reached.value()))
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn reset_progress(&self, user: &UserId, at: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_progress (user_id, highest_unlocked, updated_at)
            VALUES (?1, 0, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                highest_unlocked = 0,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn list_progress(&self) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, highest_unlocked, updated_at
            FROM user_progress
            ORDER BY user_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }
}
