use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quest_core::model::{Profile, UserId};

use crate::repository::{ProfileRepository, StorageError};

use super::SqliteRepository;
use super::mapping::map_profile_row;

#[async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user: &UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT display_name
            FROM user_profiles
            WHERE user_id = ?1
            ",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn save_profile(
        &self,
        user: &UserId,
        profile: &Profile,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_profiles (user_id, display_name, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user.as_str())
        .bind(profile.display_name())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
