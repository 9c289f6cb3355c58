use quest_core::model::{Profile, ProgressMark, UserId};
use sqlx::Row;

use crate::repository::{ProgressRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn mark_from_i64(v: i64) -> Result<ProgressMark, StorageError> {
    u32::try_from(v)
        .map(ProgressMark::new)
        .map_err(|_| StorageError::Serialization(format!("invalid highest_unlocked: {v}")))
}

pub(crate) fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    UserId::new(raw).ok_or_else(|| StorageError::Serialization("empty user_id".into()))
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRecord, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    Ok(ProgressRecord {
        user_id: user_id_from_str(&user_id)?,
        mark: mark_from_i64(row.try_get::<i64, _>("highest_unlocked").map_err(ser)?)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_profile_row(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, StorageError> {
    let name: String = row.try_get("display_name").map_err(ser)?;
    Profile::from_name(name).map_err(ser)
}
