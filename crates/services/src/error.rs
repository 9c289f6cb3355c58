//! Shared error types for the services crate.

use thiserror::Error;

use quest_core::model::{CatalogError, LevelIndex, ProfileError};
use quest_core::tracker::TrackerError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressReconciler` and `ProgressReportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("no user is signed in")]
    NotAuthenticated,
    #[error("progress store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
    #[error("level {level} is outside the catalog ({level_count} levels)")]
    LevelOutOfRange { level: LevelIndex, level_count: u32 },
    #[error("no async runtime is available for store writes")]
    RuntimeUnavailable,
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error("no user is signed in")]
    NotAuthenticated,
    #[error("invalid profile: {0}")]
    InvalidProfile(#[from] ProfileError),
    #[error("profile store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
}

/// Errors emitted by `GameService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameError {
    #[error("level {level} is outside the catalog ({level_count} levels)")]
    LevelOutOfRange { level: LevelIndex, level_count: u32 },
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
