use std::sync::Arc;

use chrono::{DateTime, Utc};
use quest_core::model::UserId;
use storage::repository::ProgressRepository;

use crate::error::ProgressError;
use crate::identity::IdentityProvider;

/// Progress of one user against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgressReport {
    pub user_id: UserId,
    /// Completed levels, capped at `total_levels`.
    pub current_level: u32,
    pub total_levels: u32,
    pub updated_at: DateTime<Utc>,
}

/// Lists every user's stored progress.
#[derive(Clone)]
pub struct ProgressReportService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProgressRepository>,
    level_count: u32,
}

impl ProgressReportService {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProgressRepository>,
        level_count: u32,
    ) -> Self {
        Self {
            identity,
            store,
            level_count,
        }
    }

    /// Report for every user with a stored record, ordered by user id.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` when nobody is signed in.
    /// Returns `ProgressError::StoreUnavailable` if the store read fails.
    pub async fn all_users(&self) -> Result<Vec<UserProgressReport>, ProgressError> {
        if self.identity.current_user().is_none() {
            return Err(ProgressError::NotAuthenticated);
        }
        let records = self.store.list_progress().await?;
        Ok(records
            .into_iter()
            .map(|record| UserProgressReport {
                user_id: record.user_id,
                current_level: record.mark.clamped(self.level_count).value(),
                total_levels: self.level_count,
                updated_at: record.updated_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quest_core::model::LevelIndex;
    use quest_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    use crate::identity::StaticIdentity;

    #[tokio::test]
    async fn reports_every_user_against_the_catalog() {
        let repo = InMemoryRepository::new();
        let ada = UserId::new("ada").unwrap();
        let bob = UserId::new("bob").unwrap();
        for level in 0..4 {
            repo.record_level_completion(&ada, LevelIndex::new(level), fixed_now())
                .await
                .unwrap();
        }
        repo.record_level_completion(&bob, LevelIndex::new(0), fixed_now())
            .await
            .unwrap();

        let service = ProgressReportService::new(
            Arc::new(StaticIdentity::signed_in(ada.clone())),
            Arc::new(repo),
            2,
        );
        let report = service.all_users().await.unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].user_id, ada);
        assert_eq!(report[0].current_level, 2);
        assert_eq!(report[1].current_level, 1);
        assert!(report.iter().all(|r| r.total_levels == 2));
    }

    #[tokio::test]
    async fn report_requires_a_signed_in_user() {
        let service = ProgressReportService::new(
            Arc::new(StaticIdentity::anonymous()),
            Arc::new(InMemoryRepository::new()),
            2,
        );
        assert!(matches!(
            service.all_users().await,
            Err(ProgressError::NotAuthenticated)
        ));
    }
}
