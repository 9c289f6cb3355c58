use std::sync::Arc;

use quest_core::model::Catalog;
use storage::repository::Storage;

use crate::error::AppServicesError;
use crate::game::GameService;
use crate::identity::IdentityProvider;
use crate::notify::Notifier;
use crate::profile_service::ProfileService;
use crate::progress::{ProgressReconciler, ProgressReportService};
use crate::Clock;

/// Assembles app-facing services over one storage backend and catalog.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<Catalog>,
    progress: ProgressReconciler,
    game: Arc<GameService>,
    profiles: Arc<ProfileService>,
    reports: Arc<ProgressReportService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: Catalog,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, catalog, identity, notifier))
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(
        clock: Clock,
        catalog: Catalog,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, catalog, identity, notifier)
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        catalog: Catalog,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let level_count = catalog.level_count();

        let progress = ProgressReconciler::new(
            clock,
            Arc::clone(&identity),
            Arc::clone(&storage.progress),
            Arc::clone(&notifier),
            level_count,
        );
        let game = Arc::new(GameService::new(
            Arc::clone(&catalog),
            progress.clone(),
            Arc::clone(&notifier),
        ));
        let profiles = Arc::new(ProfileService::new(
            clock,
            Arc::clone(&identity),
            Arc::clone(&storage.profiles),
            notifier,
        ));
        let reports = Arc::new(ProgressReportService::new(
            identity,
            Arc::clone(&storage.progress),
            level_count,
        ));

        Self {
            catalog,
            progress,
            game,
            profiles,
            reports,
        }
    }

    /// Parse a JSON catalog, falling back to the built-in levels when `raw` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the catalog fails to parse or validate.
    pub fn load_catalog(raw: Option<&str>) -> Result<Catalog, AppServicesError> {
        let catalog = match raw {
            Some(raw) => Catalog::from_json(raw)?,
            None => Catalog::builtin()?,
        };
        Ok(catalog)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> ProgressReconciler {
        self.progress.clone()
    }

    #[must_use]
    pub fn game(&self) -> Arc<GameService> {
        Arc::clone(&self.game)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    #[must_use]
    pub fn reports(&self) -> Arc<ProgressReportService> {
        Arc::clone(&self.reports)
    }
}
