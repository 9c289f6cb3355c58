#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod game;
pub mod identity;
pub mod notify;
pub mod profile_service;
pub mod progress;

pub use quest_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, GameError, ProfileServiceError, ProgressError};
pub use game::{GameService, LevelRun, SubmitOutcome, match_options};
pub use identity::{IdentityProvider, StaticIdentity};
pub use notify::{LogNotifier, Notification, NotificationLevel, Notifier, RecordingNotifier};
pub use profile_service::ProfileService;
pub use progress::{
    LevelAction, LevelSelector, LevelSlot, ProgressReconciler, ProgressReportService,
    SyncOutcome, UserProgressReport,
};
