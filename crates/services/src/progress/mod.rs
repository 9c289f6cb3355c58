mod reconciler;
mod report;
mod selector;

pub use crate::error::ProgressError;
pub use reconciler::{ProgressReconciler, SyncOutcome};
pub use report::{ProgressReportService, UserProgressReport};
pub use selector::{LevelAction, LevelSelector, LevelSlot};
