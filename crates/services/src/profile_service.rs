use std::sync::Arc;

use quest_core::model::{Profile, UserId};
use storage::repository::ProfileRepository;
use tracing::{info, warn};

use crate::error::ProfileServiceError;
use crate::identity::IdentityProvider;
use crate::notify::{Notification, Notifier};
use crate::Clock;

/// Reads and writes the signed-in user's profile.
#[derive(Clone)]
pub struct ProfileService {
    clock: Clock,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ProfileService {
    #[must_use]
    pub fn new(
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            identity,
            profiles,
            notifier,
        }
    }

    /// Fetch the signed-in user's profile, `None` if none was saved.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::NotAuthenticated` when nobody is signed in.
    /// Returns `ProfileServiceError::StoreUnavailable` if the read fails.
    pub async fn load(&self) -> Result<Option<Profile>, ProfileServiceError> {
        let user = self.current_user()?;
        match self.profiles.get_profile(&user).await {
            Ok(profile) => Ok(profile),
            Err(err) => {
                warn!(user = %user, error = %err, "profile read failed");
                self.notifier
                    .notify(Notification::failure(format!("Failed to load profile: {err}")));
                Err(err.into())
            }
        }
    }

    /// True when the signed-in user still has to pick a display name.
    ///
    /// # Errors
    ///
    /// Same as [`ProfileService::load`].
    pub async fn needs_setup(&self) -> Result<bool, ProfileServiceError> {
        Ok(self.load().await?.is_none())
    }

    /// Validate `name` and store it as the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::NotAuthenticated` when nobody is signed in.
    /// Returns `ProfileServiceError::InvalidProfile` for a blank name; nothing is written.
    /// Returns `ProfileServiceError::StoreUnavailable` if the write fails.
    pub async fn save(&self, name: &str) -> Result<Profile, ProfileServiceError> {
        let user = self.current_user()?;
        let profile = Profile::from_name(name)?;

        if let Err(err) = self
            .profiles
            .save_profile(&user, &profile, self.clock.now())
            .await
        {
            warn!(user = %user, error = %err, "profile write failed");
            self.notifier
                .notify(Notification::failure(format!("Failed to save profile: {err}")));
            return Err(err.into());
        }

        info!(user = %user, "profile saved");
        self.notifier
            .notify(Notification::success("Profile saved successfully!"));
        Ok(profile)
    }

    fn current_user(&self) -> Result<UserId, ProfileServiceError> {
        self.identity
            .current_user()
            .ok_or(ProfileServiceError::NotAuthenticated)
    }
}
