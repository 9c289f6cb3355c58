use std::sync::{PoisonError, RwLock};

use quest_core::model::UserId;

/// Source of the signed-in user.
///
/// Services ask on every operation, so signing out takes effect immediately.
pub trait IdentityProvider: Send + Sync {
    /// The current user, or `None` when nobody is signed in.
    fn current_user(&self) -> Option<UserId>;
}

/// Identity held in memory, set by the host at startup or by tests.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<UserId>>,
}

impl StaticIdentity {
    #[must_use]
    pub fn new(user: Option<UserId>) -> Self {
        Self {
            user: RwLock::new(user),
        }
    }

    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        Self::new(Some(user))
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn sign_in(&self, user: UserId) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_and_out_toggle_current_user() {
        let identity = StaticIdentity::anonymous();
        assert!(identity.current_user().is_none());

        let ada = UserId::new("ada").unwrap();
        identity.sign_in(ada.clone());
        assert_eq!(identity.current_user(), Some(ada));

        identity.sign_out();
        assert!(identity.current_user().is_none());
    }
}
