use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::challenge::{Challenge, ChallengeError};
use crate::model::ids::ChallengeIndex;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LevelError {
    #[error("level title cannot be empty")]
    EmptyTitle,

    #[error("level must contain at least one challenge")]
    NoChallenges,

    #[error("too many challenges in a single level: {len}")]
    TooManyChallenges { len: usize },

    #[error("challenge {index} is invalid: {source}")]
    Challenge {
        index: usize,
        #[source]
        source: ChallengeError,
    },
}

/// An ordered unit of content: narrative framing plus a fixed list of challenges.
///
/// Levels are identified by their position in the catalog and never change at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub title: String,
    pub description: String,
    pub story: String,
    pub challenges: Vec<Challenge>,
}

impl Level {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        story: impl Into<String>,
        challenges: Vec<Challenge>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            story: story.into(),
            challenges,
        }
    }

    /// # Errors
    ///
    /// Returns `LevelError` if the title is blank, the level is empty, or any
    /// challenge fails its own validation.
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.title.trim().is_empty() {
            return Err(LevelError::EmptyTitle);
        }
        if self.challenges.is_empty() {
            return Err(LevelError::NoChallenges);
        }
        if u32::try_from(self.challenges.len()).is_err() {
            return Err(LevelError::TooManyChallenges {
                len: self.challenges.len(),
            });
        }
        for (index, challenge) in self.challenges.iter().enumerate() {
            challenge
                .validate()
                .map_err(|source| LevelError::Challenge { index, source })?;
        }
        Ok(())
    }

    /// Number of challenges in this level.
    #[must_use]
    pub fn challenge_count(&self) -> usize {
        self.challenges.len()
    }

    #[must_use]
    pub fn challenge(&self, index: ChallengeIndex) -> Option<&Challenge> {
        self.challenges.get(index.as_usize())
    }
}
