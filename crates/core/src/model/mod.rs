mod catalog;
mod challenge;
mod ids;
mod level;
mod profile;
mod progress;

pub use catalog::{Catalog, CatalogError};
pub use challenge::{
    Challenge, ChallengeError, ChallengeKind, Matching, MatchingPair, MultipleChoice,
};
pub use ids::{ChallengeIndex, LevelIndex, ParseIdError, UserId};
pub use level::{Level, LevelError};
pub use profile::{DisplayName, Profile, ProfileError};
pub use progress::ProgressMark;
