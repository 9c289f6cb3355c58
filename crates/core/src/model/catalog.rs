use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LevelIndex;
use crate::model::level::{Level, LevelError};

const BUILTIN_CATALOG: &str = include_str!("../../assets/levels.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog must contain at least one level")]
    Empty,

    #[error("too many levels in catalog: {len}")]
    TooManyLevels { len: usize },

    #[error("level {index} is invalid: {source}")]
    Level {
        index: usize,
        #[source]
        source: LevelError,
    },
}

#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    levels: Vec<Level>,
}

/// Read-only, ordered list of levels shipped with the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    levels: Vec<Level>,
}

impl Catalog {
    /// Builds a catalog from already-constructed levels.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if there are no levels or any level is malformed.
    pub fn from_levels(levels: Vec<Level>) -> Result<Self, CatalogError> {
        if levels.is_empty() {
            return Err(CatalogError::Empty);
        }
        if u32::try_from(levels.len()).is_err() {
            return Err(CatalogError::TooManyLevels { len: levels.len() });
        }
        for (index, level) in levels.iter().enumerate() {
            level
                .validate()
                .map_err(|source| CatalogError::Level { index, source })?;
        }
        Ok(Self { levels })
    }

    /// Parses a catalog document of the form `{ "levels": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON, or a validation error.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Self::from_levels(file.levels)
    }

    /// The catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the embedded document fails validation.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Serializes the catalog back into its document form.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if serialization fails.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let file = CatalogFile {
            levels: self.levels.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    #[must_use]
    pub fn level(&self, index: LevelIndex) -> Option<&Level> {
        self.levels.get(index.as_usize())
    }

    /// Catalog length; every valid `LevelIndex` is strictly below this value.
    #[must_use]
    pub fn level_count(&self) -> u32 {
        // from_levels guarantees the length fits
        u32::try_from(self.levels.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn contains(&self, index: LevelIndex) -> bool {
        index.value() < self.level_count()
    }
}
