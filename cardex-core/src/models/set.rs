//! Set catalog records.

use serde::{Deserialize, Serialize};

use super::de::null_as_default;
use crate::error::CoreError;

/// Stable upstream identifier of a set.
pub type SetId = i64;

/// A named collection of cards released together.
///
/// Re-fetched every run; never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSet {
    /// Unique, stable identifier.
    pub id: SetId,
    /// Display name, also used to query the cards endpoint.
    pub name: String,
    /// Short set code.
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    /// Series the set belongs to.
    #[serde(default, deserialize_with = "null_as_default")]
    pub series: String,
    /// Print language.
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    /// Release date as reported upstream.
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
}

impl CardSet {
    /// Creates a set with only an id and name.
    pub fn new(id: SetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            code: String::new(),
            series: String::new(),
            language: String::new(),
            release_date: String::new(),
        }
    }

    /// Checks that the set can be queried.
    ///
    /// The cards endpoint is addressed by name, so a blank name is rejected.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidData(format!("set {} has a blank name", self.id)));
        }
        Ok(())
    }
}
