//! Sortable identifiers for alarm episodes.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// ULID-backed identifier; ids minted later sort after earlier ones
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(ulid::Ulid);

impl Id {
    /// Mint a fresh id stamped with the current time
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Wall-clock time embedded in the id, millisecond precision
    pub fn minted_at(&self) -> SystemTime {
        self.0.datetime()
    }

    /// Time since the id was minted; zero if the clock went backwards
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.minted_at())
            .unwrap_or_default()
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::Validation(format!("invalid id '{}': {}", s, e)))
    }
}
