use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in metadata and envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Yahoo,
    Finmind,
    Fixture,
    /// Built-in sector and event tables.
    Catalog,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [Self::Yahoo, Self::Finmind, Self::Fixture, Self::Catalog];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Finmind => "finmind",
            Self::Fixture => "fixture",
            Self::Catalog => "catalog",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "finmind" => Ok(Self::Finmind),
            "fixture" => Ok(Self::Fixture),
            "catalog" => Ok(Self::Catalog),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
