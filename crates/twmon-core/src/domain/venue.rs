use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::StockId;

/// Listing board of a Taiwan security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    /// Main board (TWSE), quoted with the `TW` suffix.
    Listed,
    /// Over-the-counter board (TPEx), quoted with the `TWO` suffix.
    OverTheCounter,
}

impl Venue {
    /// Order used by venue resolution: primary board first.
    pub const RESOLUTION_ORDER: [Self; 2] = [Self::Listed, Self::OverTheCounter];

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Listed => "TW",
            Self::OverTheCounter => "TWO",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Listed => "TWSE",
            Self::OverTheCounter => "TPEx",
        }
    }
}

impl Display for Venue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Stock id qualified with its listing venue, rendered as `2330.TW`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker {
    pub stock_id: StockId,
    pub venue: Venue,
}

impl Ticker {
    pub fn new(stock_id: StockId, venue: Venue) -> Self {
        Self { stock_id, venue }
    }

    pub fn symbol(&self) -> String {
        format!("{}.{}", self.stock_id, self.venue.suffix())
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.stock_id, self.venue.suffix())
    }
}
