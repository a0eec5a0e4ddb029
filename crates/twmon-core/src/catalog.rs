//! Static sector map, reference names and research links.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{StockId, ValidationError};

/// Watch list used when neither ids nor a sector are requested.
pub const DEFAULT_WATCHLIST: [&str; 3] = ["2330", "2317", "2454"];

pub const NEWS_FEED_URL: &str = "https://news.cnyes.com/news/cat/tw_stock";
pub const INSTITUTIONAL_TRADING_URL: &str =
    "https://www.twse.com.tw/zh/page/trading/fund/BFI82U.html";

const TECHNICAL_ANALYSIS_BASE: &str = "https://www.yuantastock.com.tw/static/investment/stock";

const REFERENCE_LISTING: [(&str, &str); 13] = [
    ("2330", "台積電"),
    ("2454", "聯發科"),
    ("2303", "聯電"),
    ("2317", "鴻海"),
    ("2603", "長榮"),
    ("2609", "陽明"),
    ("2615", "萬海"),
    ("2382", "廣達"),
    ("3231", "緯創"),
    ("2357", "華碩"),
    ("1513", "中興電"),
    ("1503", "士電"),
    ("1519", "華城"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Semiconductor,
    Shipping,
    Ai,
    Power,
}

impl Sector {
    pub const ALL: [Self; 4] = [Self::Semiconductor, Self::Shipping, Self::Ai, Self::Power];

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Semiconductor => "semiconductor",
            Self::Shipping => "shipping",
            Self::Ai => "ai",
            Self::Power => "power",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Semiconductor => "半導體",
            Self::Shipping => "航運",
            Self::Ai => "人工智慧",
            Self::Power => "重電/綠能",
        }
    }

    pub const fn members(self) -> &'static [&'static str] {
        match self {
            Self::Semiconductor => &["2330", "2454", "2303"],
            Self::Shipping => &["2603", "2609", "2615"],
            Self::Ai => &["2382", "3231", "2357"],
            Self::Power => &["1513", "1503", "1519"],
        }
    }

    pub fn stock_ids(self) -> Vec<StockId> {
        parse_static(self.members())
    }
}

impl Display for Sector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Sector {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let sector = match trimmed.to_ascii_lowercase().as_str() {
            "semiconductor" | "semi" | "半導體" => Self::Semiconductor,
            "shipping" | "航運" => Self::Shipping,
            "ai" | "人工智慧" => Self::Ai,
            "power" | "green" | "重電/綠能" | "重電" | "綠能" => Self::Power,
            _ => {
                return Err(ValidationError::InvalidSector {
                    value: trimmed.to_owned(),
                })
            }
        };
        Ok(sector)
    }
}

/// Known `(stock id, name)` pairs, in catalog order.
pub fn reference_listing() -> &'static [(&'static str, &'static str)] {
    &REFERENCE_LISTING
}

pub fn display_name(stock_id: &StockId) -> Option<&'static str> {
    REFERENCE_LISTING
        .iter()
        .find(|(id, _)| *id == stock_id.as_str())
        .map(|(_, name)| *name)
}

pub fn default_watchlist() -> Vec<StockId> {
    parse_static(&DEFAULT_WATCHLIST)
}

/// Broker research page with technical charts for `stock_id`.
pub fn technical_analysis_url(stock_id: &StockId) -> String {
    format!("{TECHNICAL_ANALYSIS_BASE}/{stock_id}")
}

/// Labelled external link shown under the watch table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLink {
    pub label: String,
    pub url: String,
}

/// Research links for a watch list: technical analysis for its first stock,
/// the market news feed, and the exchange's institutional trading summary.
pub fn reference_links(first: Option<&StockId>) -> Vec<ReferenceLink> {
    let mut links = Vec::with_capacity(3);
    if let Some(stock_id) = first {
        links.push(ReferenceLink {
            label: String::from("元大證券 - 技術分析"),
            url: technical_analysis_url(stock_id),
        });
    }
    links.push(ReferenceLink {
        label: String::from("鉅亨網 - 台股時事"),
        url: String::from(NEWS_FEED_URL),
    });
    links.push(ReferenceLink {
        label: String::from("證交所 - 盤後籌碼"),
        url: String::from(INSTITUTIONAL_TRADING_URL),
    });
    links
}

fn parse_static(ids: &[&str]) -> Vec<StockId> {
    ids.iter().filter_map(|id| StockId::parse(id).ok()).collect()
}
