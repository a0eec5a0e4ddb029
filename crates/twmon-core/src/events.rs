//! Keyword → stock lookup for news events.
//!
//! The rule table is static and human-authored. Matching is case-insensitive
//! with no scoring. Latin terms only match whole words, so `AI` never fires on
//! "Taiwan" or "said"; CJK terms match anywhere in the text.

use serde::Serialize;

use crate::StockId;

/// One keyword with the stocks it is associated with and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRule {
    pub keyword: String,
    pub aliases: Vec<String>,
    pub stock_ids: Vec<StockId>,
    pub rationale: String,
}

impl EventRule {
    pub fn new(
        keyword: impl Into<String>,
        aliases: &[&str],
        stock_ids: Vec<StockId>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            aliases: aliases.iter().map(|alias| (*alias).to_owned()).collect(),
            stock_ids,
            rationale: rationale.into(),
        }
    }

    /// True when the keyword or any alias occurs in `haystack`, which must already be lowercased.
    fn matches(&self, haystack: &str) -> bool {
        std::iter::once(&self.keyword)
            .chain(self.aliases.iter())
            .filter(|term| !term.trim().is_empty())
            .any(|term| contains_term(haystack, &term.to_lowercase()))
    }
}

/// Substring search that rejects a hit when a Latin term runs into adjacent letters or digits.
fn contains_term(haystack: &str, term: &str) -> bool {
    let bounded_start = term.chars().next().is_some_and(|ch| ch.is_ascii_alphanumeric());
    let bounded_end = term.chars().next_back().is_some_and(|ch| ch.is_ascii_alphanumeric());

    haystack.match_indices(term).any(|(start, found)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + found.len()..].chars().next();
        let joined_before = bounded_start && before.is_some_and(|ch| ch.is_ascii_alphanumeric());
        let joined_after = bounded_end && after.is_some_and(|ch| ch.is_ascii_alphanumeric());
        !joined_before && !joined_after
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventBook {
    rules: Vec<EventRule>,
}

impl EventBook {
    pub fn new(rules: Vec<EventRule>) -> Self {
        Self { rules }
    }

    /// Built-in rule table.
    pub fn builtin() -> Self {
        let ids = |raw: &[&str]| -> Vec<StockId> {
            raw.iter().filter_map(|id| StockId::parse(id).ok()).collect()
        };

        Self::new(vec![
            EventRule::new(
                "AI",
                &["人工智慧", "輝達", "nvidia", "伺服器"],
                ids(&["2330", "2382", "3231", "2357"]),
                "AI 伺服器需求帶動晶圓代工與伺服器組裝廠出貨",
            ),
            EventRule::new(
                "日本",
                &["japan", "熊本"],
                ids(&["2330", "2303"]),
                "日本擴大半導體補貼，台廠赴日設廠受惠",
            ),
            EventRule::new(
                "紅海",
                &["red sea", "蘇伊士", "suez"],
                ids(&["2603", "2609", "2615"]),
                "航線繞道拉長航程，貨櫃運價上漲",
            ),
            EventRule::new(
                "電網",
                &["power grid", "台電", "強韌電網"],
                ids(&["1513", "1503", "1519"]),
                "電網強化計畫釋出重電設備標案",
            ),
            EventRule::new(
                "綠能",
                &["green energy", "離岸風電", "offshore wind"],
                ids(&["1513", "1519"]),
                "再生能源併網需求推升變壓器與配電盤訂單",
            ),
            EventRule::new(
                "蘋果",
                &["apple", "iphone"],
                ids(&["2317", "2330"]),
                "新機拉貨週期帶動組裝與先進製程訂單",
            ),
        ])
    }

    pub fn rules(&self) -> &[EventRule] {
        &self.rules
    }

    /// Rules whose keyword or alias appears in `text`, in table order.
    pub fn match_text(&self, text: &str) -> Vec<&EventRule> {
        let haystack = text.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.matches(&haystack))
            .collect()
    }

    /// De-duplicated stock ids of every matched rule, first occurrence wins.
    pub fn tickers_for(&self, text: &str) -> Vec<StockId> {
        let mut seen = Vec::new();
        for stock_id in self
            .match_text(text)
            .into_iter()
            .flat_map(|rule| rule.stock_ids.iter())
        {
            if !seen.contains(stock_id) {
                seen.push(stock_id.clone());
            }
        }
        seen
    }
}
