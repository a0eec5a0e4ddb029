use serde::{Deserialize, Serialize};

use crate::{Ticker, TradingDate, ValidationError};

/// Shares per board lot on the Taiwan exchanges.
pub const ROUND_LOT: u64 = 1_000;

/// One trading day of OHLCV data for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: TradingDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Raw share volume.
    pub volume: u64,
}

impl Observation {
    pub fn new(
        date: TradingDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Chronological observation history for a resolved ticker.
///
/// Dates are strictly increasing; the series is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    ticker: Ticker,
    observations: Vec<Observation>,
}

impl ObservationSeries {
    pub fn new(ticker: Ticker, observations: Vec<Observation>) -> Result<Self, ValidationError> {
        if let Some(index) = observations
            .windows(2)
            .position(|pair| pair[1].date <= pair[0].date)
        {
            return Err(ValidationError::ObservationsOutOfOrder { index: index + 1 });
        }

        Ok(Self {
            ticker,
            observations,
        })
    }

    /// Builds a series from rows in arbitrary order. Rows sharing a date keep the last one seen.
    pub fn from_unordered(ticker: Ticker, mut observations: Vec<Observation>) -> Self {
        // Stable sort keeps arrival order within a date, so dedup can retain the latest row.
        observations.sort_by_key(|observation| observation.date);
        let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
        for observation in observations {
            match deduped.last_mut() {
                Some(last) if last.date == observation.date => *last = observation,
                _ => deduped.push(observation),
            }
        }

        Self {
            ticker,
            observations: deduped,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Trailing `count` observations (or all of them when shorter).
    pub fn tail(&self, count: usize) -> &[Observation] {
        let start = self.observations.len().saturating_sub(count);
        &self.observations[start..]
    }
}

/// Latest price information for a ticker as reported by the quote provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub ticker: Ticker,
    pub name: Option<String>,
    pub last_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub currency: String,
}

impl PriceSnapshot {
    pub fn new(
        ticker: Ticker,
        name: Option<String>,
        last_price: Option<f64>,
        previous_close: Option<f64>,
        currency: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        validate_optional_non_negative("last_price", last_price)?;
        validate_optional_non_negative("previous_close", previous_close)?;

        Ok(Self {
            ticker,
            name: name.filter(|value| !value.trim().is_empty()),
            last_price,
            previous_close,
            currency: validate_currency_code(currency.as_ref())?,
        })
    }

    /// A price that can be used to confirm the listing venue: present and non-zero.
    pub fn tradable_price(&self) -> Option<f64> {
        self.last_price.filter(|price| *price > 0.0)
    }
}

/// Shares bought and sold by one broker branch on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerTrade {
    pub date: TradingDate,
    pub broker_id: String,
    pub broker_name: String,
    pub buy: u64,
    pub sell: u64,
}

/// Net brokerage flow for a single trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetFlow {
    pub date: TradingDate,
    pub net_shares: i64,
    /// Net shares in board lots, rounded to one decimal place.
    pub net_lots: f64,
}

impl NetFlow {
    /// Aggregates the most recent date present in `trades`. Returns `None` for an empty slice.
    pub fn latest(trades: &[BrokerTrade]) -> Option<Self> {
        let date = trades.iter().map(|trade| trade.date).max()?;
        let (buy, sell) = trades
            .iter()
            .filter(|trade| trade.date == date)
            .fold((0_i128, 0_i128), |(buy, sell), trade| {
                (buy + i128::from(trade.buy), sell + i128::from(trade.sell))
            });
        let net_shares = i64::try_from(buy - sell).unwrap_or(if buy > sell {
            i64::MAX
        } else {
            i64::MIN
        });
        let net_lots = (net_shares as f64 / (ROUND_LOT as f64 / 10.0)).round() / 10.0;

        Some(Self {
            date,
            net_shares,
            net_lots,
        })
    }
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StockId, Venue};

    fn date(raw: &str) -> TradingDate {
        TradingDate::parse(raw).expect("valid date")
    }

    fn ticker() -> Ticker {
        Ticker::new(StockId::parse("2330").expect("valid id"), Venue::Listed)
    }

    fn observation(raw_date: &str, close: f64) -> Observation {
        Observation::new(date(raw_date), close, close, close, close, 1_000).expect("valid")
    }

    #[test]
    fn validates_currency() {
        assert_eq!(validate_currency_code("twd").expect("must normalize"), "TWD");
        assert!(matches!(
            validate_currency_code("NTD$"),
            Err(ValidationError::InvalidCurrency { .. })
        ));
    }

    #[test]
    fn rejects_invalid_observation_bounds() {
        let err = Observation::new(date("2024-01-02"), 10.0, 12.0, 9.0, 12.5, 10)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidBarBounds));
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let err = ObservationSeries::new(
            ticker(),
            vec![
                observation("2024-01-02", 10.0),
                observation("2024-01-02", 11.0),
            ],
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::ObservationsOutOfOrder { index: 1 }));
    }

    #[test]
    fn from_unordered_sorts_and_keeps_latest_duplicate() {
        let series = ObservationSeries::from_unordered(
            ticker(),
            vec![
                observation("2024-01-03", 12.0),
                observation("2024-01-02", 10.0),
                observation("2024-01-03", 13.0),
            ],
        );

        let closes = series
            .observations()
            .iter()
            .map(|observation| observation.close)
            .collect::<Vec<_>>();
        assert_eq!(closes, vec![10.0, 13.0]);
    }

    #[test]
    fn snapshot_treats_zero_price_as_untradable() {
        let snapshot =
            PriceSnapshot::new(ticker(), None, Some(0.0), None, "TWD").expect("valid snapshot");
        assert_eq!(snapshot.tradable_price(), None);
    }

    #[test]
    fn net_flow_uses_latest_date_only() {
        let trade = |raw_date: &str, buy: u64, sell: u64| BrokerTrade {
            date: date(raw_date),
            broker_id: String::from("1020"),
            broker_name: String::from("broker"),
            buy,
            sell,
        };
        let flow = NetFlow::latest(&[
            trade("2024-01-02", 900_000, 0),
            trade("2024-01-03", 5_000, 1_200),
            trade("2024-01-03", 0, 2_250),
        ])
        .expect("flow");

        assert_eq!(flow.date, date("2024-01-03"));
        assert_eq!(flow.net_shares, 1_550);
        assert_eq!(flow.net_lots, 1.6);
        assert!(NetFlow::latest(&[]).is_none());
    }
}
