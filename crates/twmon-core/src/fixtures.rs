//! Deterministic in-memory sources.
//!
//! Used by behaviour tests and by the CLI `--mock` mode. Responses are keyed by
//! ticker symbol; anything not registered answers `source.not_found`. Every call is
//! recorded so tests can assert how often a provider was consulted.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use crate::catalog;
use crate::data_source::{
    BrokerFlowRequest, BrokerFlowSource, HistoryRequest, MarketDataSource, SourceError,
};
use crate::{
    BrokerTrade, Observation, ObservationSeries, PriceSnapshot, ProviderId, StockId, Ticker,
    TradingDate, Venue,
};

/// Last session of the demo dataset.
const DEMO_END: (i32, u8, u8) = (2024, 6, 28);
const DEMO_SESSIONS: usize = 60;

/// Market source answering from registered snapshots and histories.
#[derive(Debug, Default)]
pub struct FixtureMarketSource {
    snapshots: HashMap<String, Result<PriceSnapshot, SourceError>>,
    histories: HashMap<String, Result<Vec<Observation>, SourceError>>,
    calls: Mutex<Vec<String>>,
}

impl FixtureMarketSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthetic 60-session dataset for every catalog stock, all on the main board.
    pub fn demo() -> Self {
        let end = demo_as_of();
        catalog::reference_listing()
            .iter()
            .fold(Self::new(), |source, &(id, name)| {
                let Ok(stock_id) = StockId::parse(id) else {
                    return source;
                };
                let ticker = Ticker::new(stock_id, Venue::Listed);
                let observations = synthetic_observations(&ticker, end, DEMO_SESSIONS);
                source.with_listing(ticker, Some(name), observations)
            })
    }

    /// Registers a snapshot and a history derived from `observations`.
    ///
    /// The last close becomes the snapshot price and the one before it the previous close.
    pub fn with_listing(
        mut self,
        ticker: Ticker,
        name: Option<&str>,
        observations: Vec<Observation>,
    ) -> Self {
        let last = observations.last().map(|observation| observation.close);
        let previous = observations
            .iter()
            .rev()
            .nth(1)
            .map(|observation| observation.close);
        let snapshot = PriceSnapshot::new(
            ticker.clone(),
            name.map(str::to_owned),
            last,
            previous,
            "TWD",
        )
        .map_err(SourceError::from);

        self.snapshots.insert(ticker.symbol(), snapshot);
        self.histories.insert(ticker.symbol(), Ok(observations));
        self
    }

    pub fn with_snapshot(mut self, snapshot: PriceSnapshot) -> Self {
        self.snapshots
            .insert(snapshot.ticker.symbol(), Ok(snapshot));
        self
    }

    pub fn with_history(mut self, ticker: &Ticker, observations: Vec<Observation>) -> Self {
        self.histories.insert(ticker.symbol(), Ok(observations));
        self
    }

    /// Makes snapshot requests for `ticker` fail with `error`.
    pub fn with_snapshot_failure(mut self, ticker: &Ticker, error: SourceError) -> Self {
        self.snapshots.insert(ticker.symbol(), Err(error));
        self
    }

    pub fn with_history_failure(mut self, ticker: &Ticker, error: SourceError) -> Self {
        self.histories.insert(ticker.symbol(), Err(error));
        self
    }

    /// Calls received so far, formatted as `snapshot:2330.TW` or `history:2330.TW`.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn snapshot_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix("snapshot:").map(str::to_owned))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }
}

impl MarketDataSource for FixtureMarketSource {
    fn id(&self) -> ProviderId {
        ProviderId::Fixture
    }

    fn snapshot<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSnapshot, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let symbol = ticker.symbol();
            self.record(format!("snapshot:{symbol}"));
            self.snapshots.get(&symbol).cloned().unwrap_or_else(|| {
                Err(SourceError::not_found(format!("no fixture snapshot for {symbol}")))
            })
        })
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ObservationSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let symbol = req.ticker.symbol();
            self.record(format!("history:{symbol}"));
            let observations = self.histories.get(&symbol).cloned().unwrap_or_else(|| {
                Err(SourceError::not_found(format!("no fixture history for {symbol}")))
            })?;

            let series = ObservationSeries::new(req.ticker.clone(), observations)?;
            let trailing = series.tail(req.days).to_vec();
            Ok(ObservationSeries::new(req.ticker, trailing)?)
        })
    }
}

/// Broker flow source answering from registered trades.
#[derive(Debug, Default)]
pub struct FixtureFlowSource {
    trades: HashMap<StockId, Result<Vec<BrokerTrade>, SourceError>>,
    calls: Mutex<Vec<BrokerFlowRequest>>,
}

impl FixtureFlowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two branches per catalog stock on the last demo session.
    pub fn demo() -> Self {
        let date = demo_as_of();
        catalog::reference_listing()
            .iter()
            .fold(Self::new(), |source, &(id, _)| {
                let Ok(stock_id) = StockId::parse(id) else {
                    return source;
                };
                let seed = seed_for(id);
                let trades = vec![
                    BrokerTrade {
                        date,
                        broker_id: String::from("9200"),
                        broker_name: String::from("凱基"),
                        buy: 150_000 + (seed % 400) * 1_000,
                        sell: 220_000,
                    },
                    BrokerTrade {
                        date,
                        broker_id: String::from("9800"),
                        broker_name: String::from("元大"),
                        buy: 90_000,
                        sell: 40_000 + (seed % 150) * 1_000,
                    },
                ];
                source.with_trades(stock_id, trades)
            })
    }

    pub fn with_trades(mut self, stock_id: StockId, trades: Vec<BrokerTrade>) -> Self {
        self.trades.insert(stock_id, Ok(trades));
        self
    }

    pub fn with_failure(mut self, stock_id: StockId, error: SourceError) -> Self {
        self.trades.insert(stock_id, Err(error));
        self
    }

    pub fn requests(&self) -> Vec<BrokerFlowRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl BrokerFlowSource for FixtureFlowSource {
    fn id(&self) -> ProviderId {
        ProviderId::Fixture
    }

    fn broker_trades<'a>(
        &'a self,
        req: BrokerFlowRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BrokerTrade>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(req.clone());

            match self.trades.get(&req.stock_id) {
                Some(Ok(trades)) => Ok(trades
                    .iter()
                    .filter(|trade| trade.date >= req.start && trade.date <= req.end)
                    .cloned()
                    .collect()),
                Some(Err(error)) => Err(error.clone()),
                None => Ok(Vec::new()),
            }
        })
    }
}

/// Deterministic weekday observations ending at `end`, oldest first.
pub fn synthetic_observations(ticker: &Ticker, end: TradingDate, sessions: usize) -> Vec<Observation> {
    let seed = seed_for(ticker.stock_id.as_str());
    let base = 20.0 + (seed % 900) as f64;
    let phase = (seed % 17) as f64;

    let mut dates = Vec::with_capacity(sessions);
    let mut date = end;
    while dates.len() < sessions {
        if !is_weekend(date) {
            dates.push(date);
        }
        date = date.minus_days(1);
    }
    dates.reverse();

    dates
        .into_iter()
        .enumerate()
        .filter_map(|(index, date)| {
            let step = index as f64 + phase;
            let drift = 1.0 + index as f64 * 0.002;
            let close = round2(base * drift * (1.0 + 0.03 * (step / 3.0).sin()));
            let open = round2(base * drift * (1.0 + 0.03 * ((step - 1.0) / 3.0).sin()));
            let high = round2(open.max(close) * 1.01);
            let low = round2(open.min(close) * 0.99);
            let volume = 2_000_000 + ((seed + index as u64 * 7_919) % 9_000) * 1_000;
            Observation::new(date, open, high, low, close, volume).ok()
        })
        .collect()
}

/// Last session of the demo dataset; pin broker-flow lookups here in mock mode.
pub fn demo_as_of() -> TradingDate {
    let (year, month, day) = DEMO_END;
    TradingDate::from_ymd(year, month, day).unwrap_or_else(|_| TradingDate::today_in_taipei())
}

fn is_weekend(date: TradingDate) -> bool {
    matches!(
        date.into_inner().weekday(),
        time::Weekday::Saturday | time::Weekday::Sunday
    )
}

fn seed_for(id: &str) -> u64 {
    id.bytes()
        .fold(0_u64, |acc, byte| acc.wrapping_mul(33).wrapping_add(u64::from(byte)))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
