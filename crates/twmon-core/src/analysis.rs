//! Per-instrument analysis and sequential batch processing.
//!
//! Instruments are handled one at a time. Any upstream failure for one instrument
//! skips it and the batch carries on; the broker-flow lookup is best-effort and
//! never skips an instrument on its own.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog;
use crate::data_source::{
    BrokerFlowRequest, BrokerFlowSource, HistoryRequest, MarketDataSource, SourceError,
    SourceErrorKind,
};
use crate::indicators::{IndicatorConfig, IndicatorSet};
use crate::{
    MonitorConfig, NetFlow, ObservationSeries, PriceSnapshot, ProviderId, StockId, Ticker,
    TradingDate, Venue,
};

/// Tries the listing venues in order and returns the first snapshot with a usable price.
///
/// A missing or zero price, or a `NotFound` answer, moves on to the next venue; the
/// secondary venue is tried exactly once. Any other error is returned as-is.
pub async fn resolve_venue(
    source: &dyn MarketDataSource,
    stock_id: &StockId,
) -> Result<PriceSnapshot, SourceError> {
    for venue in Venue::RESOLUTION_ORDER {
        let ticker = Ticker::new(stock_id.clone(), venue);
        match source.snapshot(&ticker).await {
            Ok(snapshot) if snapshot.tradable_price().is_some() => {
                debug!(ticker = %ticker, "venue resolved");
                return Ok(snapshot);
            }
            Ok(_) => debug!(ticker = %ticker, "no tradable price, trying next venue"),
            Err(error) if error.kind() == SourceErrorKind::NotFound => {
                debug!(ticker = %ticker, "ticker unknown, trying next venue");
            }
            Err(error) => return Err(error),
        }
    }

    Err(SourceError::not_found(format!(
        "unknown identifier {stock_id}: no price on TWSE or TPEx"
    )))
}

/// Outcome of the broker-flow lookup for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlowStatus {
    Available(NetFlow),
    /// The provider failed or had no rows in the lookback window.
    Unavailable { reason: String },
    /// No flow provider configured.
    Disabled,
}

impl FlowStatus {
    pub fn net_lots(&self) -> Option<f64> {
        match self {
            Self::Available(flow) => Some(flow.net_lots),
            Self::Unavailable { .. } | Self::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockReport {
    pub stock_id: StockId,
    pub ticker: Ticker,
    pub venue: Venue,
    pub name: String,
    pub last_price: Option<f64>,
    pub previous_close: Option<f64>,
    /// Change of the last price against the previous close, in percent.
    pub change_pct: Option<f64>,
    pub indicators: IndicatorSet,
    pub flow: FlowStatus,
    pub reference_url: String,
    #[serde(skip)]
    pub series: ObservationSeries,
}

/// Instrument dropped from a batch, with the error that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInstrument {
    pub stock_id: StockId,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl SkippedInstrument {
    fn new(stock_id: StockId, error: &SourceError) -> Self {
        Self {
            stock_id,
            code: String::from(error.code()),
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }

    /// Short reason shown to users.
    pub fn reason(&self) -> &str {
        if self.code == "source.not_found" {
            "not found"
        } else {
            &self.message
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub reports: Vec<StockReport>,
    pub skipped: Vec<SkippedInstrument>,
}

impl BatchReport {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

pub struct Analyzer {
    market: Arc<dyn MarketDataSource>,
    flow: Option<Arc<dyn BrokerFlowSource>>,
    indicators: IndicatorConfig,
    history_days: usize,
    flow_lookback_days: u32,
    as_of: Option<TradingDate>,
}

impl Analyzer {
    pub fn new(market: Arc<dyn MarketDataSource>) -> Self {
        let defaults = MonitorConfig::default();
        Self {
            market,
            flow: None,
            indicators: defaults.indicators,
            history_days: defaults.history_days,
            flow_lookback_days: defaults.flow_lookback_days,
            as_of: None,
        }
    }

    pub fn from_config(
        config: &MonitorConfig,
        market: Arc<dyn MarketDataSource>,
        flow: Option<Arc<dyn BrokerFlowSource>>,
    ) -> Self {
        Self {
            market,
            flow,
            indicators: config.indicators.clone(),
            history_days: config.history_days,
            flow_lookback_days: config.flow_lookback_days,
            as_of: None,
        }
    }

    pub fn with_flow_source(mut self, flow: Arc<dyn BrokerFlowSource>) -> Self {
        self.flow = Some(flow);
        self
    }

    pub fn with_indicator_config(mut self, indicators: IndicatorConfig) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn with_history_days(mut self, history_days: usize) -> Self {
        self.history_days = history_days;
        self
    }

    /// Pins the end of the broker-flow window instead of using today's Taipei date.
    pub fn with_as_of(mut self, as_of: TradingDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Providers consulted by this analyzer, market first.
    pub fn source_chain(&self) -> Vec<ProviderId> {
        let mut chain = vec![self.market.id()];
        if let Some(flow) = &self.flow {
            if !chain.contains(&flow.id()) {
                chain.push(flow.id());
            }
        }
        chain
    }

    pub async fn analyze(&self, stock_id: &StockId) -> Result<StockReport, SourceError> {
        let snapshot = resolve_venue(self.market.as_ref(), stock_id).await?;
        let ticker = snapshot.ticker.clone();

        let request = HistoryRequest::new(ticker.clone(), self.history_days)?;
        let series = self.market.history(request).await?;
        let indicators = IndicatorSet::compute(series.observations(), &self.indicators);
        let flow = self.flow_status(stock_id).await;

        let name = snapshot
            .name
            .clone()
            .or_else(|| catalog::display_name(stock_id).map(str::to_owned))
            .unwrap_or_else(|| stock_id.to_string());

        Ok(StockReport {
            stock_id: stock_id.clone(),
            venue: ticker.venue,
            ticker,
            name,
            last_price: snapshot.last_price,
            previous_close: snapshot.previous_close,
            change_pct: change_pct(&snapshot).or(indicators.percent_change),
            indicators,
            flow,
            reference_url: catalog::technical_analysis_url(stock_id),
            series,
        })
    }

    /// Analyzes `stock_ids` in order, skipping any instrument whose fetch fails.
    pub async fn analyze_batch(&self, stock_ids: &[StockId]) -> BatchReport {
        let mut batch = BatchReport::default();

        for stock_id in stock_ids {
            match self.analyze(stock_id).await {
                Ok(report) => {
                    info!(
                        stock_id = %stock_id,
                        ticker = %report.ticker,
                        observations = report.indicators.observation_count,
                        "instrument analyzed"
                    );
                    batch.reports.push(report);
                }
                Err(error) => {
                    warn!(stock_id = %stock_id, code = error.code(), "skipping instrument: {}", error.message());
                    batch.skipped.push(SkippedInstrument::new(stock_id.clone(), &error));
                }
            }
        }

        batch
    }

    async fn flow_status(&self, stock_id: &StockId) -> FlowStatus {
        let Some(flow) = &self.flow else {
            return FlowStatus::Disabled;
        };

        let end = self.as_of.unwrap_or_else(TradingDate::today_in_taipei);
        let request = BrokerFlowRequest::trailing(stock_id.clone(), end, self.flow_lookback_days);
        match flow.broker_trades(request).await {
            Ok(trades) => match NetFlow::latest(&trades) {
                Some(net) => FlowStatus::Available(net),
                None => FlowStatus::Unavailable {
                    reason: format!(
                        "no broker trades in the last {} days",
                        self.flow_lookback_days
                    ),
                },
            },
            Err(error) => {
                warn!(stock_id = %stock_id, code = error.code(), "broker flow unavailable: {}", error.message());
                FlowStatus::Unavailable {
                    reason: error.message().to_owned(),
                }
            }
        }
    }
}

fn change_pct(snapshot: &PriceSnapshot) -> Option<f64> {
    let last = snapshot.tradable_price()?;
    let previous = snapshot.previous_close.filter(|close| *close > 0.0)?;
    Some((last - previous) / previous * 100.0)
}
