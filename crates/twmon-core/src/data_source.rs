//! Data source traits and request/response types.
//!
//! Two narrow fetch contracts sit between the analyzer and the outside world:
//!
//! | Trait | Capability |
//! |-------|------------|
//! | [`MarketDataSource`] | Latest price snapshot and daily observation history for one ticker |
//! | [`BrokerFlowSource`] | Per-broker buy/sell shares for one stock over a date range |
//!
//! Live adapters live in [`crate::adapters`]; deterministic in-memory
//! implementations live in [`crate::fixtures`].

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{BrokerTrade, ObservationSeries, PriceSnapshot, ProviderId, StockId, Ticker, TradingDate};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    NotFound,
    InvalidRequest,
    Internal,
}

/// Structured source error used by venue resolution and batch skipping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<crate::ValidationError> for SourceError {
    fn from(error: crate::ValidationError) -> Self {
        Self::internal(format!("provider returned invalid data: {error}"))
    }
}

/// Request payload for observation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub ticker: Ticker,
    /// Number of trailing trading days wanted.
    pub days: usize,
}

impl HistoryRequest {
    pub fn new(ticker: Ticker, days: usize) -> Result<Self, SourceError> {
        if days == 0 {
            return Err(SourceError::invalid_request(
                "history request days must be greater than zero",
            ));
        }
        Ok(Self { ticker, days })
    }
}

/// Request payload for broker trading data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerFlowRequest {
    pub stock_id: StockId,
    pub start: TradingDate,
    pub end: TradingDate,
}

impl BrokerFlowRequest {
    pub fn new(stock_id: StockId, start: TradingDate, end: TradingDate) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::invalid_request(format!(
                "broker flow start date {start} is after end date {end}"
            )));
        }
        Ok(Self {
            stock_id,
            start,
            end,
        })
    }

    /// Range covering the `lookback_days` calendar days up to and including `end`.
    pub fn trailing(stock_id: StockId, end: TradingDate, lookback_days: u32) -> Self {
        Self {
            stock_id,
            start: end.minus_days(i64::from(lookback_days)),
            end,
        }
    }
}

/// Quote/price provider contract.
///
/// # Errors
///
/// Implementations return [`SourceErrorKind::NotFound`] when the provider does not
/// know the ticker, which lets venue resolution move on to the next board.
pub trait MarketDataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Latest price and previous close for a ticker.
    fn snapshot<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSnapshot, SourceError>> + Send + 'a>>;

    /// Chronological daily observations, at most `req.days` of them.
    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ObservationSeries, SourceError>> + Send + 'a>>;
}

/// Brokerage flow provider contract.
pub trait BrokerFlowSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn broker_trades<'a>(
        &'a self,
        req: BrokerFlowRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BrokerTrade>, SourceError>> + Send + 'a>>;
}
