//! # Domain Models
//!
//! Canonical domain types for Taiwan equity data.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StockId`] | Validated exchange code such as `2330` |
//! | [`Venue`] | Listing board (`TW` main board, `TWO` over-the-counter) |
//! | [`Ticker`] | Stock id qualified with its venue |
//! | [`Observation`] | One trading day of OHLCV data |
//! | [`ObservationSeries`] | Chronological observations for a ticker |
//! | [`PriceSnapshot`] | Latest price and previous close |
//! | [`BrokerTrade`] | Per-broker buy/sell shares for a date |
//! | [`NetFlow`] | Net broker flow for the latest date |
//! | [`TradingDate`] | Session date (`YYYY-MM-DD`) |
//!
//! All constructors validate their invariants and return [`crate::ValidationError`].

mod date;
mod models;
mod stock_id;
mod venue;

pub use date::{TradingDate, TAIPEI_OFFSET_SECS};
pub use models::{
    validate_currency_code, BrokerTrade, NetFlow, Observation, ObservationSeries, PriceSnapshot,
    ROUND_LOT,
};
pub use stock_id::StockId;
pub use venue::{Ticker, Venue};
