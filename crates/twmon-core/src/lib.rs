//! Core library for twmon, a Taiwan equity monitor.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The indicator calculator
//! - Provider contracts, live adapters and deterministic fixtures
//! - Venue resolution and batch analysis
//! - Sector catalog and news-event lookup
//! - Response envelope, configuration, caching and request throttling

pub mod adapters;
pub mod analysis;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod http_client;
pub mod indicators;
pub mod source;
pub mod throttling;

pub use adapters::{FinMindAdapter, UpstreamTransport, YahooAdapter};
pub use analysis::{
    resolve_venue, Analyzer, BatchReport, FlowStatus, SkippedInstrument, StockReport,
};
pub use cache::{CacheMode, CacheStats, CacheStore};
pub use catalog::{ReferenceLink, Sector};
pub use config::{ConfigError, MonitorConfig};
pub use data_source::{
    BrokerFlowRequest, BrokerFlowSource, HistoryRequest, MarketDataSource, SourceError,
    SourceErrorKind,
};
pub use domain::{
    BrokerTrade, NetFlow, Observation, ObservationSeries, PriceSnapshot, StockId, Ticker,
    TradingDate, Venue, ROUND_LOT, TAIPEI_OFFSET_SECS,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};
pub use error::ValidationError;
pub use events::{EventBook, EventRule};
pub use fixtures::{FixtureFlowSource, FixtureMarketSource};
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use indicators::{IndicatorConfig, IndicatorError, IndicatorSet};
pub use source::ProviderId;
pub use throttling::RequestThrottle;
