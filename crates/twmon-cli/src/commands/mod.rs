mod chart;
mod events;
mod sectors;
mod watch;

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;
use twmon_core::fixtures::{demo_as_of, FixtureFlowSource, FixtureMarketSource};
use twmon_core::{
    Analyzer, BrokerFlowSource, CacheMode, CacheStore, Envelope, EnvelopeError, FinMindAdapter,
    MarketDataSource, MonitorConfig, ProviderId, TradingDate, UpstreamTransport, YahooAdapter,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;
use crate::output::Table;

pub struct CommandResult {
    pub data: Value,
    pub tables: Vec<Table>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            tables: Vec::new(),
            notes: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            source_chain,
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes.extend(notes);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

/// Envelope plus the table view of the same result.
pub struct CommandOutput {
    pub envelope: Envelope<Value>,
    pub tables: Vec<Table>,
    pub notes: Vec<String>,
}

/// Market and flow providers for one invocation.
pub struct Providers {
    market: Arc<dyn MarketDataSource>,
    flow: Option<Arc<dyn BrokerFlowSource>>,
    cache: Option<CacheStore>,
    as_of: Option<TradingDate>,
}

impl Providers {
    pub fn live(config: &MonitorConfig, cache_mode: CacheMode) -> Self {
        let transport = UpstreamTransport::from_config(config).with_cache_mode(cache_mode);
        let cache = transport.cache().clone();
        let finmind = FinMindAdapter::new(transport.clone(), config.finmind_token.clone());
        debug!(authenticated = finmind.is_authenticated(), "finmind adapter ready");

        Self {
            market: Arc::new(YahooAdapter::new(transport)),
            flow: Some(Arc::new(finmind)),
            cache: Some(cache),
            as_of: None,
        }
    }

    pub fn mock() -> Self {
        Self {
            market: Arc::new(FixtureMarketSource::demo()),
            flow: Some(Arc::new(FixtureFlowSource::demo())),
            cache: None,
            as_of: Some(demo_as_of()),
        }
    }

    pub fn analyzer(&self, config: &MonitorConfig) -> Analyzer {
        let analyzer = Analyzer::from_config(config, Arc::clone(&self.market), self.flow.clone());
        match self.as_of {
            Some(as_of) => analyzer.with_as_of(as_of),
            None => analyzer,
        }
    }

    fn cache_hits(&self) -> u64 {
        self.cache.as_ref().map_or(0, |cache| cache.stats().hits)
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let config = MonitorConfig::load(cli.config.as_deref())?;
    let providers = if cli.mock {
        Providers::mock()
    } else {
        let cache_mode = if cli.refresh {
            CacheMode::Refresh
        } else {
            CacheMode::Use
        };
        Providers::live(&config, cache_mode)
    };

    let started = Instant::now();
    let hits_before = providers.cache_hits();

    let command_result = match &cli.command {
        Command::Watch(args) => watch::run(args, &providers, &config).await?,
        Command::Chart(args) => chart::run(args, &providers, &config).await?,
        Command::Events(args) => events::run(args, &providers, &config).await?,
        Command::Sectors => sectors::run()?,
    };

    let CommandResult {
        data,
        tables,
        mut notes,
        warnings,
        errors,
        source_chain,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let cache_hit = providers.cache_hits() > hits_before;

    let mut metadata = Metadata::new(source_chain, latency_ms, cache_hit)?;
    if cli.mock {
        notes.push(String::from("demo data (--mock): figures are synthetic"));
    }
    for warning in warnings {
        metadata.push_warning(warning);
    }

    let meta = metadata.into_envelope_meta()?;
    let envelope = Envelope::with_errors(meta, data, errors)?;

    Ok(CommandOutput {
        envelope,
        tables,
        notes,
    })
}
