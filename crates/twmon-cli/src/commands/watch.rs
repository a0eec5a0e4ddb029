use serde::Serialize;
use twmon_core::catalog::{self, ReferenceLink};
use twmon_core::{
    BatchReport, EnvelopeError, IndicatorConfig, MonitorConfig, Sector, SkippedInstrument,
    StockId, StockReport,
};

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output::{fmt_decimal, fmt_percent, Table};

use super::{CommandResult, Providers};

#[derive(Debug, Serialize)]
struct WatchResponseData<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sector: Option<Sector>,
    stocks: &'a [StockReport],
    skipped: &'a [SkippedInstrument],
    links: Vec<ReferenceLink>,
}

pub async fn run(
    args: &WatchArgs,
    providers: &Providers,
    config: &MonitorConfig,
) -> Result<CommandResult, CliError> {
    let sector = args
        .sector
        .as_deref()
        .map(str::parse::<Sector>)
        .transpose()?;
    let explicit = parse_ids(&args.ids)?;

    let mut warnings = Vec::new();
    let explicit_is_empty = explicit.is_empty();
    let stock_ids = match (explicit_is_empty, sector) {
        (false, Some(sector)) => {
            warnings.push(format!(
                "--sector {sector} ignored because stock ids were given"
            ));
            explicit
        }
        (false, None) => explicit,
        (true, Some(sector)) => sector.stock_ids(),
        (true, None) => catalog::default_watchlist(),
    };

    let analyzer = providers.analyzer(config);
    let batch = analyzer.analyze_batch(&stock_ids).await;

    let shown_sector = sector.filter(|_| explicit_is_empty);
    let mut result = batch_result(&batch, shown_sector, &config.indicators, analyzer.source_chain())?;
    for warning in warnings {
        result = result.with_warning(warning);
    }
    Ok(result)
}

/// Parses positional ids, each of which may hold a comma-separated list.
pub(super) fn parse_ids(raw: &[String]) -> Result<Vec<StockId>, CliError> {
    let mut ids = Vec::new();
    for value in raw {
        for stock_id in StockId::parse_list(value)? {
            if !ids.contains(&stock_id) {
                ids.push(stock_id);
            }
        }
    }
    Ok(ids)
}

/// Envelope data, watch table and skipped-stock errors for a finished batch.
pub(super) fn batch_result(
    batch: &BatchReport,
    sector: Option<Sector>,
    indicators: &IndicatorConfig,
    source_chain: Vec<twmon_core::ProviderId>,
) -> Result<CommandResult, CliError> {
    let links = catalog::reference_links(batch.reports.first().map(|report| &report.stock_id));
    let data = serde_json::to_value(WatchResponseData {
        sector,
        stocks: &batch.reports,
        skipped: &batch.skipped,
        links: links.clone(),
    })?;

    let errors = batch
        .skipped
        .iter()
        .map(EnvelopeError::for_skipped)
        .collect::<Vec<_>>();

    let title = sector.map(|sector| format!("{} ({sector})", sector.label()));
    let mut table = watch_table(&batch.reports, indicators);
    if let Some(title) = title {
        table = table.with_title(title);
    }

    let (short, long) = indicators.suggested_windows;
    let mut notes = vec![format!(
        "* ref price = midpoint of MA{short} and MA{long}; indicative only, not a recommendation"
    )];
    notes.extend(
        links
            .into_iter()
            .map(|link| format!("{}: {}", link.label, link.url)),
    );

    Ok(CommandResult::ok(data, source_chain)
        .with_table(table)
        .with_notes(notes)
        .with_errors(errors))
}

fn watch_table(reports: &[StockReport], indicators: &IndicatorConfig) -> Table {
    let mut headers = vec![
        String::from("id"),
        String::from("name"),
        String::from("venue"),
        String::from("price"),
        String::from("chg"),
    ];
    headers.extend(
        indicators
            .volume_windows
            .iter()
            .map(|window| format!("vol{window}(lots)")),
    );
    headers.extend(indicators.close_windows.iter().map(|window| format!("ma{window}")));
    headers.push(String::from("ref price*"));
    headers.push(String::from("net lots"));
    headers.push(String::from("link"));

    let mut table = Table::new(headers);
    for report in reports {
        let mut row = vec![
            report.stock_id.to_string(),
            report.name.clone(),
            report.venue.label().to_owned(),
            fmt_decimal(report.last_price, 2),
            fmt_percent(report.change_pct),
        ];
        row.extend(
            indicators
                .volume_windows
                .iter()
                .map(|window| fmt_decimal(report.indicators.volume_avg(*window), 0)),
        );
        row.extend(
            indicators
                .close_windows
                .iter()
                .map(|window| fmt_decimal(report.indicators.close_avg(*window), 2)),
        );
        row.push(fmt_decimal(report.indicators.suggested_price, 2));
        row.push(fmt_decimal(report.flow.net_lots(), 1));
        row.push(report.reference_url.clone());
        table.push_row(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use twmon_core::fixtures::{demo_as_of, FixtureFlowSource, FixtureMarketSource};
    use twmon_core::{Analyzer, SourceError, Ticker, Venue};

    #[test]
    fn comma_lists_are_flattened_and_deduplicated() {
        let ids = parse_ids(&[String::from("2330,2317"), String::from("2330")]).expect("ids");
        let ids = ids.iter().map(StockId::as_str).collect::<Vec<_>>();
        assert_eq!(ids, vec!["2330", "2317"]);
    }

    #[test]
    fn invalid_id_is_a_validation_error() {
        let err = parse_ids(&[String::from("23-30")]).expect_err("must fail");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn separators_only_still_count_as_no_explicit_ids() {
        // Given: A bare comma parses to an empty id list
        let args = WatchArgs {
            ids: vec![String::from(",")],
            sector: Some(String::from("ai")),
        };

        // When
        let result = run(&args, &Providers::mock(), &MonitorConfig::default())
            .await
            .expect("watch");

        // Then: The sector is watched and shown, with no ignored-sector warning
        assert_eq!(result.data["sector"], "ai");
        assert_eq!(result.tables[0].title.as_deref(), Some("人工智慧 (ai)"));
        assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
    }

    #[tokio::test]
    async fn explicit_ids_hide_the_sector_and_warn() {
        let args = WatchArgs {
            ids: vec![String::from("2330")],
            sector: Some(String::from("ai")),
        };

        let result = run(&args, &Providers::mock(), &MonitorConfig::default())
            .await
            .expect("watch");

        assert!(result.data.get("sector").is_none());
        assert!(result.tables[0].title.is_none());
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn skipped_stocks_become_envelope_errors() {
        let missing = Ticker::new(StockId::parse("2303").expect("id"), Venue::Listed);
        let market = FixtureMarketSource::demo()
            .with_snapshot_failure(&missing, SourceError::unavailable("upstream timeout"));
        let analyzer = Analyzer::new(Arc::new(market))
            .with_flow_source(Arc::new(FixtureFlowSource::demo()))
            .with_as_of(demo_as_of());
        let ids = Sector::Semiconductor.stock_ids();
        let batch = analyzer.analyze_batch(&ids).await;

        let result = batch_result(
            &batch,
            Some(Sector::Semiconductor),
            &IndicatorConfig::default(),
            analyzer.source_chain(),
        )
        .expect("result");

        assert_eq!(result.tables[0].rows.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, "source.unavailable");
        assert_eq!(result.errors[0].stock_id.as_ref().map(StockId::as_str), Some("2303"));
        assert_eq!(result.errors[0].retryable, Some(true));
        assert_eq!(result.data["stocks"].as_array().map(Vec::len), Some(2));
    }
}
