use std::path::PathBuf;

use serde::Serialize;
use tracing::info;
use twmon_core::{MonitorConfig, StockId, TradingDate, Venue};

use crate::cli::ChartArgs;
use crate::error::CliError;
use crate::output::{candlestick, fmt_decimal, Table};

use super::{CommandResult, Providers};

#[derive(Debug, Serialize)]
struct ChartResponseData {
    stock_id: StockId,
    ticker: String,
    venue: Venue,
    output: PathBuf,
    observations: usize,
    first_date: Option<TradingDate>,
    last_date: Option<TradingDate>,
    overlays: Vec<usize>,
}

pub async fn run(
    args: &ChartArgs,
    providers: &Providers,
    config: &MonitorConfig,
) -> Result<CommandResult, CliError> {
    if args.days == 0 {
        return Err(CliError::Command(String::from("--days must be greater than zero")));
    }

    let stock_id = StockId::parse(&args.id)?;
    let analyzer = providers.analyzer(config).with_history_days(args.days);
    let report = analyzer.analyze(&stock_id).await.map_err(|error| {
        let reason = if error.code() == "source.not_found" {
            "not found"
        } else {
            error.message()
        };
        CliError::Command(format!("{stock_id}: {reason}"))
    })?;

    let overlays = config.indicators.close_windows.clone();
    let html = candlestick::render_html(&report, &overlays);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{stock_id}_chart.html")));
    std::fs::write(&output, html)?;
    info!(path = %output.display(), observations = report.series.len(), "chart written");

    let observations = report.series.observations();
    let data = ChartResponseData {
        stock_id: stock_id.clone(),
        ticker: report.ticker.symbol(),
        venue: report.venue,
        output: output.clone(),
        observations: observations.len(),
        first_date: observations.first().map(|observation| observation.date),
        last_date: observations.last().map(|observation| observation.date),
        overlays,
    };

    let mut table = Table::new(["id", "ticker", "sessions", "from", "to", "last close", "file"]);
    table.push_row(vec![
        stock_id.to_string(),
        data.ticker.clone(),
        data.observations.to_string(),
        data.first_date.map_or_else(String::new, |date| date.to_string()),
        data.last_date.map_or_else(String::new, |date| date.to_string()),
        fmt_decimal(report.indicators.latest_close, 2),
        output.display().to_string(),
    ]);

    let mut result = CommandResult::ok(serde_json::to_value(&data)?, analyzer.source_chain())
        .with_table(table);
    if data.observations < args.days {
        result = result.with_warning(format!(
            "only {} of {} requested sessions available",
            data.observations, args.days
        ));
    }
    Ok(result)
}
