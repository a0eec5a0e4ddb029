use serde::Serialize;
use twmon_core::catalog;
use twmon_core::{EventBook, EventRule, MonitorConfig, ProviderId, StockId};

use crate::cli::EventsArgs;
use crate::error::CliError;
use crate::output::Table;

use super::watch::batch_result;
use super::{CommandResult, Providers};

#[derive(Debug, Serialize)]
struct EventsResponseData<'a> {
    text: String,
    matches: Vec<&'a EventRule>,
    stock_ids: Vec<StockId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<serde_json::Value>,
}

pub async fn run(
    args: &EventsArgs,
    providers: &Providers,
    config: &MonitorConfig,
) -> Result<CommandResult, CliError> {
    let text = args.text.join(" ");
    let book = EventBook::builtin();
    let matches = book.match_text(&text);
    let stock_ids = book.tickers_for(&text);

    let mut table = Table::new(["keyword", "stocks", "rationale"]);
    for rule in &matches {
        let stocks = rule
            .stock_ids
            .iter()
            .map(|stock_id| match catalog::display_name(stock_id) {
                Some(name) => format!("{stock_id} {name}"),
                None => stock_id.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.push_row(vec![rule.keyword.clone(), stocks, rule.rationale.clone()]);
    }

    if !args.analyze || stock_ids.is_empty() {
        let matched_any = !matches.is_empty();
        let data = serde_json::to_value(EventsResponseData {
            text,
            matches,
            stock_ids,
            analysis: None,
        })?;
        let mut result = CommandResult::ok(data, vec![ProviderId::Catalog]).with_table(table);
        if !matched_any {
            result = result.with_notes(vec![String::from("no keyword matched")]);
        }
        return Ok(result);
    }

    let analyzer = providers.analyzer(config);
    let batch = analyzer.analyze_batch(&stock_ids).await;
    let mut source_chain = vec![ProviderId::Catalog];
    source_chain.extend(analyzer.source_chain());

    let analysis = batch_result(&batch, None, &config.indicators, source_chain)?;
    let data = serde_json::to_value(EventsResponseData {
        text,
        matches,
        stock_ids,
        analysis: Some(analysis.data),
    })?;

    let mut result = CommandResult::ok(data, analysis.source_chain)
        .with_table(table)
        .with_notes(analysis.notes)
        .with_errors(analysis.errors);
    for table in analysis.tables {
        result = result.with_table(table);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(text: &str, analyze: bool) -> EventsArgs {
        EventsArgs {
            text: vec![String::from(text)],
            analyze,
        }
    }

    #[tokio::test]
    async fn matches_keywords_without_touching_providers() {
        let result = run(&args("紅海危機升溫", false), &Providers::mock(), &MonitorConfig::default())
            .await
            .expect("events");

        assert_eq!(result.source_chain, vec![ProviderId::Catalog]);
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].rows[0][0], "紅海");
        assert_eq!(result.data["stock_ids"][0], "2603");
        assert!(result.data.get("analysis").is_none());
    }

    #[tokio::test]
    async fn unmatched_text_adds_a_note() {
        let result = run(&args("央行升息", true), &Providers::mock(), &MonitorConfig::default())
            .await
            .expect("events");

        assert_eq!(result.notes, vec![String::from("no keyword matched")]);
        assert!(result.tables[0].rows.is_empty());
    }

    #[tokio::test]
    async fn analyze_runs_the_matched_stocks_through_the_watch_table() {
        let result = run(&args("紅海", true), &Providers::mock(), &MonitorConfig::default())
            .await
            .expect("events");

        assert_eq!(result.tables.len(), 2);
        assert_eq!(result.tables[1].rows.len(), 3);
        assert_eq!(result.source_chain[0], ProviderId::Catalog);
        assert_eq!(result.data["analysis"]["stocks"][0]["stock_id"], "2603");
    }
}
