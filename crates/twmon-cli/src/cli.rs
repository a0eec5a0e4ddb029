//! CLI argument definitions for twmon.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `watch` | Indicators and broker flow for a watch list or sector |
//! | `chart` | Standalone HTML candlestick chart for one stock |
//! | `events` | Map news keywords to related stocks |
//! | `sectors` | List the built-in sector map |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--config` | none | JSON config file (also `TWMON_CONFIG`) |
//! | `--mock` | `false` | Use the built-in demo dataset instead of live providers |
//! | `--refresh` | `false` | Ignore cached responses and refetch |
//! | `--strict` | `false` | Treat warnings and skipped stocks as failures |
//!
//! # Examples
//!
//! ```bash
//! twmon watch 2330 2317 2454
//! twmon watch --sector 航運 --format json --pretty
//! twmon chart 2330 --output 2330.html
//! twmon events "紅海 危機升溫" --analyze
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Taiwan equity monitor
///
/// Prices and history from Yahoo Finance, broker flow from FinMind, with
/// rolling averages and an indicative reference price per stock.
#[derive(Debug, Parser)]
#[command(name = "twmon", author, version, about = "Taiwan equity monitor")]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve every request from the deterministic demo dataset.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Bypass cached upstream responses and store fresh ones.
    #[arg(long, global = true, default_value_t = false)]
    pub refresh: bool,

    /// Treat warnings and skipped stocks as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table.
    Table,
    /// JSON envelope with metadata.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a watch list: price, change, rolling averages and broker net flow.
    ///
    /// Without ids or a sector the default watch list (2330, 2317, 2454) is used.
    /// Explicit ids take precedence over --sector.
    ///
    /// # Examples
    ///
    ///   twmon watch
    ///   twmon watch 2330,2603 6488
    ///   twmon watch --sector shipping
    Watch(WatchArgs),

    /// Write a candlestick chart with close-average overlays to an HTML file.
    ///
    /// # Examples
    ///
    ///   twmon chart 2330
    ///   twmon chart 6488 --days 120 --output gw.html
    Chart(ChartArgs),

    /// Look up stocks related to keywords found in a news headline.
    ///
    /// # Examples
    ///
    ///   twmon events "AI server demand"
    ///   twmon events 紅海 --analyze
    Events(EventsArgs),

    /// List sectors and their member stocks.
    Sectors,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stock ids, space or comma separated.
    pub ids: Vec<String>,

    /// Sector to watch (semiconductor, shipping, ai, power, or the Chinese label).
    #[arg(long)]
    pub sector: Option<String>,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Stock id to chart.
    pub id: String,

    /// Output HTML path (default: <id>_chart.html).
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Trading days to plot.
    #[arg(long, default_value_t = 60)]
    pub days: usize,
}

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Headline or free text to scan.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    /// Run the watch analysis on the matched stocks.
    #[arg(long, default_value_t = false)]
    pub analyze: bool,
}
