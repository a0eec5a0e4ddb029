pub mod candlestick;

use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;
use twmon_core::Envelope;

use crate::cli::OutputFormat;
use crate::commands::CommandOutput;
use crate::error::CliError;

/// Marker printed wherever a value is unavailable.
pub const MISSING: &str = "n/a";

/// Rows of cell text under a header line, rendered with `tabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: None,
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn to_text(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().cloned());
        }
        let mut rendered = builder.build();
        rendered.with(Style::psql());

        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push('\n');
        }
        out.push_str(&rendered.to_string());
        out.push('\n');
        out
    }
}

pub fn fmt_decimal(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| String::from(MISSING), |value| format!("{value:.decimals$}"))
}

pub fn fmt_percent(value: Option<f64>) -> String {
    value.map_or_else(|| String::from(MISSING), |value| format!("{value:+.2}%"))
}

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&output.envelope)?
            } else {
                serde_json::to_string(&output.envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => render_table(output)?,
    }

    Ok(())
}

fn render_table(output: &CommandOutput) -> Result<(), CliError> {
    if output.tables.is_empty() {
        print_data(&output.envelope)?;
    }
    for (index, table) in output.tables.iter().enumerate() {
        if index > 0 {
            println!();
        }
        print!("{}", table.to_text());
    }

    for note in &output.notes {
        println!("{note}");
    }

    let envelope = &output.envelope;
    if !envelope.errors.is_empty() {
        println!();
        println!("skipped:");
        for error in &envelope.errors {
            match &error.stock_id {
                Some(stock_id) => println!("  - {stock_id}: {}", error.message),
                None => println!("  - {}: {}", error.code, error.message),
            }
        }
    }

    if !envelope.meta.warnings.is_empty() {
        println!();
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}

fn print_data(envelope: &Envelope<Value>) -> Result<(), CliError> {
    let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
    for line in pretty_data.lines() {
        println!("{line}");
    }
    Ok(())
}
