use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use super::UpstreamTransport;
use crate::data_source::{HistoryRequest, MarketDataSource, SourceError};
use crate::http_client::{HttpRequest, HttpResponse};
use crate::{
    Observation, ObservationSeries, PriceSnapshot, ProviderId, Ticker, TradingDate,
    TAIPEI_OFFSET_SECS,
};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const SNAPSHOT_RANGE: &str = "5d";

/// Yahoo Finance chart endpoint adapter.
///
/// A single `v8/finance/chart` call carries both the latest price (in `meta`) and
/// the daily OHLCV arrays, so snapshots and histories share one parser.
#[derive(Clone)]
pub struct YahooAdapter {
    transport: UpstreamTransport,
    base_url: String,
}

impl YahooAdapter {
    pub fn new(transport: UpstreamTransport) -> Self {
        Self {
            transport,
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn fetch_chart(&self, ticker: &Ticker, range: &str) -> Result<ChartData, SourceError> {
        let request = HttpRequest::get(format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            urlencoding::encode(&ticker.symbol())
        ))
        .with_query("range", range)
        .with_query("interval", "1d")
        .with_header("referer", "https://finance.yahoo.com/");

        let response = self.transport.get("yahoo", request).await?;
        classify_status(ticker, &response)?;
        parse_chart(ticker, &response.body)
    }
}

impl MarketDataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn snapshot<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSnapshot, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let chart = self.fetch_chart(ticker, SNAPSHOT_RANGE).await?;
            chart.into_snapshot(ticker)
        })
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ObservationSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let chart = self.fetch_chart(&req.ticker, range_for_days(req.days)).await?;
            let series = ObservationSeries::from_unordered(req.ticker.clone(), chart.observations);
            let trailing = series.tail(req.days).to_vec();
            Ok(ObservationSeries::new(req.ticker, trailing)?)
        })
    }
}

/// Chart range requested for `days` trading sessions.
///
/// The 60-session default maps to `3mo`; a short quarter can leave the longest
/// window without enough observations, which then reports as missing.
fn range_for_days(days: usize) -> &'static str {
    match days {
        0..=4 => "5d",
        5..=18 => "1mo",
        19..=60 => "3mo",
        61..=120 => "6mo",
        121..=240 => "1y",
        241..=480 => "2y",
        _ => "5y",
    }
}

fn classify_status(ticker: &Ticker, response: &HttpResponse) -> Result<(), SourceError> {
    match response.status {
        status if (200..300).contains(&status) => Ok(()),
        404 => Err(SourceError::not_found(format!(
            "yahoo has no chart for {ticker}"
        ))),
        429 => Err(SourceError::rate_limited("yahoo rate limited the chart request")),
        status => Err(SourceError::unavailable(format!(
            "yahoo returned status {status} for {ticker}"
        ))),
    }
}

/// Parsed chart payload for one ticker.
#[derive(Debug, Clone)]
struct ChartData {
    name: Option<String>,
    currency: Option<String>,
    last_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    observations: Vec<Observation>,
}

impl ChartData {
    fn into_snapshot(self, ticker: &Ticker) -> Result<PriceSnapshot, SourceError> {
        let prior_session_close = self
            .observations
            .iter()
            .rev()
            .nth(1)
            .map(|observation| observation.close);
        let previous_close = prior_session_close
            .or(self.previous_close)
            .or(self.chart_previous_close);

        Ok(PriceSnapshot::new(
            ticker.clone(),
            self.name,
            self.last_price,
            previous_close,
            self.currency.as_deref().unwrap_or("TWD"),
        )?)
    }
}

fn parse_chart(ticker: &Ticker, body: &str) -> Result<ChartData, SourceError> {
    let response: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = response.chart.error {
        let detail = error.description.unwrap_or_else(|| error.code.clone());
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Err(SourceError::not_found(format!("yahoo: {detail}")));
        }
        return Err(SourceError::unavailable(format!("yahoo chart API error: {detail}")));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::not_found(format!("yahoo returned no chart for {ticker}")))?;

    let offset = result.meta.gmtoffset.unwrap_or(TAIPEI_OFFSET_SECS);
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut observations = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        // Rows with any missing OHLC value are halted or pre-open sessions.
        let (Some(Some(open)), Some(Some(high)), Some(Some(low)), Some(Some(close))) = (
            quote.open.get(i),
            quote.high.get(i),
            quote.low.get(i),
            quote.close.get(i),
        ) else {
            continue;
        };
        let volume = quote
            .volume
            .get(i)
            .copied()
            .flatten()
            .map_or(0, |value| value.max(0.0) as u64);
        let date = TradingDate::from_unix_timestamp(ts, offset)?;

        // Yahoo occasionally reports highs/lows that exclude the close; skip those rows.
        if let Ok(observation) = Observation::new(date, *open, *high, *low, *close, volume) {
            observations.push(observation);
        }
    }

    let meta = result.meta;
    Ok(ChartData {
        name: meta.short_name.or(meta.long_name),
        currency: meta.currency,
        last_price: meta.regular_market_price,
        chart_previous_close: meta.chart_previous_close,
        previous_close: meta.previous_close,
        observations,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartBody,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartBody {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    meta: YahooChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    gmtoffset: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}
