use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use super::UpstreamTransport;
use crate::data_source::{BrokerFlowRequest, BrokerFlowSource, SourceError};
use crate::http_client::{HttpAuth, HttpRequest, HttpResponse};
use crate::{BrokerTrade, ProviderId, TradingDate};

const DEFAULT_BASE_URL: &str = "https://api.finmindtrade.com/api/v4/data";
const BROKER_DATASET: &str = "TaiwanStockTradingDailyReport";

/// FinMind open-data adapter for per-branch daily trading reports.
#[derive(Clone)]
pub struct FinMindAdapter {
    transport: UpstreamTransport,
    auth: HttpAuth,
    base_url: String,
}

impl FinMindAdapter {
    pub fn new(transport: UpstreamTransport, token: Option<String>) -> Self {
        Self {
            transport,
            auth: HttpAuth::from_token(token),
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self.auth, HttpAuth::None)
    }

    fn build_request(&self, req: &BrokerFlowRequest) -> HttpRequest {
        HttpRequest::get(self.base_url.clone())
            .with_query("dataset", BROKER_DATASET)
            .with_query("data_id", req.stock_id.as_str())
            .with_query("start_date", &req.start.to_string())
            .with_query("end_date", &req.end.to_string())
            .with_auth(&self.auth)
    }
}

impl BrokerFlowSource for FinMindAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Finmind
    }

    fn broker_trades<'a>(
        &'a self,
        req: BrokerFlowRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BrokerTrade>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .transport
                .get("finmind", self.build_request(&req))
                .await?;
            classify_status(&response)?;
            parse_trades(&response.body)
        })
    }
}

fn classify_status(response: &HttpResponse) -> Result<(), SourceError> {
    match response.status {
        status if (200..300).contains(&status) => Ok(()),
        // FinMind answers 402 once the free-tier request quota is spent.
        402 | 429 => Err(SourceError::rate_limited(format!(
            "finmind request quota exhausted (status {})",
            response.status
        ))),
        401 | 403 => Err(SourceError::unavailable(
            "finmind rejected the request; check FINMIND_TOKEN",
        )),
        status => Err(SourceError::unavailable(format!(
            "finmind returned status {status}"
        ))),
    }
}

fn parse_trades(body: &str) -> Result<Vec<BrokerTrade>, SourceError> {
    let payload: FinMindResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse finmind payload: {e}")))?;

    match payload.status {
        Some(200) | None => {}
        Some(402) => {
            return Err(SourceError::rate_limited(format!(
                "finmind quota exhausted: {}",
                payload.msg.unwrap_or_default()
            )));
        }
        Some(status) => {
            return Err(SourceError::unavailable(format!(
                "finmind status {status}: {}",
                payload.msg.unwrap_or_default()
            )));
        }
    }

    payload
        .data
        .into_iter()
        .map(|row| {
            Ok(BrokerTrade {
                date: TradingDate::parse(&row.date)?,
                broker_id: row.securities_trader_id,
                broker_name: row.securities_trader,
                buy: share_count(row.buy),
                sell: share_count(row.sell),
            })
        })
        .collect()
}

fn share_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FinMindResponse {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    data: Vec<FinMindTradeRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct FinMindTradeRow {
    date: String,
    #[serde(default)]
    securities_trader_id: String,
    #[serde(default)]
    securities_trader: String,
    #[serde(default, alias = "buy_volume")]
    buy: f64,
    #[serde(default, alias = "sell_volume")]
    sell: f64,
}
