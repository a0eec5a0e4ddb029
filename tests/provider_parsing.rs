//! Behaviour tests for the live adapters against canned HTTP responses.
//!
//! A routing HTTP client stands in for the network so these verify request
//! shape, payload parsing, caching and throttling without leaving the process.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use twmon_core::{
    resolve_venue, BrokerFlowRequest, BrokerFlowSource, CacheMode, CacheStore, FinMindAdapter,
    HistoryRequest, HttpClient, HttpError, HttpRequest, HttpResponse, MarketDataSource,
    RequestThrottle, SourceErrorKind, StockId, Ticker, TradingDate, UpstreamTransport, Venue,
    YahooAdapter,
};

const YAHOO_BASE: &str = "https://yahoo.test";
const FINMIND_BASE: &str = "https://finmind.test/data";

/// Answers the first route whose fragment appears in the URL; 404 otherwise.
#[derive(Default)]
struct RoutingHttpClient {
    routes: Vec<(String, HttpResponse)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RoutingHttpClient {
    fn route(mut self, fragment: &str, response: HttpResponse) -> Self {
        self.routes.push((fragment.to_owned(), response));
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.url).collect()
    }
}

impl HttpClient for RoutingHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .routes
                .iter()
                .find(|(fragment, _)| request.url.contains(fragment.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| HttpResponse::with_status(404, ""));
            self.requests.lock().expect("requests lock").push(request);
            Ok(response)
        })
    }
}

fn transport(client: &Arc<RoutingHttpClient>, cache: CacheStore, throttle: RequestThrottle) -> UpstreamTransport {
    let http_client: Arc<dyn HttpClient> = client.clone();
    UpstreamTransport::new(http_client, cache, throttle)
}

fn uncached(client: &Arc<RoutingHttpClient>) -> UpstreamTransport {
    transport(client, CacheStore::disabled(), RequestThrottle::disabled())
}

fn tsmc(venue: Venue) -> Ticker {
    Ticker::new(StockId::parse("2330").expect("valid id"), venue)
}

/// Three sessions, 2024-01-02..04 in Taipei time.
fn chart_body() -> String {
    String::from(
        r#"{"chart":{"result":[{
            "meta":{"currency":"TWD","shortName":"TAIWAN SEMICONDUCTOR","regularMarketPrice":586.0,
                    "chartPreviousClose":580.0,"gmtoffset":28800},
            "timestamp":[1704159000,1704245400,1704331800],
            "indicators":{"quote":[{
                "open":[590.0,584.0,580.0],"high":[593.0,585.0,587.0],
                "low":[589.0,576.0,578.0],"close":[593.0,578.0,586.0],
                "volume":[22200000,34400000,20100000]
            }]}
        }],"error":null}}"#,
    )
}

fn finmind_body() -> String {
    String::from(
        r#"{"msg":"success","status":200,"data":[
            {"securities_trader":"凱基台北","securities_trader_id":"9200","stock_id":"2330",
             "date":"2024-06-27","price":990.0,"buy":5000000.0,"sell":0.0},
            {"securities_trader":"凱基台北","securities_trader_id":"9200","stock_id":"2330",
             "date":"2024-06-28","price":995.0,"buy":2000000.0,"sell":500000.0}
        ]}"#,
    )
}

// =============================================================================
// Yahoo chart parsing
// =============================================================================

#[tokio::test]
async fn when_yahoo_returns_a_chart_snapshot_carries_price_and_prior_session_close() {
    // Given
    let client = Arc::new(RoutingHttpClient::default().route("2330.TW?", HttpResponse::ok_json(chart_body())));
    let adapter = YahooAdapter::new(uncached(&client)).with_base_url(YAHOO_BASE);

    // When
    let snapshot = adapter.snapshot(&tsmc(Venue::Listed)).await.expect("snapshot");

    // Then: The previous close is the second-to-last session, not chartPreviousClose
    assert_eq!(snapshot.last_price, Some(586.0));
    assert_eq!(snapshot.previous_close, Some(578.0));
    assert_eq!(snapshot.currency, "TWD");
    assert_eq!(snapshot.name.as_deref(), Some("TAIWAN SEMICONDUCTOR"));

    // And: The request targets the chart endpoint with a daily interval
    assert_eq!(
        client.urls(),
        vec![format!("{YAHOO_BASE}/v8/finance/chart/2330.TW?range=5d&interval=1d")]
    );
}

#[tokio::test]
async fn when_history_is_requested_only_trailing_sessions_are_returned_in_order() {
    // Given
    let client = Arc::new(RoutingHttpClient::default().route("2330.TW?", HttpResponse::ok_json(chart_body())));
    let adapter = YahooAdapter::new(uncached(&client)).with_base_url(YAHOO_BASE);
    let request = HistoryRequest::new(tsmc(Venue::Listed), 2).expect("valid request");

    // When
    let series = adapter.history(request).await.expect("history");

    // Then: Dates follow the Taipei calendar, oldest first
    let dates = series
        .observations()
        .iter()
        .map(|observation| observation.date.to_string())
        .collect::<Vec<_>>();
    assert_eq!(dates, vec!["2024-01-03", "2024-01-04"]);
    assert_eq!(series.observations()[1].volume, 20_100_000);
}

#[tokio::test]
async fn when_main_board_is_unknown_to_yahoo_otc_board_is_resolved() {
    // Given: 404 for .TW, a chart for .TWO
    let client = Arc::new(RoutingHttpClient::default().route("2330.TWO?", HttpResponse::ok_json(chart_body())));
    let adapter = YahooAdapter::new(uncached(&client)).with_base_url(YAHOO_BASE);

    // When
    let snapshot = resolve_venue(&adapter, &StockId::parse("2330").expect("id"))
        .await
        .expect("resolves");

    // Then
    assert_eq!(snapshot.ticker, tsmc(Venue::OverTheCounter));
    assert_eq!(client.urls().len(), 2);
}

#[tokio::test]
async fn when_yahoo_rate_limits_error_is_retryable() {
    let client = Arc::new(RoutingHttpClient::default().route("2330", HttpResponse::with_status(429, "")));
    let adapter = YahooAdapter::new(uncached(&client)).with_base_url(YAHOO_BASE);

    let err = adapter.snapshot(&tsmc(Venue::Listed)).await.expect_err("must fail");

    assert_eq!(err.kind(), SourceErrorKind::RateLimited);
    assert!(err.retryable());
}

#[tokio::test]
async fn when_yahoo_returns_malformed_json_error_is_internal() {
    let client = Arc::new(RoutingHttpClient::default().route("2330", HttpResponse::ok_json("<html>")));
    let adapter = YahooAdapter::new(uncached(&client)).with_base_url(YAHOO_BASE);

    let err = adapter.snapshot(&tsmc(Venue::Listed)).await.expect_err("must fail");

    assert_eq!(err.kind(), SourceErrorKind::Internal);
}

// =============================================================================
// FinMind broker report parsing
// =============================================================================

#[tokio::test]
async fn when_token_is_configured_finmind_request_carries_bearer_auth() {
    // Given
    let client = Arc::new(RoutingHttpClient::default().route("finmind.test", HttpResponse::ok_json(finmind_body())));
    let adapter = FinMindAdapter::new(uncached(&client), Some(String::from("secret")))
        .with_base_url(FINMIND_BASE);
    let end = TradingDate::parse("2024-06-28").expect("date");
    let request = BrokerFlowRequest::trailing(StockId::parse("2330").expect("id"), end, 7);

    // When
    let trades = adapter.broker_trades(request).await.expect("trades");

    // Then: Rows parse into whole share counts
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[1].buy, 2_000_000);
    assert_eq!(trades[1].sell, 500_000);
    assert_eq!(trades[1].broker_name, "凱基台北");

    // And: Query and auth header are sent
    let requests = client.requests();
    assert_eq!(
        requests[0].url,
        format!(
            "{FINMIND_BASE}?dataset=TaiwanStockTradingDailyReport&data_id=2330&start_date=2024-06-21&end_date=2024-06-28"
        )
    );
    assert_eq!(
        requests[0].headers.get("authorization").map(String::as_str),
        Some("Bearer secret")
    );
}

#[tokio::test]
async fn when_no_token_is_configured_finmind_request_is_anonymous() {
    let client = Arc::new(RoutingHttpClient::default().route("finmind.test", HttpResponse::ok_json(finmind_body())));
    let adapter = FinMindAdapter::new(uncached(&client), None).with_base_url(FINMIND_BASE);
    let end = TradingDate::parse("2024-06-28").expect("date");

    adapter
        .broker_trades(BrokerFlowRequest::trailing(StockId::parse("2330").expect("id"), end, 7))
        .await
        .expect("trades");

    assert!(!adapter.is_authenticated());
    assert!(!client.requests()[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn when_finmind_quota_is_exhausted_error_is_rate_limited() {
    let client = Arc::new(RoutingHttpClient::default().route("finmind.test", HttpResponse::with_status(402, "")));
    let adapter = FinMindAdapter::new(uncached(&client), None).with_base_url(FINMIND_BASE);
    let end = TradingDate::parse("2024-06-28").expect("date");

    let err = adapter
        .broker_trades(BrokerFlowRequest::trailing(StockId::parse("2330").expect("id"), end, 7))
        .await
        .expect_err("must fail");

    assert_eq!(err.kind(), SourceErrorKind::RateLimited);
}

// =============================================================================
// Cache and throttle
// =============================================================================

#[tokio::test]
async fn when_response_is_cached_second_fetch_skips_the_network() {
    // Given: A live cache shared by the transport
    let client = Arc::new(RoutingHttpClient::default().route("2330.TW?", HttpResponse::ok_json(chart_body())));
    let cache = CacheStore::new(Duration::from_secs(60));
    let adapter = YahooAdapter::new(transport(&client, cache.clone(), RequestThrottle::disabled()))
        .with_base_url(YAHOO_BASE);

    // When
    let first = adapter.snapshot(&tsmc(Venue::Listed)).await.expect("first");
    let second = adapter.snapshot(&tsmc(Venue::Listed)).await.expect("second");

    // Then
    assert_eq!(first, second);
    assert_eq!(client.urls().len(), 1);
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn when_refresh_is_requested_cache_is_not_read() {
    // Given
    let client = Arc::new(RoutingHttpClient::default().route("2330.TW?", HttpResponse::ok_json(chart_body())));
    let cache = CacheStore::new(Duration::from_secs(60));
    let refreshing = transport(&client, cache.clone(), RequestThrottle::disabled())
        .with_cache_mode(CacheMode::Refresh);
    let adapter = YahooAdapter::new(refreshing).with_base_url(YAHOO_BASE);

    // When
    adapter.snapshot(&tsmc(Venue::Listed)).await.expect("first");
    adapter.snapshot(&tsmc(Venue::Listed)).await.expect("second");

    // Then: Both calls hit the network, and the entry is still written
    assert_eq!(client.urls().len(), 2);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn when_upstream_fails_response_is_not_cached() {
    let client = Arc::new(RoutingHttpClient::default().route("2330", HttpResponse::with_status(503, "")));
    let cache = CacheStore::new(Duration::from_secs(60));
    let adapter = YahooAdapter::new(transport(&client, cache.clone(), RequestThrottle::disabled()))
        .with_base_url(YAHOO_BASE);

    let _ = adapter.snapshot(&tsmc(Venue::Listed)).await;
    let _ = adapter.snapshot(&tsmc(Venue::Listed)).await;

    assert_eq!(client.urls().len(), 2);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn when_throttle_is_enabled_successive_requests_are_spaced() {
    // Given: A 60ms delay between upstream calls
    let client = Arc::new(
        RoutingHttpClient::default()
            .route("2330.TW?", HttpResponse::ok_json(chart_body()))
            .route("2330.TWO?", HttpResponse::ok_json(chart_body())),
    );
    let throttle = RequestThrottle::new(Duration::from_millis(60));
    let adapter = YahooAdapter::new(transport(&client, CacheStore::disabled(), throttle))
        .with_base_url(YAHOO_BASE);

    // When
    let started = Instant::now();
    adapter.snapshot(&tsmc(Venue::Listed)).await.expect("first");
    adapter.snapshot(&tsmc(Venue::OverTheCounter)).await.expect("second");

    // Then
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(client.urls().len(), 2);
}

#[tokio::test]
async fn when_response_is_cached_throttle_is_not_consumed() {
    // Given: A long delay that a second upstream call would have to wait out
    let client = Arc::new(RoutingHttpClient::default().route("2330.TW?", HttpResponse::ok_json(chart_body())));
    let throttle = RequestThrottle::new(Duration::from_secs(5));
    let adapter = YahooAdapter::new(transport(
        &client,
        CacheStore::new(Duration::from_secs(60)),
        throttle.clone(),
    ))
    .with_base_url(YAHOO_BASE);

    // When
    adapter.snapshot(&tsmc(Venue::Listed)).await.expect("first");
    let started = Instant::now();
    adapter.snapshot(&tsmc(Venue::Listed)).await.expect("cached");

    // Then: The cached call returns at once
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(client.urls().len(), 1);
}
