//! REST contract tests run against every venue through the registry
//!
//! Each case boxes an adapter from its registry name, swaps in the
//! in-memory transport and checks the behaviour the [`BotExchange`]
//! contract promises regardless of venue.

use rstest::rstest;
use std::sync::Arc;
use tradebridge_exchanges::http::Method;
use tradebridge_exchanges::mock::MockTransport;
use tradebridge_exchanges::prelude::*;

fn venue(name: &str, pair: &Pair, mock: MockTransport) -> (Box<dyn BotExchange>, Arc<MockTransport>) {
    let mock = Arc::new(mock);
    let mut exchange = new_exchange(name).expect("registry name");
    exchange.base_mut().set_transport(mock.clone());
    exchange.disable_rate_limiter();
    exchange
        .set_pairs(vec![pair.clone()], Asset::Spot, false)
        .expect("available pairs");
    exchange
        .set_pairs(vec![pair.clone()], Asset::Spot, true)
        .expect("enabled pairs");
    (exchange, mock)
}

fn failing_transport() -> MockTransport {
    MockTransport::new()
        .route(Method::Get, "", 502, "bad gateway")
        .route(Method::Post, "", 502, "bad gateway")
        .route(Method::Delete, "", 502, "bad gateway")
}

// ============================================================================
// Construction
// ============================================================================

#[rstest]
#[case("bitfinex", "Bitfinex")]
#[case("btcmarkets", "BTCMarkets")]
#[case("btse", "BTSE")]
#[case("coinbasepro", "CoinbasePro")]
#[case("cryptocom", "CryptoCom")]
#[case("gemini", "Gemini")]
#[case("huobi", "Huobi")]
#[case("kraken", "Kraken")]
#[case("lbank", "Lbank")]
#[case("zb", "ZB")]
fn test_registry_builds_venue(#[case] key: &str, #[case] name: &str) {
    let exchange = new_exchange(key).unwrap();
    assert_eq!(exchange.name(), name);
    assert!(exchange.is_enabled());
    assert!(exchange.supports_rest());
    assert!(exchange.supports_asset(Asset::Spot));
    assert!(!exchange.authenticated_api_support(false));
    assert!(!exchange.format_withdraw_permissions().is_empty());

    let defaults = exchange.default_config();
    assert!(defaults.name.eq_ignore_ascii_case(name));
}

#[test]
fn test_supported_list_matches_registry() {
    let names = supported_exchanges();
    assert_eq!(names.len(), 10);
    for name in names {
        assert!(new_exchange(name).is_ok(), "{name}");
    }
}

#[rstest]
#[case("binance")]
#[case("")]
#[case("kraken-futures")]
fn test_unknown_venue_rejected(#[case] name: &str) {
    assert!(matches!(
        new_exchange(name),
        Err(ExchangeError::ExchangeNotSupported(n)) if n == name
    ));
}

#[rstest]
#[case("cryptocom", true)]
#[case("kraken", false)]
#[case("zb", false)]
fn test_websocket_support(#[case] name: &str, #[case] expected: bool) {
    assert_eq!(new_exchange(name).unwrap().supports_websocket(), expected);
}

// ============================================================================
// Failure paths
// ============================================================================

#[rstest]
#[case("bitfinex")]
#[case("btcmarkets")]
#[case("btse")]
#[case("coinbasepro")]
#[case("cryptocom")]
#[case("gemini")]
#[case("huobi")]
#[case("kraken")]
#[case("lbank")]
#[case("zb")]
#[monoio::test]
async fn test_private_calls_gated_without_credentials(#[case] name: &str) {
    let (exchange, mock) = venue(name, &Pair::new("BTC", "USD"), MockTransport::new());
    let err = exchange.update_account_info(Asset::Spot).await.unwrap_err();
    assert_eq!(err, ExchangeError::AuthenticationSupportNotEnabled(exchange.name().to_string()));
    assert!(mock.requests().is_empty(), "{name} hit the network");
}

#[rstest]
#[case("bitfinex", Pair::new("BTC", "USD"))]
#[case("btcmarkets", Pair::new("BTC", "AUD"))]
#[case("btse", Pair::new("BTC", "USD"))]
#[case("coinbasepro", Pair::new("BTC", "USD"))]
#[case("cryptocom", Pair::new("BTC", "USDT"))]
#[case("gemini", Pair::new("BTC", "USD"))]
#[case("huobi", Pair::new("BTC", "USDT"))]
#[case("kraken", Pair::new("BTC", "USD"))]
#[case("lbank", Pair::new("BTC", "USDT"))]
#[case("zb", Pair::new("BTC", "USDT"))]
#[monoio::test]
async fn test_gateway_failure_surfaces_status(#[case] name: &str, #[case] pair: Pair) {
    let (exchange, _) = venue(name, &pair, failing_transport());
    let err = exchange.update_ticker(&pair, Asset::Spot).await.unwrap_err();
    assert!(
        matches!(err, ExchangeError::HttpError { status: 502, .. }),
        "{name}: {err:?}"
    );
}

#[rstest]
#[case("gemini")]
#[case("lbank")]
#[case("zb")]
#[monoio::test]
async fn test_unsupported_asset_rejected(#[case] name: &str) {
    let (exchange, mock) = venue(name, &Pair::new("BTC", "USD"), MockTransport::new());
    assert!(!exchange.supports_asset(Asset::Futures));
    assert!(exchange.update_ticker(&Pair::new("BTC", "USD"), Asset::Futures).await.is_err());
    assert!(mock.requests().is_empty());
}

#[rstest]
#[case("bitfinex", Pair::new("BTC", "USD"))]
#[case("btcmarkets", Pair::new("BTC", "AUD"))]
#[case("cryptocom", Pair::new("BTC", "USDT"))]
#[case("gemini", Pair::new("BTC", "USD"))]
#[case("lbank", Pair::new("BTC", "USDT"))]
#[case("zb", Pair::new("BTC", "USDT"))]
#[monoio::test]
async fn test_client_id_only_cancel_refused_before_network(#[case] name: &str, #[case] pair: Pair) {
    let (exchange, mock) = venue(name, &pair, failing_transport());
    let mut cancel = Cancel::new("", pair, Asset::Spot);
    cancel.client_order_id = "tb-a1b2c3d4e5f6".to_string();

    assert_eq!(exchange.cancel_order(&cancel).await, Err(ExchangeError::OrderIdNotSet), "{name}");
    assert!(mock.requests().is_empty(), "{name} sent a cancel without an order id");
}

// ============================================================================
// Market data
// ============================================================================

#[rstest]
#[case::bitfinex(
    "bitfinex",
    Pair::new("BTC", "USD"),
    "/ticker/tBTCUSD",
    r#"[10645,73.93854271,10647,75.22266119,731.60645389,0.0738,10644.00645389,14480.89849423,10766,9889.1449809]"#,
    "10644.00645389"
)]
#[case::btcmarkets(
    "btcmarkets",
    Pair::new("BTC", "AUD"),
    "/v3/markets/BTC-AUD/ticker",
    r#"{"marketId":"BTC-AUD","bestBid":"13970.17","bestAsk":"13990.84","lastPrice":"13990.84","volume24h":"285.80","volumeQte24h":"4000000.12","price24h":"90.84","pricePct24h":"0.65","low24h":"13800","high24h":"14100","timestamp":"2019-09-05T06:13:37.924000Z"}"#,
    "13990.84"
)]
#[case::btse(
    "btse",
    Pair::new("BTC", "USD"),
    "/api/v3.2/market_summary",
    r#"[{"symbol":"BTC-USD","last":9150.5,"lowestAsk":9151,"highestBid":9150,"percentageChange":1.2,"volume":1234.5,"high24Hr":9300,"low24Hr":9000,"base":"BTC","quote":"USD","active":true}]"#,
    "9150.5"
)]
#[case::cryptocom(
    "cryptocom",
    Pair::new("BTC", "USDT"),
    "public/get-ticker",
    r#"{"id":-1,"method":"public/get-ticker","code":0,"result":{"data":{"i":"BTC_USDT","b":51170,"k":51180,"a":51174.5,"t":1613580710768,"v":1467.4,"h":51335,"l":49650,"c":0.0202}}}"#,
    "51174.5"
)]
#[case::gemini(
    "gemini",
    Pair::new("BTC", "USD"),
    "/v1/pubticker/btcusd",
    r#"{"ask":"977.59","bid":"977.35","last":"977.65","volume":{"BTC":"2210.505328803","USD":"2135477.463379586263","timestamp":1483018200000}}"#,
    "977.65"
)]
#[case::huobi(
    "huobi",
    Pair::new("BTC", "USDT"),
    "/market/detail/merged",
    r#"{"status":"ok","ch":"market.btcusdt.detail.merged","ts":1629788763750,"tick":{"id":272156789143,"version":272156789143,"open":50080.0,"close":49820.92,"low":48767.0,"high":50500.0,"amount":12055.365781937457,"vol":5.985618685709001E8,"count":420573,"bid":[49819.48,2.58112],"ask":[49819.49,0.002411]}}"#,
    "49820.92"
)]
#[case::kraken(
    "kraken",
    Pair::new("BTC", "USD"),
    "/public/Ticker",
    r#"{"error":[],"result":{"XXBTZUSD":{"a":["30300.10000","1","1.000"],"b":["30300.00000","1","1.000"],"c":["30303.20000","0.00067643"],"v":["4083.67001100","4412.73601799"],"p":["30706.77771","30689.13205"],"t":[34619,38907],"l":["29868.30000","29868.30000"],"h":["31631.00000","31631.00000"],"o":"30502.80000"}}}"#,
    "30303.2"
)]
#[case::lbank(
    "lbank",
    Pair::new("BTC", "USDT"),
    "/v2/ticker.do",
    r#"{"result":"true","data":[{"symbol":"btc_usdt","ticker":{"high":10500,"vol":3012.8,"low":9800,"change":1.2,"turnover":30123456.7,"latest":10283.01},"timestamp":1550128421453}],"error_code":0}"#,
    "10283.01"
)]
#[case::zb(
    "zb",
    Pair::new("BTC", "USDT"),
    "/data/v1/ticker",
    r#"{"ticker":{"vol":"1512.2","last":"9300.5","sell":"9301","buy":"9300","high":"9400","low":"9100"},"date":"1507875747359"}"#,
    "9300.5"
)]
#[monoio::test]
async fn test_ticker_parsed_and_cached(
    #[case] name: &str,
    #[case] pair: Pair,
    #[case] route: &str,
    #[case] body: &str,
    #[case] last: &str,
) {
    let (exchange, mock) = venue(name, &pair, MockTransport::new().route(Method::Get, route, 200, body));

    let ticker = exchange.update_ticker(&pair, Asset::Spot).await.unwrap();
    assert_eq!(ticker.last.to_string_exact(), last, "{name}");
    assert_eq!(ticker.pair, pair);
    assert_eq!(ticker.asset, Some(Asset::Spot));

    let requests = mock.requests().len();
    let cached = exchange.fetch_ticker(&pair, Asset::Spot).await.unwrap();
    assert_eq!(cached.last, ticker.last);
    assert_eq!(mock.requests().len(), requests, "{name} refetched a cached ticker");
}

#[monoio::test]
async fn test_coinbasepro_ticker_merges_stats() {
    let pair = Pair::new("BTC", "USD");
    let (exchange, mock) = venue(
        "coinbasepro",
        &pair,
        MockTransport::new()
            .route(
                Method::Get,
                "/products/BTC-USD/ticker",
                200,
                r#"{"trade_id":4729088,"price":"333.99","size":"0.193","bid":"333.98","ask":"333.99","volume":"5957.11914015","time":"2015-11-14T20:46:03.511254Z"}"#,
            )
            .route(
                Method::Get,
                "/products/BTC-USD/stats",
                200,
                r#"{"open":"6745.61","high":"7292.11","low":"6650","volume":"26185.51","last":"333.99"}"#,
            ),
    );

    let ticker = exchange.update_ticker(&pair, Asset::Spot).await.unwrap();
    assert_eq!(ticker.last.to_string_exact(), "333.99");
    assert_eq!(ticker.high.to_string_exact(), "7292.11");
    assert_eq!(mock.requests().len(), 2);
}

// ============================================================================
// Fees
// ============================================================================

#[rstest]
#[case("bitfinex")]
#[case("btcmarkets")]
#[case("btse")]
#[case("coinbasepro")]
#[case("cryptocom")]
#[case("gemini")]
#[case("huobi")]
#[case("kraken")]
#[case("lbank")]
#[case("zb")]
#[monoio::test]
async fn test_offline_fee_is_positive_without_network(#[case] name: &str) {
    let pair = Pair::new("BTC", "USD");
    let (exchange, mock) = venue(name, &pair, MockTransport::new());

    let mut builder = FeeBuilder::trade(pair, false, Fixed::from_i64(10_000), Fixed::ONE);
    builder.fee_type = FeeType::OfflineTradeFee;

    let fee = exchange.fee_by_type(&builder).await.unwrap();
    assert!(fee.is_positive(), "{name}: {fee}");
    assert!(fee < builder.notional());
    assert!(mock.requests().is_empty());
}
