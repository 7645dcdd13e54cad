//! Request signing and book merge throughput
//!
//! Signing runs on every private call, so the per-venue schemes are worth
//! watching: `cargo bench -p tradebridge-tests --bench signing_benchmark`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use tradebridge_core::prelude::*;
use tradebridge_exchanges::http::Method;
use tradebridge_exchanges::orderbook::OrderbookUpdate;
use tradebridge_exchanges::prelude::*;
use tradebridge_exchanges::{cryptocom, huobi, kraken, lbank, zb};

const SECRET: &[u8] = b"kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";

fn lbank_params() -> Vec<(String, String)> {
    [
        ("amount", "0.5"),
        ("api_key", "c821db84-6fbd-11e4-a9e3-c86000d26d7c"),
        ("echostr", "P3LHfw6tUIYWc8R2VQNy0ilKmdg5pjhbxC7"),
        ("price", "0.0231"),
        ("signature_method", "HmacSHA256"),
        ("symbol", "eth_btc"),
        ("timestamp", "1567062637102"),
        ("type", "sell"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn bench_signing(c: &mut Criterion) {
    let mut group = c.benchmark_group("signing");

    group.bench_function("kraken", |b| {
        b.iter(|| {
            kraken::rest::sign(
                black_box(SECRET),
                black_box("/0/private/AddOrder"),
                black_box("1616492376594"),
                black_box("nonce=1616492376594&ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25"),
            )
        })
    });

    group.bench_function("huobi", |b| {
        b.iter(|| {
            huobi::rest::sign(
                black_box(SECRET),
                Method::Get,
                black_box("api.huobi.pro"),
                black_box("/v1/order/orders"),
                black_box("AccessKeyId=e2xxxxxx-99xxxxxx-84xxxxxx-7xxxx&SignatureMethod=HmacSHA256&SignatureVersion=2&Timestamp=2017-05-11T15%3A19%3A30&order-id=1234567890"),
            )
        })
    });

    let params = lbank_params();
    group.bench_function("lbank", |b| b.iter(|| lbank::rest::sign(black_box(SECRET), black_box(&params))));

    group.bench_function("zb", |b| {
        b.iter(|| {
            zb::rest::sign(
                black_box(SECRET),
                black_box("accesskey=key&amount=0.01&currency=btc_usdt&method=order&price=9300&tradeType=1"),
            )
        })
    });

    let order = json!({"instrument_name": "BTC_USDT", "side": "BUY", "type": "LIMIT", "price": "51000", "quantity": "0.01"});
    group.bench_function("cryptocom", |b| {
        b.iter(|| {
            cryptocom::rest::sign(
                black_box(SECRET),
                "private/create-order",
                black_box(11),
                "api-key",
                black_box(&order),
                1_587_846_358_253,
            )
        })
    });

    group.finish();
}

fn bench_orderbook(c: &mut Criterion) {
    let level = |price: i64, amount: i64| Level::new(Fixed::from_i64(price), Fixed::from_i64(amount));
    let mut seed = Orderbook::new("CryptoCom", Pair::new("BTC", "USDT"), Asset::Spot);
    seed.bids = (0..150).map(|i| level(50_000 - i, 1)).collect();
    seed.asks = (0..150).map(|i| level(50_001 + i, 1)).collect();

    c.bench_function("orderbook_apply_update", |b| {
        b.iter_batched(
            || seed.clone(),
            |mut book| {
                let update = OrderbookUpdate {
                    bids: vec![level(49_990, 0), level(49_995, 3)],
                    asks: vec![level(50_010, 0), level(50_000 + 160, 2)],
                    update_id: 2,
                    ..Default::default()
                };
                book.apply_update(black_box(&update))
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_signing, bench_orderbook);
criterion_main!(benches);
