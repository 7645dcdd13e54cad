//! Print one live ticker from every supported venue
//!
//! Runs the public REST path only, so no credentials are needed:
//!
//! ```text
//! cargo run -p tradebridge-tests --example ticker_snapshot
//! ```

use tradebridge_core::prelude::*;
use tradebridge_exchanges::prelude::*;
use tracing::{error, info};

/// Pair each venue lists under its usual quote currency
fn sample_pair(name: &str) -> Pair {
    match name {
        "btcmarkets" => Pair::new("BTC", "AUD"),
        "cryptocom" | "huobi" | "lbank" | "zb" => Pair::new("BTC", "USDT"),
        _ => Pair::new("BTC", "USD"),
    }
}

#[monoio::main(enable_timer = true)]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_logging();

    info!("🚀 TradeBridge ticker snapshot");

    let mut ok = 0usize;
    for name in supported_exchanges() {
        let mut exchange = new_exchange(name)?;
        let pair = sample_pair(name);
        exchange.set_pairs(vec![pair.clone()], Asset::Spot, false)?;
        exchange.set_pairs(vec![pair.clone()], Asset::Spot, true)?;

        let timer = PerfTimer::start(&format!("{name}_ticker"));
        match exchange.update_ticker(&pair, Asset::Spot).await {
            Ok(ticker) => {
                ok += 1;
                info!(
                    "📈 {:<12} {:<9} last {} bid {} ask {} vol {}",
                    exchange.name(),
                    pair,
                    ticker.last,
                    ticker.bid,
                    ticker.ask,
                    ticker.volume
                );
            }
            Err(e) => error!("❌ {} {}: {}", exchange.name(), pair, e),
        }
        timer.log_elapsed();
    }

    info!("✅ {}/{} venues answered", ok, supported_exchanges().len());
    Ok(())
}
