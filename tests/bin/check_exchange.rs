//! Check connectivity and credentials for one venue
//!
//! ```text
//! cargo run -p tradebridge-tests --bin check_exchange -- kraken BTC-USD
//! cargo run -p tradebridge-tests --bin check_exchange -- --config exchanges.json lbank btc_usdt
//! ```
//!
//! Public market data is always fetched. When `<NAME>_API_KEY` and
//! `<NAME>_API_SECRET` are set (or the config file carries credentials) the
//! account balances and open orders are read too. Nothing is traded.

use anyhow::{bail, Context};
use std::env;
use tradebridge_core::prelude::*;
use tradebridge_exchanges::prelude::*;
use tradebridge_exchanges::registry;
use tracing::{info, warn};

struct Args {
    config: Option<String>,
    exchange: String,
    pair: Pair,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut config = None;
    let mut positional = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = Some(args.next().context("--config needs a path")?);
        } else {
            positional.push(arg);
        }
    }

    let Some(exchange) = positional.first().cloned() else {
        bail!(
            "usage: check_exchange [--config FILE] <exchange> [pair]\nexchanges: {}",
            supported_exchanges().join(", ")
        );
    };
    let pair = match positional.get(1) {
        Some(symbol) => Pair::from_symbol(symbol)?,
        None => Pair::new("BTC", "USDT"),
    };
    Ok(Args { config, exchange, pair })
}

fn exchange_config(args: &Args) -> anyhow::Result<ExchangeConfig> {
    if let Some(path) = &args.config {
        let config = Config::load(path)?;
        return Ok(config.get_exchange_config(&args.exchange)?.clone());
    }
    let name = registry::new_exchange(&args.exchange)?.name().to_string();
    match ExchangeConfig::new(&name).with_env_credentials() {
        Ok(config) => Ok(config),
        Err(e) => {
            info!("🌐 {}: public endpoints only", e);
            Ok(ExchangeConfig::new(&name))
        }
    }
}

#[monoio::main(enable_timer = true)]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let args = parse_args()?;
    let mut exchange = registry::from_config(&exchange_config(&args)?)?;
    let pair = args.pair.clone();

    info!("🔗 Checking {} with {}", exchange.name(), pair);

    let timer = PerfTimer::start("tradable_pairs");
    match exchange.update_tradable_pairs(false).await {
        Ok(()) => info!("📋 {} available pairs", exchange.available_pairs(Asset::Spot)?.len()),
        Err(e) => warn!("⚠️ pair listing failed: {}", e),
    }
    timer.log_elapsed();

    let mut available = exchange.available_pairs(Asset::Spot)?;
    if !available.contains(&pair) {
        warn!("⚠️ {} not listed, checking anyway", pair);
        available.push(pair.clone());
        exchange.set_pairs(available, Asset::Spot, false)?;
    }
    exchange.set_pairs(vec![pair.clone()], Asset::Spot, true)?;

    let timer = PerfTimer::start("ticker");
    let ticker = exchange.update_ticker(&pair, Asset::Spot).await?;
    timer.log_elapsed();
    info!("📈 last {} bid {} ask {} volume {}", ticker.last, ticker.bid, ticker.ask, ticker.volume);

    let timer = PerfTimer::start("orderbook");
    let book = exchange.update_orderbook(&pair, Asset::Spot).await?;
    timer.log_elapsed();
    match book.verify() {
        Ok(()) => info!(
            "📘 {} bids / {} asks, spread {:?}",
            book.bids.len(),
            book.asks.len(),
            book.spread()
        ),
        Err(e) => warn!("⚠️ book failed verification: {}", e),
    }

    if !exchange.base().allow_authenticated_request() {
        info!("✅ Public checks finished");
        return Ok(());
    }

    info!("🔐 Checking authenticated endpoints...");
    let holdings = exchange.update_account_info(Asset::Spot).await?;
    for account in &holdings.accounts {
        for balance in account.currencies.iter().filter(|b| !b.total.is_zero()) {
            info!("💰 {} total {} hold {}", balance.currency, balance.total, balance.hold);
        }
    }

    let request = GetOrdersRequest::new(Asset::Spot, vec![pair]);
    let orders = exchange.active_orders(&request).await?;
    info!("📝 {} open orders", orders.len());

    info!("✅ Authenticated checks finished");
    Ok(())
}
