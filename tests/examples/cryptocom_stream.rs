//! Stream Crypto.com market data for a handful of pairs
//!
//! Subscribes to book, ticker and trade channels, prints what arrives and
//! closes after a fixed number of events. With `CRYPTOCOM_API_KEY` and
//! `CRYPTOCOM_API_SECRET` set, the user stream logs in as well.

use tradebridge_core::prelude::*;
use tradebridge_exchanges::cryptocom::websocket::StreamEvent;
use tradebridge_exchanges::cryptocom::CryptoCom;
use tradebridge_exchanges::prelude::*;
use tracing::{info, warn};

const EVENT_LIMIT: usize = 50;

#[monoio::main(enable_timer = true)]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_logging();

    info!("🚀 TradeBridge Crypto.com stream");

    let mut exchange = CryptoCom::new()?;
    match ExchangeConfig::new("CryptoCom").with_env_credentials() {
        Ok(mut config) => {
            info!("🔑 API credentials loaded, user channels enabled");
            config.api.authenticated_websocket_api_support = true;
            exchange.setup(&config)?;
        }
        Err(_) => info!("🌐 No API credentials, public channels only"),
    }

    let pairs = vec![Pair::new("BTC", "USDT"), Pair::new("ETH", "USDT")];
    exchange.set_pairs(pairs.clone(), Asset::Spot, false)?;
    exchange.set_pairs(pairs, Asset::Spot, true)?;

    exchange.ws_connect()?;
    let subscriptions = exchange.generate_default_subscriptions()?;
    info!("📋 Subscribing to {} channels", subscriptions.len());
    exchange.subscribe(&subscriptions)?;

    let mut seen = 0usize;
    while seen < EVENT_LIMIT {
        match exchange.next_event().await? {
            StreamEvent::Ticker(ticker) => {
                seen += 1;
                info!("📈 {} last {} bid {} ask {}", ticker.pair, ticker.last, ticker.bid, ticker.ask);
            }
            StreamEvent::Orderbook(book) => {
                seen += 1;
                info!(
                    "📘 {} {} bids / {} asks, spread {:?}",
                    book.pair,
                    book.bids.len(),
                    book.asks.len(),
                    book.spread()
                );
            }
            StreamEvent::Trades(trades) => {
                seen += 1;
                for trade in trades {
                    info!("💱 {} {:?} {} @ {}", trade.pair, trade.side, trade.amount, trade.price);
                }
            }
            StreamEvent::Orders(orders) => {
                seen += 1;
                for order in orders {
                    info!("📝 order {} {:?} {}", order.id, order.status, order.pair);
                }
            }
            StreamEvent::Balances(balances) => {
                seen += 1;
                for balance in balances {
                    info!("💰 {} free {} hold {}", balance.currency, balance.free, balance.hold);
                }
            }
            StreamEvent::Subscribed(channel) => info!("✅ subscribed {}", channel),
            StreamEvent::Authenticated => info!("🔐 user stream authenticated"),
            StreamEvent::Heartbeat(_) => {}
            StreamEvent::Unhandled(raw) => warn!("⚠️ unhandled message {}", raw),
        }
    }

    exchange.unsubscribe(&subscriptions)?;
    exchange.ws_close()?;
    info!("✅ Received {} market events", seen);
    Ok(())
}
