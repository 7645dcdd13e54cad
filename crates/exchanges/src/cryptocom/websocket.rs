//! Crypto.com market and user websocket streams
//!
//! The market connection carries book, ticker and trade channels. The user
//! connection logs in with `public/auth` as its handshake, so a reconnect
//! re-authenticates before the stored subscriptions are replayed.
//!
//! Heartbeats are answered by each connection task. A reader task per
//! connection decodes every message, applies book and ticker pushes to the
//! market store and queues the event for [`CryptoCom::next_event`].

use flume::{Receiver, Sender, TrySendError, bounded};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tradebridge_core::prelude::*;
use url::Url;

use super::rest::{
    METHOD_AUTH, METHOD_HEARTBEAT, METHOD_RESPOND_HEARTBEAT, METHOD_SUBSCRIBE, METHOD_UNSUBSCRIBE,
    check_envelope, signed_request,
};
use super::types::{AccountBalance, BookData, BookUpdateData, ChannelPush, Envelope, OrderInfo, TickerData, TradeData as RawTrade};
use super::{CryptoCom, NAME, instrument_pair, order_detail};
use crate::asset::Asset;
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::order::{Detail, Side};
use crate::orderbook::{Orderbook, OrderbookUpdate};
use crate::request::decode_body;
use crate::store::MarketStore;
use crate::stream::{Handshake, Responder, StreamConnection, StreamHooks, StreamSettings};
use crate::types::{Balance, ConnectionStatus, Subscription, Ticker, TradeData};

pub const CHANNEL_BOOK: &str = "book";
pub const CHANNEL_BOOK_UPDATE: &str = "book.update";
pub const CHANNEL_TICKER: &str = "ticker";
pub const CHANNEL_TRADE: &str = "trade";
pub const CHANNEL_USER_ORDER: &str = "user.order";
pub const CHANNEL_USER_TRADE: &str = "user.trade";
pub const CHANNEL_USER_BALANCE: &str = "user.balance";

pub const BOOK_DEPTH: u32 = 150;

/// The venue drops messages sent within a second of connecting
const SETTLE_DELAY: Duration = Duration::from_secs(1);
/// Decoded events held for [`CryptoCom::next_event`] before new ones are dropped
pub const EVENT_BUFFER: usize = 4096;

/// Decoded websocket message
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Ticker(Ticker),
    Orderbook(Orderbook),
    Trades(Vec<TradeData>),
    Orders(Vec<Detail>),
    Balances(Vec<Balance>),
    /// Server heartbeat id; already answered by the connection task
    Heartbeat(i64),
    Subscribed(String),
    Authenticated,
    Unhandled(String),
}

/// Open market and user connections and the queue their readers fill
#[derive(Default)]
pub(crate) struct Streams {
    market: Option<Arc<StreamConnection>>,
    user: Option<Arc<StreamConnection>>,
    events: Option<(Sender<Result<StreamEvent>>, Receiver<Result<StreamEvent>>)>,
}

/// Turns raw messages into [`StreamEvent`]s, writing market data to the
/// shared store. Cheap to clone into reader tasks.
#[derive(Clone)]
pub struct StreamDecoder {
    store: Arc<MarketStore>,
    verbose: bool,
}

/// `public/respond-heartbeat` for a `public/heartbeat` message
pub fn heartbeat_reply(raw: &str) -> Option<String> {
    let envelope: Envelope = serde_json::from_str(raw).ok()?;
    (envelope.method == METHOD_HEARTBEAT)
        .then(|| json!({"id": envelope.id, "method": METHOD_RESPOND_HEARTBEAT}).to_string())
}

fn heartbeat_responder() -> Responder {
    Box::new(heartbeat_reply)
}

/// Decode every message from `connection` until it closes
async fn read_events(
    name: String,
    connection: Arc<StreamConnection>,
    decoder: StreamDecoder,
    events: Sender<Result<StreamEvent>>,
) {
    while let Ok(raw) = connection.next_message().await {
        let event = decoder.decode(&raw);
        if let Err(e) = &event {
            warn!("⚠️ {} {} message rejected: {}", NAME, name, e);
        }
        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("📋 {} {} event queue full, dropping", NAME, name),
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
    debug!("🔌 {} {} reader stopped", NAME, name);
}

fn poisoned<T>(_: T) -> ExchangeError {
    ExchangeError::WebsocketNotConnected(format!("{NAME} stream lock poisoned"))
}

fn is_user_channel(channel: &str) -> bool {
    channel.starts_with("user.")
}

impl CryptoCom {
    /// Venue channel name for a subscription, e.g. `book.BTC_USDT.150`
    pub fn channel_name(&self, subscription: &Subscription) -> Result<String> {
        let instrument = match &subscription.pair {
            Some(pair) => Some(self.base.format_exchange_currency(pair, subscription.asset)?),
            None => None,
        };
        Ok(match (subscription.channel.as_str(), instrument) {
            (CHANNEL_BOOK, Some(i)) => format!("{CHANNEL_BOOK}.{i}.{BOOK_DEPTH}"),
            (CHANNEL_USER_BALANCE, _) => CHANNEL_USER_BALANCE.to_string(),
            (channel, Some(i)) => format!("{channel}.{i}"),
            (channel, None) => channel.to_string(),
        })
    }

    fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            reconnect_delay: Duration::from_millis(self.base.websocket.reconnect_delay_ms),
            settle_delay: SETTLE_DELAY,
        }
    }

    fn auth_handshake(&self) -> Result<Handshake> {
        let creds = self.base.credentials();
        let key = creds.key.clone();
        let secret = creds.secret.clone();
        let ids = Nonce::new(NonceUnit::Millis);
        Ok(Box::new(move || {
            let request = signed_request(METHOD_AUTH, ids.next(), &key, secret.as_bytes(), json!({}), unix_millis())?;
            Ok(request.to_string())
        }))
    }

    /// Dial the market stream, plus the user stream when authenticated
    /// websocket access is configured. Needs a monoio runtime with timers.
    pub fn ws_connect(&self) -> Result<()> {
        if !self.base.features.enabled.websocket_api {
            return Err(ExchangeError::WebsocketNotEnabled(NAME.to_string()));
        }
        let mut streams = self.streams.lock().map_err(poisoned)?;
        let events = streams
            .events
            .get_or_insert_with(|| bounded(EVENT_BUFFER))
            .0
            .clone();
        if streams.market.is_none() {
            let url = Url::parse(&self.base.api_url(UrlKind::WebsocketSpot)?)?;
            info!("📡 {} connecting market stream {}", NAME, url);
            let hooks = StreamHooks {
                handshake: None,
                responder: Some(heartbeat_responder()),
            };
            streams.market = Some(self.start_connection("market", url, hooks, events.clone()));
        }
        if streams.user.is_none() && self.base.api.authenticated_websocket_support {
            match self.base.validate_credentials() {
                Ok(()) => {
                    let url = Url::parse(&self.base.api_url(UrlKind::WebsocketSpotSupplementary)?)?;
                    info!("📡 {} connecting user stream {}", NAME, url);
                    let hooks = StreamHooks {
                        handshake: Some(self.auth_handshake()?),
                        responder: Some(heartbeat_responder()),
                    };
                    streams.user = Some(self.start_connection("user", url, hooks, events));
                }
                Err(e) => warn!("⚠️ {} user stream skipped: {}", NAME, e),
            }
        }
        Ok(())
    }

    fn start_connection(
        &self,
        label: &str,
        url: Url,
        hooks: StreamHooks,
        events: Sender<Result<StreamEvent>>,
    ) -> Arc<StreamConnection> {
        let connection = Arc::new(StreamConnection::start(
            &format!("{NAME} {label}"),
            url,
            self.stream_settings(),
            hooks,
        ));
        monoio::spawn(read_events(label.to_string(), connection.clone(), self.decoder(), events));
        connection
    }

    /// Decoder sharing this adapter's market store
    pub fn decoder(&self) -> StreamDecoder {
        StreamDecoder {
            store: self.base.store.clone(),
            verbose: self.base.is_verbose(),
        }
    }

    pub fn ws_close(&self) -> Result<()> {
        let mut streams = self.streams.lock().map_err(poisoned)?;
        for stream in [streams.market.take(), streams.user.take()].into_iter().flatten() {
            stream.close()?;
        }
        streams.events = None;
        info!("🔌 {} websocket streams closed", NAME);
        Ok(())
    }

    pub fn ws_status(&self) -> ConnectionStatus {
        self.streams
            .lock()
            .ok()
            .and_then(|s| s.market.as_ref().map(|m| m.status()))
            .unwrap_or(ConnectionStatus::Disconnected)
    }

    fn connection_for(&self, channel: &str) -> Result<Arc<StreamConnection>> {
        let streams = self.streams.lock().map_err(poisoned)?;
        let connection = if is_user_channel(channel) {
            streams.user.clone()
        } else {
            streams.market.clone()
        };
        connection.ok_or_else(|| ExchangeError::WebsocketNotConnected(format!("{NAME} {channel}")))
    }

    fn channel_request(&self, method: &str, channel: &str) -> String {
        json!({
            "id": self.request_id.next(),
            "method": method,
            "params": {"channels": [channel]},
            "nonce": unix_millis(),
        })
        .to_string()
    }

    /// Book, ticker and trades for every enabled pair; order and balance
    /// updates when the user stream can log in
    pub fn generate_default_subscriptions(&self) -> Result<Vec<Subscription>> {
        let pairs = self.base.enabled_pairs(Asset::Spot)?;
        let mut channels = vec![CHANNEL_BOOK, CHANNEL_TICKER, CHANNEL_TRADE];
        let authenticated = self.base.api.authenticated_websocket_support && self.base.validate_credentials().is_ok();
        if authenticated {
            channels.push(CHANNEL_USER_ORDER);
        }
        let mut subscriptions: Vec<Subscription> = pairs
            .iter()
            .flat_map(|pair| {
                channels.iter().map(move |channel| Subscription {
                    channel: channel.to_string(),
                    pair: Some(pair.clone()),
                    asset: Asset::Spot,
                })
            })
            .collect();
        if authenticated {
            subscriptions.push(Subscription {
                channel: CHANNEL_USER_BALANCE.to_string(),
                pair: None,
                asset: Asset::Spot,
            });
        }
        Ok(subscriptions)
    }

    /// Send and persist each subscription so reconnects replay it
    pub fn subscribe(&self, subscriptions: &[Subscription]) -> Result<()> {
        for subscription in subscriptions {
            let name = self.channel_name(subscription)?;
            let connection = self.connection_for(&name)?;
            connection.persist(&name, self.channel_request(METHOD_SUBSCRIBE, &name))?;
            debug!("📋 {} subscribing {}", NAME, name);
        }
        self.base.add_subscriptions(subscriptions);
        Ok(())
    }

    pub fn unsubscribe(&self, subscriptions: &[Subscription]) -> Result<()> {
        for subscription in subscriptions {
            let name = self.channel_name(subscription)?;
            let connection = self.connection_for(&name)?;
            connection.forget(&name)?;
            connection.send(self.channel_request(METHOD_UNSUBSCRIBE, &name))?;
            debug!("📋 {} unsubscribing {}", NAME, name);
        }
        self.base.remove_subscriptions(subscriptions);
        Ok(())
    }

    /// Wait for the next decoded message from either stream. Market data
    /// has already been applied to the store when it is returned.
    pub async fn next_event(&self) -> Result<StreamEvent> {
        let events = {
            let streams = self.streams.lock().map_err(poisoned)?;
            match &streams.events {
                Some((_, rx)) if streams.market.is_some() || streams.user.is_some() => rx.clone(),
                _ => return Err(ExchangeError::WebsocketNotConnected(NAME.to_string())),
            }
        };
        events
            .recv_async()
            .await
            .map_err(|_| ExchangeError::WebsocketNotConnected(NAME.to_string()))?
    }

    /// Decode one raw message and apply market data to the store
    pub fn handle_message(&self, raw: &str) -> Result<StreamEvent> {
        self.decoder().decode(raw)
    }
}

impl StreamDecoder {
    /// Decode one raw message and apply market data to the store
    pub fn decode(&self, raw: &str) -> Result<StreamEvent> {
        if self.verbose {
            debug!("📡 {} ws <- {}", NAME, raw);
        }
        let envelope: Envelope = decode_body(NAME, raw)?;
        let method = envelope.method.clone();
        let id = envelope.id;
        let result = check_envelope(envelope)?;

        match method.as_str() {
            METHOD_HEARTBEAT => Ok(StreamEvent::Heartbeat(id)),
            METHOD_AUTH => {
                info!("✅ {} user stream authenticated", NAME);
                Ok(StreamEvent::Authenticated)
            }
            METHOD_SUBSCRIBE if result.is_null() => Ok(StreamEvent::Subscribed(String::new())),
            METHOD_SUBSCRIBE => {
                let push: ChannelPush = serde_json::from_value(result)?;
                self.handle_push(push)
            }
            METHOD_UNSUBSCRIBE => Ok(StreamEvent::Unhandled(raw.to_string())),
            _ => {
                warn!("⚠️ {} unhandled websocket method {}", NAME, method);
                Ok(StreamEvent::Unhandled(raw.to_string()))
            }
        }
    }

    fn handle_push(&self, push: ChannelPush) -> Result<StreamEvent> {
        match push.channel.as_str() {
            CHANNEL_BOOK => {
                let pair = instrument_pair(&push.instrument_name)?;
                let rows: Vec<BookData> = serde_json::from_value(push.data)?;
                let snapshot = rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME} empty book push")))?;
                let mut book = Orderbook::new(NAME, pair.clone(), Asset::Spot);
                book.bids = BookData::levels(&snapshot.bids)?;
                book.asks = BookData::levels(&snapshot.asks)?;
                book.update_id = snapshot.update_id;
                book.last_updated = Timestamp::from_millis(snapshot.timestamp);
                self.store.process_orderbook(book)?;
                Ok(StreamEvent::Orderbook(self.store.get_orderbook(&pair, Asset::Spot)?))
            }
            CHANNEL_BOOK_UPDATE => {
                let pair = instrument_pair(&push.instrument_name)?;
                let rows: Vec<BookUpdateData> = serde_json::from_value(push.data)?;
                let mut latest = None;
                for row in rows {
                    let update = OrderbookUpdate {
                        bids: BookData::levels(&row.update.bids)?,
                        asks: BookData::levels(&row.update.asks)?,
                        update_id: row.update_id,
                        update_time: Timestamp::from_millis(row.timestamp),
                    };
                    latest = Some(self.store.update_orderbook(&pair, Asset::Spot, &update)?);
                }
                latest
                    .map(StreamEvent::Orderbook)
                    .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME} empty book update")))
            }
            CHANNEL_TICKER => {
                let rows: Vec<TickerData> = serde_json::from_value(push.data)?;
                let mut latest = None;
                for row in rows {
                    let ticker = ticker_from(&row)?;
                    self.store.process_ticker(ticker.clone(), Asset::Spot)?;
                    latest = Some(ticker);
                }
                latest
                    .map(StreamEvent::Ticker)
                    .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME} empty ticker push")))
            }
            CHANNEL_TRADE => {
                let rows: Vec<RawTrade> = serde_json::from_value(push.data)?;
                let fallback = push.instrument_name;
                let trades = rows
                    .into_iter()
                    .map(|t| {
                        let instrument = if t.instrument_name.is_empty() { &fallback } else { &t.instrument_name };
                        Ok(TradeData {
                            tid: t.trade_id.clone(),
                            exchange: NAME.to_string(),
                            pair: instrument_pair(instrument)?,
                            asset: Asset::Spot,
                            side: Side::parse(&t.side),
                            price: t.price,
                            amount: t.quantity,
                            timestamp: Timestamp::from_millis(t.timestamp),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(StreamEvent::Trades(trades))
            }
            CHANNEL_USER_ORDER => {
                let rows: Vec<OrderInfo> = serde_json::from_value(push.data)?;
                let orders = rows
                    .iter()
                    .map(|o| order_detail(o, Asset::Spot))
                    .collect::<Result<Vec<_>>>()?;
                Ok(StreamEvent::Orders(orders))
            }
            CHANNEL_USER_BALANCE => {
                let rows: Vec<AccountBalance> = serde_json::from_value(push.data)?;
                Ok(StreamEvent::Balances(
                    rows.iter()
                        .map(|b| Balance::from_total_and_hold(&b.currency, b.balance, b.balance - b.available))
                        .collect(),
                ))
            }
            other => {
                debug!("📋 {} ignoring channel {} ({})", NAME, other, push.subscription);
                Ok(StreamEvent::Unhandled(push.subscription))
            }
        }
    }
}

pub(crate) fn ticker_from(row: &TickerData) -> Result<Ticker> {
    Ok(Ticker {
        exchange: NAME.to_string(),
        pair: instrument_pair(&row.instrument_name)?,
        asset: Some(Asset::Spot),
        last: row.last,
        high: row.high,
        low: row.low,
        bid: row.bid,
        ask: row.ask,
        volume: row.volume,
        last_updated: if row.timestamp > 0 { Timestamp::from_millis(row.timestamp) } else { Timestamp::now() },
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Pair;
    use crate::order::Status;
    use crate::stream::tests::{ScriptedSocket, run_session};

    fn exchange() -> CryptoCom {
        let mut exchange = CryptoCom::new().unwrap();
        exchange
            .base
            .set_pairs(vec![Pair::new("BTC", "USDT")], Asset::Spot, false)
            .unwrap();
        exchange
            .base
            .set_pairs(vec![Pair::new("BTC", "USDT")], Asset::Spot, true)
            .unwrap();
        exchange
    }

    #[test]
    fn test_channel_names() {
        let exchange = exchange();
        let sub = |channel: &str, pair: Option<Pair>| Subscription {
            channel: channel.to_string(),
            pair,
            asset: Asset::Spot,
        };
        let btc = Some(Pair::new("BTC", "USDT"));
        assert_eq!(exchange.channel_name(&sub(CHANNEL_BOOK, btc.clone())).unwrap(), "book.BTC_USDT.150");
        assert_eq!(exchange.channel_name(&sub(CHANNEL_TICKER, btc.clone())).unwrap(), "ticker.BTC_USDT");
        assert_eq!(exchange.channel_name(&sub(CHANNEL_USER_ORDER, btc)).unwrap(), "user.order.BTC_USDT");
        assert_eq!(exchange.channel_name(&sub(CHANNEL_USER_BALANCE, None)).unwrap(), "user.balance");
    }

    #[test]
    fn test_default_subscriptions_without_auth() {
        let subs = exchange().generate_default_subscriptions().unwrap();
        assert_eq!(subs.len(), 3);
        assert!(subs.iter().all(|s| !is_user_channel(&s.channel)));
    }

    #[test]
    fn test_heartbeat_and_auth() {
        let exchange = exchange();
        assert_eq!(
            exchange
                .handle_message(r#"{"id":1587523073344,"method":"public/heartbeat","code":0}"#)
                .unwrap(),
            StreamEvent::Heartbeat(1587523073344)
        );
        assert_eq!(
            exchange.handle_message(r#"{"id":1,"method":"public/auth","code":0}"#).unwrap(),
            StreamEvent::Authenticated
        );
        let err = exchange
            .handle_message(r#"{"id":1,"method":"public/auth","code":10002,"message":"UNAUTHORIZED"}"#)
            .unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, 10002, "UNAUTHORIZED"));
    }

    #[test]
    fn test_heartbeat_reply() {
        let reply = heartbeat_reply(r#"{"id":1587523073344,"method":"public/heartbeat","code":0}"#).unwrap();
        let reply: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply["id"], 1587523073344_i64);
        assert_eq!(reply["method"], METHOD_RESPOND_HEARTBEAT);

        assert!(heartbeat_reply(r#"{"id":1,"method":"public/auth","code":0}"#).is_none());
        assert!(heartbeat_reply("not json").is_none());
    }

    #[monoio::test]
    async fn test_heartbeat_answered_without_next_event() {
        let heartbeat = r#"{"id":1587523073344,"method":"public/heartbeat","code":0}"#;
        let mut socket = ScriptedSocket::with_text(&[heartbeat]);
        let hooks = StreamHooks {
            handshake: None,
            responder: Some(heartbeat_responder()),
        };

        let (_, messages) = run_session(&mut socket, hooks).await;

        assert_eq!(socket.sent.len(), 1);
        assert!(socket.sent[0].contains(METHOD_RESPOND_HEARTBEAT));
        assert!(socket.sent[0].contains("1587523073344"));
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_decoder_shares_adapter_store() {
        let exchange = exchange();
        let decoder = exchange.decoder();
        let raw = r#"{"method":"subscribe","result":{"instrument_name":"BTC_USDT","subscription":"ticker.BTC_USDT","channel":"ticker","data":[{"i":"BTC_USDT","b":50000.1,"k":50001.2,"a":50000.5,"t":1654780033786,"v":1234.5,"h":51000,"l":49000,"c":0.02}]}}"#;
        assert!(matches!(decoder.decode(raw).unwrap(), StreamEvent::Ticker(_)));

        let stored = exchange.base.store.get_ticker(&Pair::new("BTC", "USDT"), Asset::Spot).unwrap();
        assert_eq!(stored.last.to_string_exact(), "50000.5");
    }

    #[monoio::test]
    async fn test_next_event_requires_connection() {
        assert!(matches!(
            exchange().next_event().await,
            Err(ExchangeError::WebsocketNotConnected(_))
        ));
    }

    #[test]
    fn test_book_snapshot_then_delta() {
        let exchange = exchange();
        let snapshot = r#"{"method":"subscribe","result":{"instrument_name":"BTC_USDT","subscription":"book.BTC_USDT.150","channel":"book","depth":150,"data":[{"bids":[["50000","1",1],["49990","2",3]],"asks":[["50010","0.5",1],["50020","1",2]],"t":1654780033786,"u":100}]}}"#;
        match exchange.handle_message(snapshot).unwrap() {
            StreamEvent::Orderbook(book) => {
                assert_eq!(book.bids.len(), 2);
                assert_eq!(book.asks[0].price.to_string_exact(), "50010");
            }
            other => panic!("unexpected {other:?}"),
        }

        let delta = r#"{"method":"subscribe","result":{"instrument_name":"BTC_USDT","subscription":"book.BTC_USDT.150","channel":"book.update","data":[{"update":{"bids":[["49995","3",1],["50000","0",0]],"asks":[]},"t":1654780033800,"u":101}]}}"#;
        match exchange.handle_message(delta).unwrap() {
            StreamEvent::Orderbook(book) => {
                assert_eq!(book.bids[0].price.to_string_exact(), "49995");
                assert_eq!(book.bids.len(), 2);
                assert_eq!(book.update_id, 101);
            }
            other => panic!("unexpected {other:?}"),
        }
        let stored = exchange
            .base
            .store
            .get_orderbook(&Pair::new("BTC", "USDT"), Asset::Spot)
            .unwrap();
        assert_eq!(stored.best_bid().map(|p| p.to_string_exact()), Some("49995".to_string()));
    }

    #[test]
    fn test_ticker_push_stored() {
        let exchange = exchange();
        let raw = r#"{"method":"subscribe","result":{"instrument_name":"BTC_USDT","subscription":"ticker.BTC_USDT","channel":"ticker","data":[{"i":"BTC_USDT","b":50000.1,"k":50001.2,"a":50000.5,"t":1654780033786,"v":1234.5,"h":51000,"l":49000,"c":0.02}]}}"#;
        let StreamEvent::Ticker(ticker) = exchange.handle_message(raw).unwrap() else {
            panic!("expected ticker");
        };
        assert_eq!(ticker.ask.to_string_exact(), "50001.2");
        let stored = exchange.base.store.get_ticker(&Pair::new("BTC", "USDT"), Asset::Spot).unwrap();
        assert_eq!(stored.last, ticker.last);
    }

    #[test]
    fn test_user_order_push() {
        let exchange = exchange();
        let raw = r#"{"method":"subscribe","result":{"instrument_name":"BTC_USDT","subscription":"user.order.BTC_USDT","channel":"user.order","data":[{"status":"ACTIVE","side":"SELL","price":51000,"quantity":0.5,"order_id":"2015106383706015873","client_oid":"my-1","create_time":1588758017375,"update_time":1588758017411,"type":"LIMIT","instrument_name":"BTC_USDT","cumulative_quantity":0.1,"cumulative_value":5100,"avg_price":51000,"fee_currency":"USDT","time_in_force":"GOOD_TILL_CANCEL"}]}}"#;
        let StreamEvent::Orders(orders) = exchange.handle_message(raw).unwrap() else {
            panic!("expected orders");
        };
        assert_eq!(orders[0].status, Status::PartiallyFilled);
        assert_eq!(orders[0].remaining_amount.to_string_exact(), "0.4");
    }

    #[test]
    fn test_unknown_channel_is_unhandled() {
        let exchange = exchange();
        let raw = r#"{"method":"subscribe","result":{"subscription":"candlestick.1m.BTC_USDT","channel":"candlestick","data":[]}}"#;
        assert_eq!(
            exchange.handle_message(raw).unwrap(),
            StreamEvent::Unhandled("candlestick.1m.BTC_USDT".to_string())
        );
    }

    #[test]
    fn test_connect_requires_websocket_toggle() {
        let mut exchange = exchange();
        exchange.base.features.enabled.websocket_api = false;
        assert!(matches!(exchange.ws_connect(), Err(ExchangeError::WebsocketNotEnabled(_))));
    }
}
