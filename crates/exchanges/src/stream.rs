//! Managed websocket connection with fixed-delay reconnect
//!
//! One spawned task owns the socket, so it is the only reader and every
//! write goes through its command channel. The task waits on socket
//! readiness or the next command, never on a read that could be dropped
//! half way. Messages that need an immediate answer (heartbeats) are
//! answered by the task itself through the [`Responder`] hook. When the
//! read side fails the task sleeps `reconnect_delay`, dials again, re-runs
//! the handshake builder (fresh auth) and replays persisted messages
//! (subscriptions).

use async_trait::async_trait;
use flume::{Receiver, RecvError, Sender, TrySendError, bounded, unbounded};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::{ExchangeError, Result};
use crate::types::ConnectionStatus;
use crate::websocket::{Message, MonoioWebSocket};

/// Raw messages held for the consumer before new ones are dropped
pub const MESSAGE_BUFFER: usize = 1024;

/// Builds the first message after every (re)connect, e.g. a signed login
pub type Handshake = Box<dyn Fn() -> Result<String>>;

/// Inspects each text message inside the connection task and returns a
/// reply to write straight back, e.g. a heartbeat answer
pub type Responder = Box<dyn Fn(&str) -> Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub reconnect_delay: Duration,
    /// Pause between connecting and the first write
    pub settle_delay: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            settle_delay: Duration::ZERO,
        }
    }
}

/// Per-connection callbacks run by the connection task
#[derive(Default)]
pub struct StreamHooks {
    pub handshake: Option<Handshake>,
    pub responder: Option<Responder>,
}

#[derive(Debug)]
pub(crate) enum StreamCommand {
    Send(String),
    /// Send now and again after every reconnect
    Persist { key: String, payload: String },
    Forget(String),
    Close,
}

/// The socket operations the connection task drives
#[async_trait(?Send)]
pub(crate) trait StreamSocket {
    /// Next message from bytes already read, without waiting on the socket
    async fn try_receive(&mut self) -> Result<Option<Message>>;
    /// Wait for readability; dropping the wait loses nothing
    async fn readable(&self) -> Result<()>;
    /// One read into the socket's buffer
    async fn read_available(&mut self) -> Result<()>;
    async fn send_text(&mut self, text: String) -> Result<()>;
    async fn close(&mut self, code: u16, reason: &str) -> Result<()>;
}

#[async_trait(?Send)]
impl StreamSocket for MonoioWebSocket {
    async fn try_receive(&mut self) -> Result<Option<Message>> {
        MonoioWebSocket::try_receive(self).await
    }

    async fn readable(&self) -> Result<()> {
        MonoioWebSocket::readable(self).await
    }

    async fn read_available(&mut self) -> Result<()> {
        MonoioWebSocket::read_available(self).await
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        MonoioWebSocket::send_text(self, text).await
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        MonoioWebSocket::close(self, code, reason).await
    }
}

pub struct StreamConnection {
    name: String,
    command_tx: Sender<StreamCommand>,
    message_rx: Receiver<String>,
    status: Arc<Mutex<ConnectionStatus>>,
}

fn set_status(status: &Mutex<ConnectionStatus>, value: ConnectionStatus) {
    if let Ok(mut guard) = status.lock() {
        *guard = value;
    }
}

/// Why the inner read loop stopped
#[derive(Debug, PartialEq)]
pub(crate) enum Exit {
    Closed,
    Dropped(String),
}

/// What woke the idle connection task
enum Wake {
    Command(std::result::Result<StreamCommand, RecvError>),
    Readable(Result<()>),
}

impl StreamConnection {
    /// Spawn the connection task. Must be called inside a monoio runtime
    /// with the timer enabled.
    pub fn start(name: &str, url: Url, settings: StreamSettings, hooks: StreamHooks) -> Self {
        let (command_tx, command_rx) = unbounded();
        let (message_tx, message_rx) = bounded(MESSAGE_BUFFER);
        let status = Arc::new(Mutex::new(ConnectionStatus::Connecting));

        let task_name = name.to_string();
        let task_status = status.clone();
        monoio::spawn(async move {
            run(task_name, url, settings, hooks, command_rx, message_tx, task_status).await;
        });

        Self {
            name: name.to_string(),
            command_tx,
            message_rx,
            status,
        }
    }

    fn command(&self, command: StreamCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| ExchangeError::WebsocketNotConnected(format!("{} stream task stopped", self.name)))
    }

    pub fn send(&self, payload: String) -> Result<()> {
        self.command(StreamCommand::Send(payload))
    }

    pub fn persist(&self, key: &str, payload: String) -> Result<()> {
        self.command(StreamCommand::Persist {
            key: key.to_string(),
            payload,
        })
    }

    pub fn forget(&self, key: &str) -> Result<()> {
        self.command(StreamCommand::Forget(key.to_string()))
    }

    pub fn close(&self) -> Result<()> {
        self.command(StreamCommand::Close)
    }

    /// Wait for the next text message
    pub async fn next_message(&self) -> Result<String> {
        self.message_rx
            .recv_async()
            .await
            .map_err(|_| ExchangeError::WebsocketNotConnected(format!("{} stream closed", self.name)))
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
            .lock()
            .map(|s| *s)
            .unwrap_or(ConnectionStatus::Error)
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        let _ = self.command_tx.send(StreamCommand::Close);
    }
}

async fn run(
    name: String,
    url: Url,
    settings: StreamSettings,
    hooks: StreamHooks,
    commands: Receiver<StreamCommand>,
    messages: Sender<String>,
    status: Arc<Mutex<ConnectionStatus>>,
) {
    let mut replay: BTreeMap<String, String> = BTreeMap::new();

    loop {
        set_status(&status, ConnectionStatus::Connecting);
        let exit = match MonoioWebSocket::connect(&url).await {
            Ok(mut ws) => {
                set_status(&status, ConnectionStatus::Connected);
                info!("✅ {} stream connected", name);
                session(&name, &mut ws, &settings, &hooks, &commands, &messages, &mut replay).await
            }
            Err(e) => Exit::Dropped(e.to_string()),
        };

        match exit {
            Exit::Closed => break,
            Exit::Dropped(reason) => {
                warn!(
                    "🔄 {} stream lost ({}), reconnecting in {:?}",
                    name, reason, settings.reconnect_delay
                );
                set_status(&status, ConnectionStatus::Reconnecting);
                monoio::time::sleep(settings.reconnect_delay).await;
                if drain_offline(&name, &commands, &mut replay) {
                    break;
                }
            }
        }
    }

    set_status(&status, ConnectionStatus::Disconnected);
    info!("🔌 {} stream stopped", name);
}

/// Apply commands queued while disconnected. Returns true on close.
fn drain_offline(name: &str, commands: &Receiver<StreamCommand>, replay: &mut BTreeMap<String, String>) -> bool {
    while let Ok(command) = commands.try_recv() {
        match command {
            StreamCommand::Send(payload) => {
                warn!("⚠️ {} dropping message while disconnected: {}", name, payload);
            }
            StreamCommand::Persist { key, payload } => {
                replay.insert(key, payload);
            }
            StreamCommand::Forget(key) => {
                replay.remove(&key);
            }
            StreamCommand::Close => return true,
        }
    }
    // Every handle is gone
    commands.is_disconnected()
}

/// Write one command. Returns `Some` when the session should end.
async fn apply<S: StreamSocket>(ws: &mut S, command: StreamCommand, replay: &mut BTreeMap<String, String>) -> Option<Exit> {
    let sent = match command {
        StreamCommand::Send(payload) => ws.send_text(payload).await,
        StreamCommand::Persist { key, payload } => {
            replay.insert(key, payload.clone());
            ws.send_text(payload).await
        }
        StreamCommand::Forget(key) => {
            replay.remove(&key);
            Ok(())
        }
        StreamCommand::Close => {
            let _ = ws.close(1000, "client closing").await;
            return Some(Exit::Closed);
        }
    };
    sent.err().map(|e| Exit::Dropped(e.to_string()))
}

/// Answer and forward one message. Returns `Some` when the session should end.
async fn deliver<S: StreamSocket>(
    name: &str,
    ws: &mut S,
    message: Message,
    responder: Option<&Responder>,
    messages: &Sender<String>,
) -> Option<Exit> {
    match message {
        Message::Text(text) => {
            if let Some(reply) = responder.and_then(|respond| respond(&text)) {
                debug!("💓 {} answering {}", name, text);
                if let Err(e) = ws.send_text(reply).await {
                    return Some(Exit::Dropped(e.to_string()));
                }
            }
            match messages.try_send(text) {
                Ok(()) => None,
                Err(TrySendError::Full(text)) => {
                    warn!("⚠️ {} consumer behind, dropping {}", name, text);
                    None
                }
                Err(TrySendError::Disconnected(_)) => {
                    let _ = ws.close(1000, "receiver dropped").await;
                    Some(Exit::Closed)
                }
            }
        }
        Message::Binary(data) => {
            debug!("{} ignoring {} byte binary message", name, data.len());
            None
        }
        Message::Close(code) => Some(Exit::Dropped(format!("server closed with {code:?}"))),
    }
}

pub(crate) async fn session<S: StreamSocket>(
    name: &str,
    ws: &mut S,
    settings: &StreamSettings,
    hooks: &StreamHooks,
    commands: &Receiver<StreamCommand>,
    messages: &Sender<String>,
    replay: &mut BTreeMap<String, String>,
) -> Exit {
    if !settings.settle_delay.is_zero() {
        monoio::time::sleep(settings.settle_delay).await;
    }

    if let Some(build) = &hooks.handshake {
        let first = match build() {
            Ok(payload) => payload,
            Err(e) => {
                error!("❌ {} handshake message failed: {}", name, e);
                return Exit::Closed;
            }
        };
        if let Err(e) = ws.send_text(first).await {
            return Exit::Dropped(e.to_string());
        }
    }
    for payload in replay.values() {
        if let Err(e) = ws.send_text(payload.clone()).await {
            return Exit::Dropped(e.to_string());
        }
    }
    if !replay.is_empty() {
        debug!("📊 {} replayed {} subscriptions", name, replay.len());
    }

    loop {
        loop {
            match ws.try_receive().await {
                Ok(Some(message)) => {
                    if let Some(exit) = deliver(name, ws, message, hooks.responder.as_ref(), messages).await {
                        return exit;
                    }
                }
                Ok(None) => break,
                Err(e) => return Exit::Dropped(e.to_string()),
            }
        }

        let wake = monoio::select! {
            command = commands.recv_async() => Wake::Command(command),
            ready = ws.readable() => Wake::Readable(ready),
        };
        match wake {
            Wake::Command(Ok(command)) => {
                if let Some(exit) = apply(ws, command, replay).await {
                    return exit;
                }
            }
            Wake::Command(Err(_)) => {
                let _ = ws.close(1000, "client dropped").await;
                return Exit::Closed;
            }
            Wake::Readable(Ok(())) => {
                if let Err(e) = ws.read_available().await {
                    return Exit::Dropped(e.to_string());
                }
            }
            Wake::Readable(Err(e)) => return Exit::Dropped(e.to_string()),
        }
    }
}
