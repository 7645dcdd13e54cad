//! Monoio-native WebSocket client
//!
//! RFC 6455 client over the shared rustls stream: opening handshake,
//! masked outbound frames, incremental inbound decoding with fragment
//! reassembly. Ping frames are answered inline while reading.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use tradebridge_core::{PerfTimer, generate_alphanumeric, nanos};
use url::Url;

use crate::errors::{ExchangeError, Result};
use crate::http::{TlsStream, connect_tls, tls_client_config};

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const MAX_HANDSHAKE_BYTES: usize = 16 * 1024;
/// Frames larger than this are treated as a protocol violation
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xa,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(OpCode::Continuation),
            0x1 => Some(OpCode::Text),
            0x2 => Some(OpCode::Binary),
            0x8 => Some(OpCode::Close),
            0x9 => Some(OpCode::Ping),
            0xa => Some(OpCode::Pong),
            _ => None,
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub mask: Option<[u8; 4]>,
    pub payload: Vec<u8>,
}

static MASK_COUNTER: AtomicU64 = AtomicU64::new(0x9e37_79b9_7f4a_7c15);

fn next_mask() -> [u8; 4] {
    // splitmix64 over the clock and a counter
    let mut x = nanos() ^ MASK_COUNTER.fetch_add(0x9e37_79b9_7f4a_7c15, Ordering::Relaxed);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    let bytes = x.to_be_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

fn apply_mask(payload: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

impl Frame {
    /// Masked client frame
    pub fn client(opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin: true,
            opcode,
            mask: Some(next_mask()),
            payload,
        }
    }

    pub fn text(data: impl Into<String>) -> Self {
        Self::client(OpCode::Text, data.into().into_bytes())
    }

    pub fn close(code: u16, reason: &str) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        Self::client(OpCode::Close, payload)
    }

    pub fn encode(&self) -> Vec<u8> {
        let len = self.payload.len();
        let mut out = Vec::with_capacity(len + 14);
        out.push(if self.fin { 0x80 } else { 0x00 } | self.opcode as u8);

        let mask_bit = if self.mask.is_some() { 0x80 } else { 0x00 };
        if len < 126 {
            out.push(mask_bit | len as u8);
        } else if len <= u16::MAX as usize {
            out.push(mask_bit | 126);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            out.push(mask_bit | 127);
            out.extend_from_slice(&(len as u64).to_be_bytes());
        }

        match self.mask {
            Some(mask) => {
                out.extend_from_slice(&mask);
                let start = out.len();
                out.extend_from_slice(&self.payload);
                apply_mask(&mut out[start..], mask);
            }
            None => out.extend_from_slice(&self.payload),
        }
        out
    }

    /// Decode one frame from the front of `data`.
    /// `Ok(None)` means more bytes are needed.
    pub fn decode(data: &[u8]) -> Result<Option<(Self, usize)>> {
        if data.len() < 2 {
            return Ok(None);
        }
        let fin = data[0] & 0x80 != 0;
        let opcode = OpCode::from_u8(data[0] & 0x0f).ok_or_else(|| {
            ExchangeError::InvalidResponse(format!("invalid websocket opcode {:#x}", data[0] & 0x0f))
        })?;
        let masked = data[1] & 0x80 != 0;

        let mut offset = 2;
        let len = match data[1] & 0x7f {
            126 => {
                let Some(bytes) = data.get(2..4) else { return Ok(None) };
                offset += 2;
                u16::from_be_bytes([bytes[0], bytes[1]]) as usize
            }
            127 => {
                let Some(bytes) = data.get(2..10) else { return Ok(None) };
                offset += 8;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                usize::try_from(u64::from_be_bytes(raw)).unwrap_or(usize::MAX)
            }
            short => short as usize,
        };
        if len > MAX_FRAME_SIZE {
            return Err(ExchangeError::InvalidResponse(format!(
                "websocket frame of {len} bytes exceeds {MAX_FRAME_SIZE}"
            )));
        }

        let mask = if masked {
            let Some(bytes) = data.get(offset..offset + 4) else { return Ok(None) };
            offset += 4;
            Some([bytes[0], bytes[1], bytes[2], bytes[3]])
        } else {
            None
        };

        let end = offset
            .checked_add(len)
            .ok_or_else(|| ExchangeError::InvalidResponse("websocket frame length overflow".to_string()))?;
        let Some(body) = data.get(offset..end) else { return Ok(None) };
        let mut payload = body.to_vec();
        if let Some(mask) = mask {
            apply_mask(&mut payload, mask);
        }

        Ok(Some((
            Frame {
                fin,
                opcode,
                mask,
                payload,
            },
            end,
        )))
    }
}

/// `Sec-WebSocket-Accept` value for a handshake key
pub fn accept_key(ws_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(ws_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

fn validate_handshake(response: &str, ws_key: &str) -> Result<()> {
    let status_ok = response
        .lines()
        .next()
        .is_some_and(|line| line.split_whitespace().nth(1) == Some("101"));
    if !status_ok {
        let first = response.lines().next().unwrap_or_default();
        return Err(ExchangeError::ConnectionFailed(format!("websocket upgrade refused: {first}")));
    }

    let expected = accept_key(ws_key);
    let accepted = response.lines().any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("sec-websocket-accept") && value.trim() == expected
        })
    });
    if !accepted {
        return Err(ExchangeError::ConnectionFailed("websocket accept key mismatch".to_string()));
    }
    Ok(())
}

/// Inbound message after fragment reassembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<u16>),
}

pub struct MonoioWebSocket {
    stream: TlsStream,
    url: Url,
    buffer: Vec<u8>,
    fragments: Option<(OpCode, Vec<u8>)>,
    connected: bool,
    close_sent: bool,
}

impl MonoioWebSocket {
    /// Dial a `wss://` URL and complete the opening handshake
    pub async fn connect(url: &Url) -> Result<Self> {
        if url.scheme() != "wss" {
            return Err(ExchangeError::InvalidUrl(format!("{url} is not a wss URL")));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ExchangeError::InvalidUrl(format!("no host in {url}")))?
            .to_string();
        let port = url.port().unwrap_or(443);

        let timer = PerfTimer::start(format!("websocket connect {host}"));
        let mut stream = connect_tls(tls_client_config(), &host, port).await?;
        stream.complete_handshake().await?;

        let mut websocket = Self {
            stream,
            url: url.clone(),
            buffer: Vec::with_capacity(8192),
            fragments: None,
            connected: false,
            close_sent: false,
        };
        websocket.upgrade(&host).await?;
        timer.log_elapsed();

        info!("🔗 WebSocket connected to {}", url);
        Ok(websocket)
    }

    async fn upgrade(&mut self, host: &str) -> Result<()> {
        let ws_key = STANDARD.encode(generate_alphanumeric(16));
        let mut target = self.url.path().to_string();
        if target.is_empty() {
            target.push('/');
        }
        if let Some(query) = self.url.query() {
            target.push('?');
            target.push_str(query);
        }

        let request = format!(
            "GET {target} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {ws_key}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        self.stream.write_all(request.as_bytes()).await?;

        // Frames may arrive in the same read as the response head
        let head_end = loop {
            if let Some(pos) = self.buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if self.buffer.len() > MAX_HANDSHAKE_BYTES {
                return Err(ExchangeError::ConnectionFailed("websocket handshake too large".to_string()));
            }
            self.fill().await?;
        };

        let head = String::from_utf8_lossy(&self.buffer[..head_end]).to_string();
        self.buffer.drain(..head_end);
        validate_handshake(&head, &ws_key)?;

        self.connected = true;
        debug!("✅ WebSocket upgrade accepted by {}", host);
        Ok(())
    }

    async fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; 8192];
        let read = self.stream.read(&mut chunk).await?;
        if read == 0 {
            self.connected = false;
            return Err(ExchangeError::ConnectionFailed("websocket closed by peer".to_string()));
        }
        self.buffer.extend_from_slice(&chunk[..read]);
        Ok(())
    }

    pub async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        if !self.is_connected() {
            return Err(ExchangeError::WebsocketNotConnected(self.url.to_string()));
        }
        self.stream.write_all(&frame.encode()).await?;
        if frame.opcode == OpCode::Close {
            self.close_sent = true;
        }
        Ok(())
    }

    pub async fn send_text(&mut self, message: impl Into<String>) -> Result<()> {
        self.send_frame(Frame::text(message)).await
    }

    /// Next complete data message. Pings are answered, pongs dropped.
    pub async fn receive(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.try_receive().await? {
                return Ok(message);
            }
            self.fill().await?;
        }
    }

    /// Next data message from bytes already read. `Ok(None)` means the
    /// socket has to be read first.
    pub async fn try_receive(&mut self) -> Result<Option<Message>> {
        if !self.connected {
            return Err(ExchangeError::WebsocketNotConnected(self.url.to_string()));
        }
        self.stream.drain_plaintext(&mut self.buffer)?;
        while let Some((frame, consumed)) = Frame::decode(&self.buffer)? {
            self.buffer.drain(..consumed);
            if let Some(message) = self.on_frame(frame).await? {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }

    async fn on_frame(&mut self, frame: Frame) -> Result<Option<Message>> {
        match frame.opcode {
            OpCode::Ping => {
                self.send_frame(Frame::client(OpCode::Pong, frame.payload)).await?;
                Ok(None)
            }
            OpCode::Pong => Ok(None),
            OpCode::Close => {
                let code = frame
                    .payload
                    .get(..2)
                    .map(|b| u16::from_be_bytes([b[0], b[1]]));
                if !self.close_sent {
                    let _ = self.send_frame(Frame::close(code.unwrap_or(1000), "")).await;
                }
                self.connected = false;
                Ok(Some(Message::Close(code)))
            }
            OpCode::Continuation => {
                let (opcode, mut data) = self.fragments.take().ok_or_else(|| {
                    ExchangeError::InvalidResponse("continuation without a first fragment".to_string())
                })?;
                data.extend_from_slice(&frame.payload);
                if frame.fin {
                    return to_message(opcode, data).map(Some);
                }
                self.fragments = Some((opcode, data));
                Ok(None)
            }
            OpCode::Text | OpCode::Binary if !frame.fin => {
                self.fragments = Some((frame.opcode, frame.payload));
                Ok(None)
            }
            OpCode::Text | OpCode::Binary => to_message(frame.opcode, frame.payload).map(Some),
        }
    }

    /// Wait for the socket to become readable without reading from it
    pub async fn readable(&self) -> Result<()> {
        self.stream.readable().await
    }

    /// One socket read into the frame buffer. Call after [`Self::readable`].
    pub async fn read_available(&mut self) -> Result<()> {
        if !self.stream.read_available(&mut self.buffer).await? {
            self.connected = false;
            return Err(ExchangeError::ConnectionFailed("websocket closed by peer".to_string()));
        }
        Ok(())
    }

    /// Next text message; binary payloads are rejected
    pub async fn receive_text(&mut self) -> Result<String> {
        match self.receive().await? {
            Message::Text(text) => Ok(text),
            Message::Binary(_) => Err(ExchangeError::InvalidResponse(
                "unexpected binary websocket message".to_string(),
            )),
            Message::Close(code) => Err(ExchangeError::ConnectionFailed(format!(
                "websocket closed with code {code:?}"
            ))),
        }
    }

    pub async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        info!("🔌 Closing WebSocket {}", self.url);
        self.send_frame(Frame::close(code, reason)).await?;
        self.connected = false;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected && !self.close_sent
    }
}

fn to_message(opcode: OpCode, data: Vec<u8>) -> Result<Message> {
    match opcode {
        OpCode::Text => String::from_utf8(data)
            .map(Message::Text)
            .map_err(|e| ExchangeError::InvalidResponse(format!("invalid UTF-8 in text frame: {e}"))),
        _ => Ok(Message::Binary(data)),
    }
}
