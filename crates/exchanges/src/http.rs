//! HTTP transport
//!
//! Adapters never talk to sockets directly. They hand an [`HttpRequest`] to
//! an [`HttpTransport`]; production uses [`MonoioHttpsClient`] (HTTP/1.1 over
//! rustls on a monoio `TcpStream`), tests swap in an in-memory transport.

use crate::errors::{ExchangeError, Result};
use async_trait::async_trait;
use monoio::io::{AsyncReadRent, AsyncWriteRentExt};
use monoio::net::TcpStream;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "TradeBridge/0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request, ready for the wire
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }
}

/// HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends requests. Futures are `!Send`: everything runs on one monoio thread.
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Monoio-native HTTPS client
pub struct MonoioHttpsClient {
    tls_config: Arc<ClientConfig>,
    timeout: Option<Duration>,
}

/// TLS stream wrapper for monoio
pub struct TlsStream {
    stream: TcpStream,
    tls_conn: ClientConnection,
    write_buf: Vec<u8>,
    tls_read_buf: Vec<u8>,
    handshake_complete: bool,
}

/// Root store shared by HTTPS and WSS connections
pub(crate) fn tls_client_config() -> Arc<ClientConfig> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
}

/// Dial `host:port` and wrap the socket in a client TLS session
pub(crate) async fn connect_tls(config: Arc<ClientConfig>, host: &str, port: u16) -> Result<TlsStream> {
    let tcp_stream = TcpStream::connect(&format!("{host}:{port}"))
        .await
        .map_err(|e| ExchangeError::NetworkError(format!("TCP connect failed: {e}")))?;

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| ExchangeError::NetworkError(format!("Invalid server name: {e:?}")))?;

    let tls_conn = ClientConnection::new(config, server_name)
        .map_err(|e| ExchangeError::NetworkError(format!("TLS setup failed: {e}")))?;

    Ok(TlsStream::new(tcp_stream, tls_conn))
}

impl MonoioHttpsClient {
    /// Create a new HTTPS client with the webpki root store
    pub fn new() -> Self {
        Self {
            tls_config: tls_client_config(),
            timeout: Some(Duration::from_secs(15)),
        }
    }

    /// Bound every request; requires a runtime built with the timer enabled
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let parsed_url = url::Url::parse(&request.url)?;
        if parsed_url.scheme() != "https" {
            return Err(ExchangeError::InvalidUrl(format!(
                "{} is not an https URL",
                request.url
            )));
        }

        let host = parsed_url
            .host_str()
            .ok_or_else(|| ExchangeError::InvalidUrl("No host in URL".to_string()))?;
        let port = parsed_url.port().unwrap_or(443);

        let mut path_and_query = parsed_url.path().to_string();
        if path_and_query.is_empty() {
            path_and_query.push('/');
        }
        if let Some(query) = parsed_url.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        let mut tls_stream = connect_tls(self.tls_config.clone(), host, port).await?;

        let body = request.body.as_deref().unwrap_or("");
        let mut raw = format!(
            "{} {path_and_query} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Connection: close\r\n\
             Accept-Encoding: identity\r\n",
            request.method
        );
        if request.header("Content-Length").is_none() {
            raw.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        if request.header("User-Agent").is_none() {
            raw.push_str(&format!("User-Agent: {DEFAULT_USER_AGENT}\r\n"));
        }
        for (key, value) in &request.headers {
            raw.push_str(&format!("{key}: {value}\r\n"));
        }
        raw.push_str("\r\n");
        raw.push_str(body);

        tls_stream.write_all(raw.as_bytes()).await?;
        let response_data = tls_stream.read_to_end().await?;

        parse_http_response(&response_data)
    }
}

impl Default for MonoioHttpsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl HttpTransport for MonoioHttpsClient {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        match self.timeout {
            Some(limit) => monoio::time::timeout(limit, self.send(request))
                .await
                .map_err(|_| ExchangeError::Timeout(format!("{} {}", request.method, request.url)))?,
            None => self.send(request).await,
        }
    }
}

/// Parse a complete HTTP/1.1 response, decoding chunked bodies
pub(crate) fn parse_http_response(data: &[u8]) -> Result<HttpResponse> {
    let header_end = data
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| {
            ExchangeError::NetworkError("Invalid HTTP response: no header terminator".to_string())
        })?;

    let header_part = String::from_utf8_lossy(&data[..header_end]);
    let raw_body = &data[header_end + 4..];

    let mut lines = header_part.lines();
    let status_line = lines
        .next()
        .ok_or_else(|| ExchangeError::NetworkError("Empty response".to_string()))?;

    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ExchangeError::NetworkError("Invalid status line".to_string()))?;

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let chunked = headers.iter().any(|(k, v)| {
        k.eq_ignore_ascii_case("Transfer-Encoding") && v.to_ascii_lowercase().contains("chunked")
    });

    let body = if chunked {
        decode_chunked(raw_body)?
    } else {
        raw_body.to_vec()
    };

    Ok(HttpResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(data.len());
    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| ExchangeError::NetworkError("Truncated chunk header".to_string()))?;
        let size_line = String::from_utf8_lossy(&data[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| ExchangeError::NetworkError(format!("Invalid chunk size {size_hex:?}")))?;

        data = &data[line_end + 2..];
        if size == 0 {
            return Ok(body);
        }
        if data.len() < size {
            return Err(ExchangeError::NetworkError("Truncated chunk body".to_string()));
        }
        body.extend_from_slice(&data[..size]);
        data = data.get(size + 2..).unwrap_or(&[]);
    }
}

impl TlsStream {
    pub fn new(stream: TcpStream, tls_conn: ClientConnection) -> Self {
        Self {
            stream,
            tls_conn,
            write_buf: Vec::with_capacity(8192),
            tls_read_buf: Vec::with_capacity(8192),
            handshake_complete: false,
        }
    }

    async fn flush_tls(&mut self) -> Result<()> {
        while self.tls_conn.wants_write() {
            self.write_buf.clear();

            let tls_bytes = self
                .tls_conn
                .write_tls(&mut self.write_buf)
                .map_err(|e| ExchangeError::NetworkError(format!("TLS write failed: {e}")))?;

            if tls_bytes > 0 {
                let (result, _) = self.stream.write_all(self.write_buf.clone()).await;
                result.map_err(|e| ExchangeError::NetworkError(format!("TCP write failed: {e}")))?;
            }
        }
        Ok(())
    }

    async fn fill_tls(&mut self) -> Result<usize> {
        let (result, buf) = self.stream.read(vec![0u8; 4096]).await;
        let bytes_read =
            result.map_err(|e| ExchangeError::NetworkError(format!("TCP read failed: {e}")))?;

        if bytes_read > 0 {
            self.tls_conn
                .read_tls(&mut std::io::Cursor::new(&buf[..bytes_read]))
                .map_err(|e| ExchangeError::NetworkError(format!("TLS read failed: {e}")))?;
            self.tls_conn
                .process_new_packets()
                .map_err(|e| ExchangeError::NetworkError(format!("TLS process failed: {e}")))?;
        }
        Ok(bytes_read)
    }

    /// Complete TLS handshake
    pub async fn complete_handshake(&mut self) -> Result<()> {
        if self.handshake_complete {
            return Ok(());
        }

        loop {
            self.flush_tls().await?;

            if !self.tls_conn.is_handshaking() {
                self.handshake_complete = true;
                return Ok(());
            }

            if self.tls_conn.wants_read() {
                if self.fill_tls().await? == 0 {
                    return Err(ExchangeError::NetworkError(
                        "Connection closed during handshake".to_string(),
                    ));
                }
            } else if !self.tls_conn.wants_write() {
                return Err(ExchangeError::NetworkError("TLS handshake stalled".to_string()));
            }
        }
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.complete_handshake().await?;

        self.tls_conn
            .writer()
            .write_all(data)
            .map_err(|e| ExchangeError::NetworkError(format!("TLS application write failed: {e}")))?;

        self.flush_tls().await
    }

    /// Move every decrypted byte the TLS session holds into `out` without
    /// touching the socket. Returns false once the peer sent close_notify.
    pub fn drain_plaintext(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        let mut chunk = [0u8; 8192];
        loop {
            match self.tls_conn.reader().read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) => return Err(ExchangeError::NetworkError(format!("TLS read failed: {e}"))),
            }
        }
    }

    /// One socket read with its decrypted bytes appended to `out`.
    /// Returns false when the peer closed the connection.
    pub async fn read_available(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        self.complete_handshake().await?;
        let read = self.fill_tls().await?;
        let open = self.drain_plaintext(out)?;
        Ok(read > 0 && open)
    }

    /// Wait until the socket has bytes to read. Nothing is consumed, so the
    /// wait can be dropped without losing data.
    pub async fn readable(&self) -> Result<()> {
        self.stream
            .readable(false)
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("TCP readiness failed: {e}")))
    }

    /// Read decrypted bytes; `Ok(0)` means the peer closed the connection
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.complete_handshake().await?;

        loop {
            match self.tls_conn.reader().read(buf) {
                Ok(n) if n > 0 => return Ok(n),
                Ok(_) => return Ok(0),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(ExchangeError::NetworkError(format!("TLS read failed: {e}"))),
            }

            if self.fill_tls().await? == 0 {
                return Ok(0);
            }
        }
    }

    async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        self.complete_handshake().await?;

        let mut response_data = Vec::new();
        loop {
            self.tls_read_buf.clear();
            self.tls_read_buf.resize(4096, 0);

            match self.tls_conn.reader().read(&mut self.tls_read_buf) {
                Ok(0) => break,
                Ok(n) => {
                    response_data.extend_from_slice(&self.tls_read_buf[..n]);
                    continue;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                // Servers that drop the socket without close_notify
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(ExchangeError::NetworkError(format!("TLS read failed: {e}")));
                }
            }

            if self.fill_tls().await? == 0 {
                break;
            }
        }

        Ok(response_data)
    }
}
