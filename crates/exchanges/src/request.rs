//! Rate-limited request dispatch
//!
//! Every adapter owns one [`Requester`]. Requests name the rate limit bucket
//! they draw from ([`EndpointLimit`]); the requester waits on that bucket,
//! stamps the user agent, sends through the transport and decodes JSON.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};
use tradebridge_core::PerfTimer;

use crate::errors::{ExchangeError, Result};
use crate::http::{DEFAULT_USER_AGENT, HttpRequest, HttpResponse, HttpTransport, Method};

/// Rate limit bucket identifier; each adapter defines its own constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointLimit(pub u8);

impl EndpointLimit {
    /// Bucket used when a request does not name one
    pub const DEFAULT: EndpointLimit = EndpointLimit(0);
}

/// `requests` per `interval`, allowing a burst of `requests`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub interval: Duration,
}

impl RateLimit {
    pub const fn new(requests: u32, interval: Duration) -> Self {
        Self { requests, interval }
    }

    pub const fn per_second(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(1))
    }

    pub const fn per_minute(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(60))
    }

    fn quota(&self) -> Option<Quota> {
        let burst = NonZeroU32::new(self.requests)?;
        let period = self.interval.checked_div(self.requests)?;
        Quota::with_period(period).map(|q| q.allow_burst(burst))
    }
}

/// A request before it reaches the transport
#[derive(Debug, Clone)]
pub struct Item {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub endpoint: EndpointLimit,
    /// Authenticated requests never log their headers
    pub authenticated: bool,
}

impl Item {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            endpoint: EndpointLimit::DEFAULT,
            authenticated: false,
        }
    }

    /// Sets a header, replacing any earlier value under the same name
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((name.to_string(), value)),
        }
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with the matching content type
    pub fn json(self, body: &serde_json::Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(body.to_string())
    }

    pub fn limit(mut self, endpoint: EndpointLimit) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }
}

pub struct Requester {
    name: String,
    transport: Arc<dyn HttpTransport>,
    limiters: HashMap<EndpointLimit, DefaultDirectRateLimiter>,
    limiter_enabled: AtomicBool,
    user_agent: String,
    verbose: bool,
}

impl Requester {
    pub fn new(name: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            name: name.to_string(),
            transport,
            limiters: HashMap::new(),
            limiter_enabled: AtomicBool::new(true),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verbose: false,
        }
    }

    /// Register a throttle for `endpoint`. Zero-request limits are ignored.
    pub fn with_limit(mut self, endpoint: EndpointLimit, limit: RateLimit) -> Self {
        self.set_limit(endpoint, limit);
        self
    }

    pub fn set_limit(&mut self, endpoint: EndpointLimit, limit: RateLimit) {
        match limit.quota() {
            Some(quota) => {
                self.limiters.insert(endpoint, RateLimiter::direct(quota));
            }
            None => warn!("⚠️ {} ignoring empty rate limit {:?}", self.name, limit),
        }
    }

    pub fn set_transport(&mut self, transport: Arc<dyn HttpTransport>) {
        self.transport = transport;
    }

    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.user_agent = user_agent.to_string();
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn disable_rate_limiter(&self) {
        self.limiter_enabled.store(false, Ordering::Relaxed);
    }

    pub fn enable_rate_limiter(&self) {
        self.limiter_enabled.store(true, Ordering::Relaxed);
    }

    pub fn is_rate_limited(&self) -> bool {
        self.limiter_enabled.load(Ordering::Relaxed)
    }

    async fn wait_for(&self, endpoint: EndpointLimit) {
        if !self.is_rate_limited() {
            return;
        }
        let limiter = self
            .limiters
            .get(&endpoint)
            .or_else(|| self.limiters.get(&EndpointLimit::DEFAULT));
        if let Some(limiter) = limiter {
            limiter.until_ready().await;
        }
    }

    /// Send and return the response whatever its status
    pub async fn send_raw(&self, item: Item) -> Result<HttpResponse> {
        self.wait_for(item.endpoint).await;

        let mut request = HttpRequest {
            method: item.method,
            url: item.url,
            headers: item.headers,
            body: item.body,
        };
        if request.header("User-Agent").is_none() {
            request.set_header("User-Agent", self.user_agent.clone());
        }

        if self.verbose {
            debug!(
                "📡 {} {} {} body={}",
                self.name,
                request.method,
                request.url,
                request.body.as_deref().unwrap_or("")
            );
            if !item.authenticated {
                debug!("📡 {} headers={:?}", self.name, request.headers);
            }
        } else {
            debug!("📡 {} {} {}", self.name, request.method, request.url);
        }

        let timer = PerfTimer::start(format!("{} {} {}", self.name, request.method, request.url));
        let response = self.transport.execute(&request).await?;
        timer.log_elapsed();

        if self.verbose {
            debug!("📥 {} HTTP {} {}", self.name, response.status, response.body);
        }
        Ok(response)
    }

    /// Send and fail on non-2xx statuses
    pub async fn send(&self, item: Item) -> Result<HttpResponse> {
        let response = self.send_raw(item).await?;
        if response.is_success() {
            return Ok(response);
        }
        Err(self.status_error(&response))
    }

    /// Send and decode the JSON body into `T`
    pub async fn send_json<T: DeserializeOwned>(&self, item: Item) -> Result<T> {
        let response = self.send(item).await?;
        decode_body(&self.name, &response.body)
    }

    /// Turn an error status into the most specific error the body allows
    fn status_error(&self, response: &HttpResponse) -> ExchangeError {
        if response.status == 429 {
            return ExchangeError::RateLimitExceeded(format!("{} returned HTTP 429", self.name));
        }

        let parsed: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();
        let message = parsed.as_ref().and_then(|v| {
            ["message", "msg", "err-msg", "reason", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
                .map(str::to_string)
        });

        match message {
            Some(message) => {
                let code = parsed
                    .as_ref()
                    .and_then(|v| v.get("code").or_else(|| v.get("err-code")))
                    .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
                    .unwrap_or_else(|| response.status.to_string());
                ExchangeError::api(&self.name, code, message)
            }
            None => ExchangeError::HttpError {
                status: response.status,
                body: response.body.clone(),
            },
        }
    }
}

/// Decode a JSON body, keeping a snippet of the payload in the error
pub fn decode_body<T: DeserializeOwned>(exchange: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        let snippet: String = body.chars().take(200).collect();
        ExchangeError::InvalidResponse(format!("{exchange}: {e} in {snippet}"))
    })
}
