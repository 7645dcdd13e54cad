//! In-memory transport for tests
//!
//! Responses are matched on method and a URL substring, in the order they
//! were registered. Every executed request is recorded for assertions.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::errors::{ExchangeError, Result};
use crate::http::{HttpRequest, HttpResponse, HttpTransport, Method};

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    url_contains: String,
    status: u16,
    body: String,
    /// Reusable routes answer every match; one-shot routes answer once
    reusable: bool,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every matching request with `status` and `body`
    pub fn route(self, method: Method, url_contains: &str, status: u16, body: &str) -> Self {
        self.push(method, url_contains, status, body, true);
        self
    }

    /// Answer the next matching request only
    pub fn route_once(self, method: Method, url_contains: &str, status: u16, body: &str) -> Self {
        self.push(method, url_contains, status, body, false);
        self
    }

    pub fn push(&self, method: Method, url_contains: &str, status: u16, body: &str, reusable: bool) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                method,
                url_contains: url_contains.to_string(),
                status,
                body: body.to_string(),
                reusable,
            });
        }
    }

    /// Requests executed so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait(?Send)]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let mut routes = self
            .routes
            .lock()
            .map_err(|_| ExchangeError::NetworkError("mock routes poisoned".to_string()))?;

        let index = routes
            .iter()
            .position(|r| r.method == request.method && request.url.contains(&r.url_contains))
            .ok_or_else(|| {
                ExchangeError::NetworkError(format!(
                    "no mock route for {} {}",
                    request.method, request.url
                ))
            })?;

        let route = if routes[index].reusable {
            routes[index].clone()
        } else {
            routes.remove(index)
        };

        Ok(HttpResponse {
            status: route.status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: route.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[monoio::test]
    async fn test_routes_and_records() {
        let mock = MockTransport::new()
            .route_once(Method::Get, "/ticker", 200, "{\"first\":true}")
            .route(Method::Get, "/ticker", 200, "{\"first\":false}");

        let request = HttpRequest::new(Method::Get, "https://api.example.com/ticker?pair=BTCUSD");
        assert_eq!(mock.execute(&request).await.unwrap().body, "{\"first\":true}");
        assert_eq!(mock.execute(&request).await.unwrap().body, "{\"first\":false}");
        assert_eq!(mock.execute(&request).await.unwrap().body, "{\"first\":false}");
        assert_eq!(mock.requests().len(), 3);

        let post = HttpRequest::new(Method::Post, "https://api.example.com/ticker");
        assert!(mock.execute(&post).await.is_err());
    }
}
