//! reqwest-backed dispatcher
//!
//! Sends a `RequestDescriptor` verbatim over a shared `reqwest::Client`.
//! Non-2xx answers become `DispatchError::Status` carrying the response body,
//! so callers can classify them without re-reading the response.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::{DispatchError, DispatchResponse, Outcome, RequestDescriptor, RequestDispatcher};

/// Dispatcher over a real HTTP client.
#[derive(Debug, Clone)]
pub struct ReqwestDispatcher {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestDispatcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Bound every call by `timeout`. Expiry is reported as a transport error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: RequestDescriptor) -> Outcome {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| DispatchError::Transport(format!("reading response body: {e}")))?;

        debug!(status = status.as_u16(), bytes = body.len(), "response received");

        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(DispatchResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

impl RequestDispatcher for ReqwestDispatcher {
    fn execute<'a>(
        &'a self,
        request: RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + 'a>> {
        Box::pin(self.send(request))
    }
}
