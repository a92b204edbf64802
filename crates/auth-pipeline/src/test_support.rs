//! Scripted in-memory dispatcher for pipeline and coordinator tests

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use dashboard_auth::REFRESH_PATH;
use dispatch::{DispatchError, DispatchResponse, Outcome, RequestDescriptor, RequestDispatcher};
use reqwest::header::AUTHORIZATION;
use tokio::sync::Semaphore;

type Handler = Box<dyn Fn(&RequestDescriptor) -> Outcome + Send + Sync>;

/// One request as the dispatcher saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub authorization: Vec<String>,
}

/// Answers every request with `handler`. Refresh calls can be held at a gate
/// so concurrent callers are guaranteed to pile up behind one renewal.
pub struct ScriptedDispatcher {
    handler: Handler,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedDispatcher {
    pub fn new(handler: impl Fn(&RequestDescriptor) -> Outcome + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Hold each refresh call until a permit is added to `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, suffix: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.url.ends_with(suffix))
            .collect()
    }

    pub fn refresh_calls(&self) -> usize {
        self.calls_to(REFRESH_PATH).len()
    }
}

impl RequestDispatcher for ScriptedDispatcher {
    fn execute<'a>(
        &'a self,
        request: RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(RecordedCall {
                url: request.url.clone(),
                authorization: request
                    .headers
                    .get_all(AUTHORIZATION)
                    .iter()
                    .map(|v| v.to_str().unwrap().to_string())
                    .collect(),
            });

            if let Some(gate) = self.gate.as_ref().filter(|_| is_refresh(&request)) {
                gate.acquire().await.unwrap().forget();
            }

            (self.handler)(&request)
        })
    }
}

/// Bearer credential the request carries, if any.
pub fn bearer(request: &RequestDescriptor) -> Option<&str> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn is_refresh(request: &RequestDescriptor) -> bool {
    request.url.ends_with(REFRESH_PATH)
}

pub fn ok_json(body: &'static str) -> Outcome {
    Ok(DispatchResponse {
        status: 200,
        headers: Default::default(),
        body: Bytes::from_static(body.as_bytes()),
    })
}

pub fn status(status: u16) -> Outcome {
    Err(DispatchError::Status {
        status,
        body: String::new(),
    })
}

pub fn unauthorized() -> Outcome {
    status(401)
}

pub fn transport_error(message: &str) -> Outcome {
    Err(DispatchError::Transport(message.to_string()))
}
