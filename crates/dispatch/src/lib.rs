//! Request dispatch abstraction
//!
//! Defines the re-sendable request descriptor, the tagged outcome of a single
//! network call, and the `RequestDispatcher` trait that performs it. The
//! dispatcher is credential-agnostic: it sends exactly what the descriptor
//! says. Authentication is layered on top by the auth pipeline.

pub mod http;
pub mod multipart;

pub use http::ReqwestDispatcher;
pub use multipart::FilePart;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use std::future::Future;
use std::pin::Pin;

/// A fully formed, re-sendable description of one HTTP call.
///
/// Cloning is cheap: the body is reference counted, so a request can be
/// replayed after a credential refresh without re-encoding it.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Attach a JSON body and the matching content type.
    pub fn with_json(mut self, body: impl Into<Bytes>) -> Self {
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(body.into());
        self
    }
}

/// Successful (2xx) outcome of a dispatched request.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl DispatchResponse {
    /// Body decoded as UTF-8, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failed outcome of a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The server answered with a non-2xx status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// No response was received (connect error, timeout, DNS, ...).
    #[error("transport error: {0}")]
    Transport(String),
}

impl DispatchError {
    /// HTTP status of the failure, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Status { status, .. } => Some(*status),
            DispatchError::Transport(_) => None,
        }
    }
}

/// Outcome of a single dispatch: tagged success or failure.
pub type Outcome = std::result::Result<DispatchResponse, DispatchError>;

/// Performs the network call for a request descriptor.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility so callers
/// can share one dispatcher as `Arc<dyn RequestDispatcher>`.
pub trait RequestDispatcher: Send + Sync {
    /// Send the request exactly as described and report the outcome.
    fn execute<'a>(
        &'a self,
        request: RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;
}
