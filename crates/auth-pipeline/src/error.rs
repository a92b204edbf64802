//! Pipeline error taxonomy

use dispatch::DispatchError;

use crate::refresh::RefreshError;

/// Failures surfaced by `AuthPipeline::send`.
///
/// A 401 that is recovered by a renewal and replay never shows up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 401 with no refresh credential stored. No renewal was attempted.
    #[error("session expired and no refresh credential is stored: {0}")]
    NoRefreshCredential(DispatchError),

    /// The renewal call failed. Every request waiting on it gets the same
    /// error, and the credential store has been cleared.
    #[error("credential refresh failed: {0}")]
    RefreshFailed(RefreshError),

    /// The request was replayed with a fresh credential and still got 401.
    #[error("request rejected again after credential refresh: {0}")]
    RetryExhausted(DispatchError),

    /// The stored access credential cannot be sent as a header value.
    #[error("invalid access credential: {0}")]
    InvalidCredential(String),

    /// Any failure other than session expiry, untouched.
    #[error(transparent)]
    Passthrough(DispatchError),
}

impl Error {
    /// True when the session is unrecoverable and the user must log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Error::NoRefreshCredential(_) | Error::RefreshFailed(_) | Error::RetryExhausted(_)
        )
    }

    /// Label for the `result` dimension of pipeline metrics.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Error::NoRefreshCredential(_) => "no_refresh_credential",
            Error::RefreshFailed(_) => "refresh_failed",
            Error::RetryExhausted(_) => "retry_exhausted",
            Error::InvalidCredential(_) => "invalid_credential",
            Error::Passthrough(_) => "passthrough",
        }
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
