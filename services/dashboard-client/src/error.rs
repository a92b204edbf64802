//! Client-level errors
//!
//! Wraps the pipeline and auth errors so the CLI can tell "the session is
//! gone, log in again" apart from ordinary request failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Request(#[from] auth_pipeline::Error),

    #[error("authentication failed: {0}")]
    Auth(#[from] dashboard_auth::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("missing input: {0}")]
    MissingInput(String),
}

impl Error {
    /// True when the stored session is unusable and the user must log in.
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::Request(e) if e.requires_login())
    }
}

/// Result alias using client Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch::DispatchError;

    #[test]
    fn expired_session_requires_login() {
        let err: Error = auth_pipeline::Error::NoRefreshCredential(DispatchError::Status {
            status: 401,
            body: String::new(),
        })
        .into();
        assert!(err.requires_login());
    }

    #[test]
    fn login_rejection_does_not_trigger_relogin_prompt() {
        let err: Error = dashboard_auth::Error::Rejected {
            status: 401,
            body: "bad credentials".into(),
        }
        .into();
        assert!(!err.requires_login());
        assert!(err.to_string().starts_with("authentication failed"));
    }

    #[test]
    fn server_error_passes_through_message() {
        let err: Error = auth_pipeline::Error::Passthrough(DispatchError::Status {
            status: 500,
            body: "boom".into(),
        })
        .into();
        assert!(!err.requires_login());
        assert_eq!(err.to_string(), "request failed with status 500: boom");
    }
}
