//! Response classification
//!
//! Only one class of failure is handled by the pipeline: a 401 meaning the
//! presented access credential is no longer valid. Everything else (other
//! statuses, transport failures) is the caller's business.

use dashboard_auth::SESSION_EXPIRED_STATUS;
use dispatch::{DispatchError, Outcome};

/// How the pipeline treats a dispatch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx: returned to the caller unchanged
    Success,
    /// 401: candidate for credential renewal and replay
    SessionExpired,
    /// Any other failure: returned to the caller unchanged
    Passthrough,
}

/// True when the failure signals an expired access credential.
pub fn is_session_expired(err: &DispatchError) -> bool {
    err.status() == Some(SESSION_EXPIRED_STATUS)
}

/// Classify a dispatch outcome.
pub fn classify(outcome: &Outcome) -> ResponseClass {
    match outcome {
        Ok(_) => ResponseClass::Success,
        Err(err) if is_session_expired(err) => ResponseClass::SessionExpired,
        Err(_) => ResponseClass::Passthrough,
    }
}
