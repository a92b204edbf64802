//! Immutable attempt descriptor
//!
//! One logical request produces at most two attempts: the original (retry 0)
//! and a single replay after credential renewal (retry 1). Each attempt is a
//! fresh value sharing the caller's descriptor, so nothing mutates a request
//! that might still be referenced elsewhere.

use std::sync::Arc;

use dispatch::RequestDescriptor;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Highest retry counter an attempt may carry.
const MAX_RETRY: u8 = 1;

/// A single send of a logical request.
#[derive(Debug, Clone)]
pub struct Attempt {
    id: Uuid,
    request: Arc<RequestDescriptor>,
    retry: u8,
}

impl Attempt {
    /// First attempt for a caller's request.
    pub fn new(request: RequestDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            request: Arc::new(request),
            retry: 0,
        }
    }

    /// Id shared by every attempt of the same logical request.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 0 for the original send, 1 for the replay.
    pub fn retry(&self) -> u8 {
        self.retry
    }

    /// The replay attempt, or `None` if this attempt already is the replay.
    pub fn replay(&self) -> Option<Attempt> {
        (self.retry < MAX_RETRY).then(|| Attempt {
            id: self.id,
            request: Arc::clone(&self.request),
            retry: self.retry + 1,
        })
    }

    /// Build the descriptor to dispatch, with `access` as the bearer credential.
    ///
    /// Any caller-supplied Authorization header is replaced, so at most one is
    /// ever sent. With no access credential the header is left off entirely.
    pub fn outgoing(&self, access: Option<&str>) -> Result<RequestDescriptor> {
        let mut request = (*self.request).clone();
        request.headers.remove(AUTHORIZATION);
        if let Some(access) = access {
            let mut value = HeaderValue::from_str(&format!("Bearer {access}"))
                .map_err(|e| Error::InvalidCredential(e.to_string()))?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_has_retry_zero() {
        let attempt = Attempt::new(RequestDescriptor::get("http://localhost/api/x"));
        assert_eq!(attempt.retry(), 0);
    }

    #[test]
    fn replay_happens_at_most_once() {
        let attempt = Attempt::new(RequestDescriptor::get("http://localhost/api/x"));
        let replay = attempt.replay().unwrap();
        assert_eq!(replay.retry(), 1);
        assert_eq!(replay.id(), attempt.id());
        assert!(replay.replay().is_none());
        // The original is untouched and could still produce the same replay
        assert_eq!(attempt.retry(), 0);
    }

    #[test]
    fn outgoing_attaches_single_bearer_header() {
        let mut request = RequestDescriptor::get("http://localhost/api/x");
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer caller"));
        let attempt = Attempt::new(request);

        let outgoing = attempt.outgoing(Some("new")).unwrap();
        let values: Vec<_> = outgoing.headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values, vec!["Bearer new"]);
        assert!(values[0].is_sensitive());
    }

    #[test]
    fn outgoing_without_access_has_no_header() {
        let attempt = Attempt::new(RequestDescriptor::get("http://localhost/api/x"));
        let outgoing = attempt.outgoing(None).unwrap();
        assert!(outgoing.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn outgoing_rejects_unsendable_credential() {
        let attempt = Attempt::new(RequestDescriptor::get("http://localhost/api/x"));
        let result = attempt.outgoing(Some("bad\nvalue"));
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }
}
