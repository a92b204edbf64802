//! Token endpoint calls
//!
//! Handles the three interactions with the backend's auth endpoints:
//! 1. Login (username + password)
//! 2. Signup (username + password + email)
//! 3. Refresh (refresh credential -> new access credential)
//!
//! All three go straight to the dispatcher. They never carry a bearer
//! credential and are never routed through the auth pipeline, so a 401 here
//! is a plain rejection rather than a session-expiry signal.

use dispatch::{DispatchError, RequestDescriptor, RequestDispatcher};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{LOGIN_PATH, REFRESH_PATH, SIGNUP_PATH, endpoint};
use crate::error::{Error, Result};

/// Credential pair returned by login and signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Response from the refresh endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Login/signup body. Older backends nest the pair under `tokens`.
#[derive(Debug, Deserialize)]
struct PairResponse {
    access: Option<String>,
    refresh: Option<String>,
    tokens: Option<NestedTokens>,
}

#[derive(Debug, Deserialize)]
struct NestedTokens {
    access: Option<String>,
    refresh: Option<String>,
}

impl PairResponse {
    fn into_pair(self) -> Result<TokenPair> {
        let nested = self.tokens;
        let access = self
            .access
            .or_else(|| nested.as_ref().and_then(|t| t.access.clone()));
        let refresh = self
            .refresh
            .or_else(|| nested.as_ref().and_then(|t| t.refresh.clone()));
        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(TokenPair { access, refresh }),
            _ => Err(Error::InvalidResponse(
                "response is missing access or refresh".into(),
            )),
        }
    }
}

fn map_dispatch_error(step: &str, err: DispatchError) -> Error {
    match err {
        DispatchError::Status { status, body } => Error::Rejected { status, body },
        DispatchError::Transport(msg) => Error::Http(format!("{step} request failed: {msg}")),
    }
}

async fn post_json(
    dispatcher: &dyn RequestDispatcher,
    url: String,
    body: serde_json::Value,
    step: &str,
) -> Result<dispatch::DispatchResponse> {
    let request = RequestDescriptor::post(url).with_json(body.to_string());
    dispatcher
        .execute(request)
        .await
        .map_err(|e| map_dispatch_error(step, e))
}

/// Exchange a username and password for a credential pair.
pub async fn login(
    dispatcher: &dyn RequestDispatcher,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<TokenPair> {
    let response = post_json(
        dispatcher,
        endpoint(base_url, LOGIN_PATH),
        serde_json::json!({ "username": username, "password": password }),
        "login",
    )
    .await?;

    let pair = serde_json::from_slice::<PairResponse>(&response.body)
        .map_err(|e| Error::InvalidResponse(format!("login: {e}")))?
        .into_pair()?;
    debug!(username, "login succeeded");
    Ok(pair)
}

/// Create an account and return its first credential pair.
pub async fn signup(
    dispatcher: &dyn RequestDispatcher,
    base_url: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<TokenPair> {
    let response = post_json(
        dispatcher,
        endpoint(base_url, SIGNUP_PATH),
        serde_json::json!({ "username": username, "password": password, "email": email }),
        "signup",
    )
    .await?;

    let pair = serde_json::from_slice::<PairResponse>(&response.body)
        .map_err(|e| Error::InvalidResponse(format!("signup: {e}")))?
        .into_pair()?;
    debug!(username, "signup succeeded");
    Ok(pair)
}

/// Exchange a refresh credential for a new access credential.
///
/// Any failure status, transport error or unparseable body is a renewal
/// failure; the caller decides what that means for the session.
pub async fn refresh_access(
    dispatcher: &dyn RequestDispatcher,
    base_url: &str,
    refresh: &str,
) -> Result<RefreshResponse> {
    let response = post_json(
        dispatcher,
        endpoint(base_url, REFRESH_PATH),
        serde_json::json!({ "refresh": refresh }),
        "refresh",
    )
    .await?;

    serde_json::from_slice::<RefreshResponse>(&response.body)
        .map_err(|e| Error::InvalidResponse(format!("refresh: {e}")))
}
