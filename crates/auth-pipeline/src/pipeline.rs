//! Per-request authentication interceptor
//!
//! `AuthPipeline::send` attaches the stored access credential, dispatches,
//! and inspects the outcome. A 401 on the first attempt is recovered through
//! the `RefreshCoordinator` and replayed once, straight through the
//! dispatcher; the replay is never fed back into this logic, so a second 401
//! ends the request instead of starting another renewal.

use std::sync::Arc;

use dashboard_auth::CredentialStore;
use dispatch::{DispatchResponse, RequestDescriptor, RequestDispatcher};
use tracing::{debug, instrument, warn};

use crate::attempt::Attempt;
use crate::classify::{ResponseClass, classify};
use crate::error::{Error, Result};
use crate::refresh::RefreshCoordinator;

/// Authenticated request pipeline.
///
/// Reads the credential store but never writes it; writes happen in the
/// coordinator (renewal) and in login/logout flows outside the pipeline.
pub struct AuthPipeline {
    store: Arc<dyn CredentialStore>,
    dispatcher: Arc<dyn RequestDispatcher>,
    coordinator: RefreshCoordinator,
}

impl AuthPipeline {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        dispatcher: Arc<dyn RequestDispatcher>,
        coordinator: RefreshCoordinator,
    ) -> Self {
        Self {
            store,
            dispatcher,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Send `request` with the current credential, recovering once from expiry.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, request: RequestDescriptor) -> Result<DispatchResponse> {
        let result = self.run(Attempt::new(request)).await;
        let label = match &result {
            Ok(_) => "ok",
            Err(e) => e.label(),
        };
        metrics::counter!("auth_pipeline_requests_total", "result" => label).increment(1);
        result
    }

    async fn run(&self, first: Attempt) -> Result<DispatchResponse> {
        let mut attempt = first;
        let mut access = self.store.get().await.and_then(|pair| pair.access);

        loop {
            debug!(
                request_id = %attempt.id(),
                retry = attempt.retry(),
                bearer = access.is_some(),
                "dispatching"
            );
            let outgoing = attempt.outgoing(access.as_deref())?;

            let outcome = self.dispatcher.execute(outgoing).await;
            let err = match (classify(&outcome), outcome) {
                (ResponseClass::SessionExpired, Err(err)) => err,
                (_, outcome) => return outcome.map_err(Error::Passthrough),
            };

            let Some(replay) = attempt.replay() else {
                warn!(request_id = %attempt.id(), "still unauthorized after renewal");
                return Err(Error::RetryExhausted(err));
            };

            let has_refresh = self
                .store
                .get()
                .await
                .is_some_and(|pair| pair.refresh.is_some());
            if !has_refresh {
                debug!(request_id = %attempt.id(), "session expired with no refresh credential");
                return Err(Error::NoRefreshCredential(err));
            }

            let renewed = self
                .coordinator
                .wait()
                .await
                .map_err(Error::RefreshFailed)?;

            access = Some(renewed);
            attempt = replay;
        }
    }
}
