//! Single-flight credential renewal
//!
//! `RefreshCoordinator` is a two-state machine (`Idle` / `Refreshing`) owning
//! a FIFO queue of waiters. The first caller to find it `Idle` flips it to
//! `Refreshing` and starts the one renewal call; everyone arriving while it is
//! `Refreshing` joins the queue instead of issuing another call. When the
//! renewal settles the queue is drained exactly once, in join order, with the
//! same outcome for every waiter.
//!
//! The renewal runs as a task owned by the coordinator rather than inside the
//! triggering caller's future, so dropping that caller cannot strand the rest
//! of the queue. The state flag is the only mutual exclusion for renewals;
//! the lock around it is never held across I/O.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashboard_auth::CredentialStore;
use dispatch::RequestDispatcher;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Failure of a renewal, delivered identically to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RefreshError {
    /// Status returned by the refresh endpoint, if it answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<dashboard_auth::Error> for RefreshError {
    fn from(err: dashboard_auth::Error) -> Self {
        Self::new(err.status(), err.to_string())
    }
}

type RefreshOutcome = std::result::Result<String, RefreshError>;
type Waiter = oneshot::Sender<RefreshOutcome>;

enum Slot {
    Idle,
    Refreshing { waiters: VecDeque<Waiter> },
}

struct Inner {
    base_url: String,
    store: Arc<dyn CredentialStore>,
    dispatcher: Arc<dyn RequestDispatcher>,
    timeout: Option<Duration>,
    slot: Mutex<Slot>,
}

/// Coordinates credential renewal across all in-flight requests.
///
/// Cheap to clone; clones share the same state machine. Construct one per
/// credential store and hand it to every pipeline that uses that store.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// Create an idle, untimed coordinator renewing against `base_url`'s
    /// refresh endpoint.
    ///
    /// A hung refresh call stalls every waiter until the dispatcher gives up.
    /// Use `builder` to bound it.
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        dispatcher: Arc<dyn RequestDispatcher>,
    ) -> Self {
        Self::builder(base_url, store, dispatcher).build()
    }

    pub fn builder(
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        dispatcher: Arc<dyn RequestDispatcher>,
    ) -> RefreshCoordinatorBuilder {
        RefreshCoordinatorBuilder {
            base_url: base_url.into(),
            store,
            dispatcher,
            timeout: None,
        }
    }

    /// Bound on each renewal call, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Current state of the machine.
    pub async fn state(&self) -> RefreshState {
        match &*self.inner.slot.lock().await {
            Slot::Idle => RefreshState::Idle,
            Slot::Refreshing { .. } => RefreshState::Refreshing,
        }
    }

    /// Number of callers waiting on the in-flight renewal (0 when idle).
    pub async fn pending_waiters(&self) -> usize {
        match &*self.inner.slot.lock().await {
            Slot::Idle => 0,
            Slot::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Wait for a renewed access credential.
    ///
    /// If no renewal is in flight this starts one; otherwise the caller joins
    /// the queue of the current one. Either way exactly one refresh call is
    /// made per `Idle -> Refreshing -> Idle` cycle.
    pub async fn wait(&self) -> RefreshOutcome {
        let (tx, rx) = oneshot::channel();

        let owner = {
            let mut slot = self.inner.slot.lock().await;
            match &mut *slot {
                Slot::Refreshing { waiters } => {
                    waiters.push_back(tx);
                    debug!(waiters = waiters.len(), "renewal in flight, queued");
                    false
                }
                Slot::Idle => {
                    *slot = Slot::Refreshing {
                        waiters: VecDeque::from([tx]),
                    };
                    true
                }
            }
        };

        if owner {
            debug!("starting credential renewal");
            tokio::spawn(Arc::clone(&self.inner).run());
        }

        rx.await.unwrap_or_else(|_| {
            Err(RefreshError::new(
                None,
                "renewal ended without delivering a result",
            ))
        })
    }
}

/// Configures a `RefreshCoordinator` before it can be shared.
pub struct RefreshCoordinatorBuilder {
    base_url: String,
    store: Arc<dyn CredentialStore>,
    dispatcher: Arc<dyn RequestDispatcher>,
    timeout: Option<Duration>,
}

impl RefreshCoordinatorBuilder {
    /// Fail the renewal (with the usual credential clearing) if it takes
    /// longer than `timeout`. `None` leaves it untimed.
    pub fn timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn build(self) -> RefreshCoordinator {
        RefreshCoordinator {
            inner: Arc::new(Inner {
                base_url: self.base_url,
                store: self.store,
                dispatcher: self.dispatcher,
                timeout: self.timeout,
                slot: Mutex::new(Slot::Idle),
            }),
        }
    }
}

impl Inner {
    /// Perform the renewal, record its effect on the store, then drain.
    ///
    /// Store writes happen before the machine returns to `Idle`, so a request
    /// that sees `Idle` also sees the renewed (or cleared) credentials.
    async fn run(self: Arc<Self>) {
        let outcome = self.renew().await;

        match &outcome {
            Ok(access) => {
                if let Err(e) = self.store.set_access(access.clone()).await {
                    warn!(error = %e, "failed to persist refreshed access credential");
                }
                metrics::counter!("auth_refresh_total", "outcome" => "success").increment(1);
            }
            Err(e) => {
                warn!(error = %e, "credential renewal failed, clearing credentials");
                if let Err(e) = self.store.clear().await {
                    warn!(error = %e, "failed to clear credentials after renewal failure");
                }
                metrics::counter!("auth_refresh_total", "outcome" => "failure").increment(1);
            }
        }

        let waiters = match std::mem::replace(&mut *self.slot.lock().await, Slot::Idle) {
            Slot::Refreshing { waiters } => waiters,
            Slot::Idle => VecDeque::new(),
        };

        if outcome.is_ok() {
            info!(waiters = waiters.len(), "credential renewed");
        }

        for waiter in waiters {
            // A waiter whose caller went away simply drops the result.
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn renew(&self) -> RefreshOutcome {
        let refresh = self
            .store
            .get()
            .await
            .and_then(|pair| pair.refresh)
            .ok_or_else(|| RefreshError::new(None, "no refresh credential stored"))?;

        let call = dashboard_auth::refresh_access(self.dispatcher.as_ref(), &self.base_url, &refresh);
        let response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call).await.map_err(|_| {
                RefreshError::new(
                    None,
                    format!("refresh call timed out after {}ms", timeout.as_millis()),
                )
            })?,
            None => call.await,
        };

        response.map(|r| r.access).map_err(RefreshError::from)
    }
}
