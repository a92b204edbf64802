//! Authenticated request pipeline
//!
//! Wraps a `RequestDispatcher` so every outgoing call carries the current
//! bearer credential, and recovers transparently from session expiry:
//!
//! 1. Caller hands a `RequestDescriptor` to `AuthPipeline::send`
//! 2. The access credential (if any) is attached as `Authorization: Bearer ..`
//! 3. The dispatcher performs the call
//! 4. A 401 on a first attempt with a stored refresh credential is routed to
//!    the `RefreshCoordinator`, which renews the credential exactly once no
//!    matter how many requests hit 401 concurrently
//! 5. Each affected request is replayed once with the new credential
//!
//! Every other outcome passes through untouched. A request is never replayed
//! more than once, and an unrecoverable renewal clears the credential store,
//! which is the signal for the host to force a new login.

pub mod attempt;
pub mod classify;
pub mod error;
pub mod pipeline;
pub mod refresh;

#[cfg(test)]
mod test_support;

pub use attempt::Attempt;
pub use classify::{ResponseClass, classify, is_session_expired};
pub use error::{Error, Result};
pub use pipeline::AuthPipeline;
pub use refresh::{RefreshCoordinator, RefreshCoordinatorBuilder, RefreshError, RefreshState};
