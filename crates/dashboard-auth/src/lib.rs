//! Dashboard authentication library
//!
//! Owns the credential pair and the three token endpoints of the dashboard
//! backend. This crate knows how to obtain and persist credentials; it does
//! not decide when to refresh them (that is the auth pipeline's job).
//!
//! Credential flow:
//! 1. `token::login()` / `token::signup()` return an access/refresh pair
//! 2. The pair is written with `CredentialStore::set()`
//! 3. On session expiry the pipeline calls `token::refresh_access()`
//! 4. The new access credential is written with `CredentialStore::set_access()`
//! 5. Logout or an unrecoverable refresh calls `CredentialStore::clear()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialPair, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{Error, Result};
pub use token::{RefreshResponse, TokenPair, login, refresh_access, signup};
