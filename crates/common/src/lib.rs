//! Types shared by the dashboard client crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
