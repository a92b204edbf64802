//! Dashboard backend endpoint paths
//!
//! Paths are relative to the configured API base URL.

/// Exchange username/password for an access/refresh pair
pub const LOGIN_PATH: &str = "/api/auth/login/";

/// Create an account; answers with the same pair as login
pub const SIGNUP_PATH: &str = "/api/auth/signup/";

/// Exchange a refresh credential for a new access credential
pub const REFRESH_PATH: &str = "/api/auth/refresh/";

/// Status the backend uses to report an expired or invalid access credential
pub const SESSION_EXPIRED_STATUS: u16 = 401;

/// Join a base URL and an endpoint path without doubling the slash.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
