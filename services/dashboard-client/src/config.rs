//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login password is read from DASHBOARD_PASSWORD or `password_file`,
//! never from the TOML itself.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Credential handling settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// Where the access/refresh pair is persisted. Relative paths are
    /// resolved against the config file's directory.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    /// Keep credentials in process memory only. Every run starts logged out.
    #[serde(default)]
    pub in_memory: bool,
    /// Bound on the refresh call. Absent leaves renewal untimed.
    #[serde(default)]
    pub refresh_timeout_secs: Option<u64>,
    /// Default username for `login`
    #[serde(default)]
    pub username: Option<String>,
    /// File holding the login password (alternative to DASHBOARD_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            in_memory: false,
            refresh_timeout_secs: None,
            username: None,
            password_file: None,
            password: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("tokens.json")
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// DASHBOARD_API_URL replaces `api.base_url`. Password resolution order:
    /// 1. DASHBOARD_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("DASHBOARD_API_URL") {
            config.api.base_url = url;
        }

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.auth.refresh_timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "refresh_timeout_secs must be greater than 0 when set".into(),
            ));
        }

        if config.auth.credentials_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.auth.credentials_file = dir.join(&config.auth.credentials_file);
            }
        }

        if let Ok(password) = std::env::var("DASHBOARD_PASSWORD") {
            config.auth.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = config.auth.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            let password = Secret::new(password.trim().to_owned());
            if !password.is_blank() {
                config.auth.password = Some(password);
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("dashboard-client.toml")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Option<Duration> {
        self.auth.refresh_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clean_env() {
        unsafe {
            remove_env("DASHBOARD_API_URL");
            remove_env("DASHBOARD_PASSWORD");
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("dashboard-client.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    const MINIMAL: &str = r#"
[api]
base_url = "http://127.0.0.1:8000"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&write_config(&dir, MINIMAL)).unwrap();

        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.refresh_timeout().is_none(), "renewal is untimed by default");
        assert_eq!(config.auth.credentials_file, dir.path().join("tokens.json"));
        assert!(!config.auth.in_memory, "credentials persist by default");
        assert!(config.auth.password.is_none());
    }

    #[test]
    fn full_config_parses() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "https://dashboard.example.com"
timeout_secs = 5

[auth]
credentials_file = "/tmp/tokens.json"
refresh_timeout_secs = 10
username = "alice"
"#,
        );
        let config = Config::load(&path).unwrap();

        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.refresh_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.auth.credentials_file, Path::new("/tmp/tokens.json"));
        assert_eq!(config.auth.username.as_deref(), Some("alice"));
    }

    #[test]
    fn relative_credentials_file_resolves_next_to_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let contents = format!("{MINIMAL}\n[auth]\ncredentials_file = \"state/session.json\"\n");

        let config = Config::load(&write_config(&dir, &contents)).unwrap();
        assert_eq!(
            config.auth.credentials_file,
            dir.path().join("state/session.json")
        );
    }

    #[test]
    fn in_memory_store_is_opt_in() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let contents = format!("{MINIMAL}\n[auth]\nin_memory = true\n");

        let config = Config::load(&write_config(&dir, &contents)).unwrap();
        assert!(config.auth.in_memory);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load(Path::new("/nonexistent/dashboard-client.toml")).is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&write_config(&dir, "[api\nbase_url ="));
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn base_url_without_scheme_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&write_config(
            &dir,
            "[api]\nbase_url = \"127.0.0.1:8000\"\n",
        ))
        .unwrap_err();
        assert!(
            err.to_string().contains("base_url must start with http"),
            "got: {err}"
        );
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let zero_timeout = format!("{MINIMAL}timeout_secs = 0\n");
        assert!(Config::load(&write_config(&dir, &zero_timeout)).is_err());

        let zero_refresh = format!("{MINIMAL}\n[auth]\nrefresh_timeout_secs = 0\n");
        assert!(Config::load(&write_config(&dir, &zero_refresh)).is_err());
    }

    #[test]
    fn api_url_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        unsafe { set_env("DASHBOARD_API_URL", "https://staging.example.com") };
        let config = Config::load(&write_config(&dir, MINIMAL)).unwrap();
        clean_env();

        assert_eq!(config.api.base_url, "https://staging.example.com");
    }

    #[test]
    fn password_from_file_is_trimmed() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let pw_path = dir.path().join("password");
        std::fs::write(&pw_path, "s3cret\n").unwrap();
        let contents = format!("{MINIMAL}\n[auth]\npassword_file = \"{}\"\n", pw_path.display());

        let config = Config::load(&write_config(&dir, &contents)).unwrap();
        assert_eq!(config.auth.password.as_ref().unwrap().expose(), "s3cret");
    }

    #[test]
    fn password_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let contents = format!("{MINIMAL}\n[auth]\npassword_file = \"/nonexistent/password\"\n");

        unsafe { set_env("DASHBOARD_PASSWORD", "from-env") };
        let config = Config::load(&write_config(&dir, &contents)).unwrap();
        clean_env();

        assert_eq!(config.auth.password.as_ref().unwrap().expose(), "from-env");
    }

    #[test]
    fn blank_password_file_yields_none() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let pw_path = dir.path().join("password");
        std::fs::write(&pw_path, "  \n").unwrap();
        let contents = format!("{MINIMAL}\n[auth]\npassword_file = \"{}\"\n", pw_path.display());

        let config = Config::load(&write_config(&dir, &contents)).unwrap();
        assert!(config.auth.password.is_none());
    }

    #[test]
    fn missing_password_file_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let contents = format!("{MINIMAL}\n[auth]\npassword_file = \"/nonexistent/password\"\n");
        assert!(Config::load(&write_config(&dir, &contents)).is_err());
    }

    #[test]
    fn resolve_path_prefers_cli_then_env_then_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/dashboard.toml") };
        assert_eq!(
            Config::resolve_path(Some("/cli/dashboard.toml")),
            PathBuf::from("/cli/dashboard.toml")
        );
        assert_eq!(
            Config::resolve_path(None),
            PathBuf::from("/env/dashboard.toml")
        );
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(
            Config::resolve_path(None),
            PathBuf::from("dashboard-client.toml")
        );
    }
}
