//! Credential storage for the access/refresh pair
//!
//! `CredentialStore` is the single source of truth for the current session.
//! The auth pipeline only reads it; the refresh coordinator writes the access
//! half after a renewal and clears everything when renewal fails. Login and
//! logout flows write and clear it from outside the pipeline.
//!
//! Two backends are provided: an in-memory store for ephemeral sessions and
//! tests, and a JSON file store that survives restarts. Values are opaque;
//! no validation or expiry bookkeeping happens here.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Boxed future returned by `CredentialStore` methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The current session credentials.
///
/// A refresh credential without an access credential is a valid state (fresh
/// login before the first access token is minted). An access credential
/// without a refresh credential can be attached to requests but cannot be
/// renewed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh,
        }
    }

    /// True when neither half is present.
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CredentialPair")
            .field("access", &redact(&self.access))
            .field("refresh", &redact(&self.refresh))
            .finish()
    }
}

/// Capability interface over wherever the credential pair lives.
///
/// Uses boxed futures so the pipeline can hold an `Arc<dyn CredentialStore>`
/// and tests can swap backends freely.
pub trait CredentialStore: Send + Sync {
    /// Current pair, or `None` when the store is empty.
    fn get(&self) -> StoreFuture<'_, Option<CredentialPair>>;

    /// Replace the whole pair (login, signup).
    fn set(&self, access: String, refresh: Option<String>) -> StoreFuture<'_, Result<()>>;

    /// Replace only the access half, keeping the refresh credential (post-refresh).
    fn set_access(&self, access: String) -> StoreFuture<'_, Result<()>>;

    /// Forget both halves (logout, unrecoverable refresh failure).
    fn clear(&self) -> StoreFuture<'_, Result<()>>;
}

fn non_empty(pair: &CredentialPair) -> Option<CredentialPair> {
    if pair.is_empty() {
        None
    } else {
        Some(pair.clone())
    }
}

/// Process-local store. Survives for the lifetime of the value.
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<CredentialPair>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `pair`.
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            state: Mutex::new(pair),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> StoreFuture<'_, Option<CredentialPair>> {
        Box::pin(async move { non_empty(&*self.state.lock().await) })
    }

    fn set(&self, access: String, refresh: Option<String>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.state.lock().await = CredentialPair::new(access, refresh);
            Ok(())
        })
    }

    fn set_access(&self, access: String) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            self.state.lock().await.access = Some(access);
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.state.lock().await = CredentialPair::default();
            Ok(())
        })
    }
}

/// JSON file store that survives restarts.
///
/// The file is read once at load time and mirrored in memory, so reads never
/// touch the disk. Every write persists with an atomic temp-file + rename.
/// The Mutex serializes writers so a refresh and a logout cannot interleave
/// their file writes.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<CredentialPair>,
}

impl FileCredentialStore {
    /// Load credentials from `path`.
    ///
    /// A missing file means "not logged in" and yields an empty store; the
    /// file is only created on the first write. A file that exists but does
    /// not parse is an error rather than a silent logout.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::Io(format!("checking credential file: {e}")))?
        {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let pair: CredentialPair = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(
                path = %path.display(),
                has_access = pair.access.is_some(),
                has_refresh = pair.refresh.is_some(),
                "loaded credentials"
            );
            pair
        } else {
            info!(path = %path.display(), "credential file not found, starting logged out");
            CredentialPair::default()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> StoreFuture<'_, Option<CredentialPair>> {
        Box::pin(async move { non_empty(&*self.state.lock().await) })
    }

    fn set(&self, access: String, refresh: Option<String>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let next = CredentialPair::new(access, refresh);
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!("stored credential pair");
            Ok(())
        })
    }

    fn set_access(&self, access: String) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let next = CredentialPair {
                access: Some(access),
                refresh: state.refresh.clone(),
            };
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!("stored refreshed access credential");
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(format!("removing credential file: {e}"))),
            }
            *state = CredentialPair::default();
            debug!(path = %self.path.display(), "cleared credentials");
            Ok(())
        })
    }
}

/// Write the pair to `path` atomically.
///
/// Writes a sibling temp file, restricts it to 0600 on unix (it holds bearer
/// credentials), then renames it over the target.
async fn write_atomic(path: &Path, pair: &CredentialPair) -> Result<()> {
    let json = serde_json::to_string_pretty(pair)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating credential directory: {e}")))?;
    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
