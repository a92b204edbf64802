//! Typed dashboard API
//!
//! Every dataset call goes through the `AuthPipeline`, so they all share one
//! credential store and one refresh coordinator. Login, signup and logout
//! write the store directly; they are the flows outside the pipeline that
//! own the session lifecycle.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use auth_pipeline::{AuthPipeline, RefreshCoordinator};
use common::Secret;
use dashboard_auth::{CredentialStore, endpoint};
use dispatch::{DispatchResponse, FilePart, RequestDescriptor, RequestDispatcher};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::{Error, Result};

const UPLOAD_PATH: &str = "/api/datasets/upload/";

/// Client for the dashboard backend.
pub struct DashboardApi {
    base_url: String,
    store: Arc<dyn CredentialStore>,
    dispatcher: Arc<dyn RequestDispatcher>,
    pipeline: AuthPipeline,
}

impl DashboardApi {
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        dispatcher: Arc<dyn RequestDispatcher>,
        refresh_timeout: Option<Duration>,
    ) -> Self {
        let base_url = base_url.into();
        let coordinator =
            RefreshCoordinator::builder(base_url.clone(), store.clone(), dispatcher.clone())
                .timeout(refresh_timeout)
                .build();
        let pipeline = AuthPipeline::new(store.clone(), dispatcher.clone(), coordinator);
        Self {
            base_url,
            store,
            dispatcher,
            pipeline,
        }
    }

    /// Log in and store the returned credential pair.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &Secret<String>) -> Result<()> {
        let pair = dashboard_auth::login(
            self.dispatcher.as_ref(),
            &self.base_url,
            username,
            password.expose(),
        )
        .await?;
        self.store.set(pair.access, Some(pair.refresh)).await?;
        info!("logged in");
        Ok(())
    }

    /// Create an account and store its credential pair.
    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &Secret<String>,
    ) -> Result<()> {
        let pair = dashboard_auth::signup(
            self.dispatcher.as_ref(),
            &self.base_url,
            username,
            email,
            password.expose(),
        )
        .await?;
        self.store.set(pair.access, Some(pair.refresh)).await?;
        info!("account created");
        Ok(())
    }

    /// Forget the stored session.
    pub async fn logout(&self) -> Result<()> {
        self.store.clear().await?;
        info!("logged out");
        Ok(())
    }

    /// Upload a CSV file as a new dataset. Returns the created dataset.
    ///
    /// The multipart body is built once, so a replay after credential
    /// renewal sends exactly the same bytes.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn upload_csv(&self, path: &Path) -> Result<Value> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::MissingInput(format!("file name of {}", path.display())))?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Io(format!("reading {}: {e}", path.display())))?;

        let request = RequestDescriptor::post(endpoint(&self.base_url, UPLOAD_PATH)).with_file_part(
            &FilePart {
                field: "file",
                filename,
                content_type: "text/csv",
                data: &data,
            },
        );
        let response = self.pipeline.send(request).await?;
        info!(bytes = data.len(), "dataset uploaded");
        decode(UPLOAD_PATH, &response)
    }

    pub async fn list_datasets(&self) -> Result<Value> {
        self.get_json("/api/datasets/").await
    }

    pub async fn summary(&self, dataset_id: &str) -> Result<Value> {
        self.get_json(&format!("/api/datasets/{dataset_id}/summary/"))
            .await
    }

    pub async fn table(&self, dataset_id: &str, page: u32, page_size: u32) -> Result<Value> {
        self.get_json(&format!(
            "/api/datasets/{dataset_id}/table/?page={page}&page_size={page_size}"
        ))
        .await
    }

    /// Save the generated PDF report to `dest`. Returns the bytes written.
    pub async fn download_report(&self, dataset_id: &str, dest: &Path) -> Result<usize> {
        self.download(&format!("/api/datasets/{dataset_id}/report/"), dest)
            .await
    }

    /// Save the cleaned CSV to `dest`. Returns the bytes written.
    pub async fn download_clean_csv(&self, dataset_id: &str, dest: &Path) -> Result<usize> {
        self.download(&format!("/api/datasets/{dataset_id}/download_clean/"), dest)
            .await
    }

    async fn get(&self, path: &str) -> Result<DispatchResponse> {
        let request = RequestDescriptor::get(endpoint(&self.base_url, path));
        Ok(self.pipeline.send(request).await?)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.get(path).await?;
        decode(path, &response)
    }

    async fn download(&self, path: &str, dest: &Path) -> Result<usize> {
        let response = self.get(path).await?;
        tokio::fs::write(dest, &response.body)
            .await
            .map_err(|e| Error::Io(format!("writing {}: {e}", dest.display())))?;
        info!(path, dest = %dest.display(), bytes = response.body.len(), "download saved");
        Ok(response.body.len())
    }
}

fn decode(path: &str, response: &DispatchResponse) -> Result<Value> {
    serde_json::from_slice(&response.body).map_err(|e| Error::Decode(format!("{path}: {e}")))
}
