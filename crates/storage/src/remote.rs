use async_trait::async_trait;
use portal_core::model::{Progress, UserId};
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::repository::{ProgressOwner, ProgressRepository, StorageError};

/// Configuration for the remote progress API.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Reads `PORTAL_API_URL`; returns `None` when unset or blank, in which
    /// case registered accounts fall back to local persistence.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("PORTAL_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self::new(base_url))
    }
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    #[serde(default)]
    success: bool,
}

/// Thin client for the progress endpoints of the portal API.
#[derive(Clone)]
pub struct ProgressApi {
    client: Client,
    base_url: String,
}

impl ProgressApi {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url,
        }
    }

    fn progress_url(&self, user: &UserId) -> String {
        format!("{}/api/progress/{user}", self.base_url)
    }

    /// `GET /api/progress/:userId`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` on transport or status failures and
    /// `StorageError::Serialization` if the body cannot be decoded.
    pub async fn fetch_progress(&self, user: &UserId) -> Result<Progress, StorageError> {
        let response = self
            .client
            .get(self.progress_url(user))
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Connection(format!(
                "progress fetch returned {status}"
            )));
        }

        response
            .json::<Progress>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// `POST /api/progress/:userId`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` on transport or status failures, or
    /// when the server does not acknowledge the save.
    pub async fn push_progress(
        &self,
        user: &UserId,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.progress_url(user))
            .json(progress)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Connection(format!(
                "progress save returned {status}"
            )));
        }

        let body = response
            .json::<SaveResponse>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        if !body.success {
            return Err(StorageError::Connection(
                "progress save was not acknowledged".to_string(),
            ));
        }
        Ok(())
    }
}

/// Adapter putting the remote API behind the `ProgressRepository` contract.
///
/// This is the backend for registered accounts; it is never constructed for
/// demo or anonymous identities.
#[derive(Clone)]
pub struct RemoteProgressRepository {
    api: ProgressApi,
}

impl RemoteProgressRepository {
    #[must_use]
    pub fn new(api: ProgressApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProgressRepository for RemoteProgressRepository {
    async fn get_progress(&self, owner: &ProgressOwner) -> Result<Progress, StorageError> {
        match owner {
            ProgressOwner::Anonymous => Err(StorageError::NotFound),
            ProgressOwner::User(id) => self.api.fetch_progress(id).await,
        }
    }

    async fn save_progress(
        &self,
        owner: &ProgressOwner,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        match owner {
            ProgressOwner::Anonymous => Err(StorageError::NotFound),
            ProgressOwner::User(id) => self.api.push_progress(id, progress).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_config_trims_trailing_slashes() {
        let config = ApiConfig::new("https://portal.example.com/");
        assert_eq!(config.base_url, "https://portal.example.com");
    }

    #[test]
    fn progress_urls_follow_the_api_contract() {
        let api = ProgressApi::new(ApiConfig::new("https://portal.example.com"));
        assert_eq!(
            api.progress_url(&UserId::new("u-1")),
            "https://portal.example.com/api/progress/u-1"
        );
    }

    #[tokio::test]
    async fn unreachable_api_reports_connection_error() {
        // Nothing listens on the discard port, so the connect is refused.
        let api = ProgressApi::new(ApiConfig::new("http://127.0.0.1:9"));
        let err = api.fetch_progress(&UserId::new("u-1")).await.unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
