//! HTTP client for the remote draft/entity store

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{
    Activity, ActivityPatch, Draft, DraftHandle, DraftStore, SaveAck, StoreError,
    WizardStateSnapshot,
};
use crate::activity::ActivityType;
use crate::config::StoreConfig;

/// reqwest-backed [`DraftStore`] implementation.
///
/// Maps the store's distinguished responses onto the error taxonomy:
/// 410 Gone is an expired draft, 404 a missing entity.
pub struct HttpDraftStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDraftStore {
    /// Build a client from the store configuration
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        if config.base_url.trim().is_empty() {
            return Err(StoreError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .user_agent("migration-wizard/0.1.0")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StoreError::network(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Decode a response, translating error statuses into the taxonomy
    async fn decode<T: DeserializeOwned>(
        response: Response,
        activity_id: &str,
    ) -> Result<T, StoreError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| StoreError::decode(e.to_string()));
        }

        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::GONE => Err(StoreError::expired(activity_id)),
            StatusCode::NOT_FOUND => Err(StoreError::not_found(activity_id)),
            _ => Err(StoreError::Http {
                status: status.as_u16(),
                message,
            }),
        }
    }

    fn transport(e: reqwest::Error) -> StoreError {
        StoreError::network(e.to_string())
    }
}

#[async_trait]
impl DraftStore for HttpDraftStore {
    async fn start(
        &self,
        name: &str,
        activity_type: ActivityType,
    ) -> Result<DraftHandle, StoreError> {
        debug!(name, %activity_type, "creating draft");
        let response = self
            .client
            .post(self.url("/activities/drafts"))
            .json(&json!({ "name": name, "activity_type": activity_type }))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::decode(response, "").await
    }

    async fn save_progress(
        &self,
        activity_id: &str,
        state: &WizardStateSnapshot,
    ) -> Result<SaveAck, StoreError> {
        debug!(activity_id, current_step = state.current_step, "saving draft progress");
        let response = self
            .client
            .put(self.url(&format!("/activities/drafts/{activity_id}/progress")))
            .json(state)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::decode(response, activity_id).await
    }

    async fn get_draft(&self, activity_id: &str) -> Result<Draft, StoreError> {
        debug!(activity_id, "fetching draft");
        let response = self
            .client
            .get(self.url(&format!("/activities/drafts/{activity_id}")))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::decode(response, activity_id).await
    }

    async fn complete_draft(
        &self,
        activity_id: &str,
        state: &WizardStateSnapshot,
    ) -> Result<Activity, StoreError> {
        debug!(activity_id, "completing draft");
        let response = self
            .client
            .post(self.url(&format!("/activities/drafts/{activity_id}/complete")))
            .json(state)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::decode(response, activity_id).await
    }

    async fn get_entity(&self, activity_id: &str) -> Result<Activity, StoreError> {
        debug!(activity_id, "fetching activity");
        let response = self
            .client
            .get(self.url(&format!("/activities/{activity_id}")))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::decode(response, activity_id).await
    }

    async fn update_entity(
        &self,
        activity_id: &str,
        patch: &ActivityPatch,
    ) -> Result<Activity, StoreError> {
        debug!(activity_id, "updating activity");
        let response = self
            .client
            .patch(self.url(&format!("/activities/{activity_id}")))
            .json(patch)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::decode(response, activity_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_base_url() {
        let config = StoreConfig {
            base_url: String::new(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            HttpDraftStore::new(&config),
            Err(StoreError::NotConfigured)
        ));
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let config = StoreConfig {
            base_url: "https://planner.internal/api/".to_string(),
            ..StoreConfig::default()
        };
        let store = HttpDraftStore::new(&config).unwrap();
        assert_eq!(
            store.url("/activities/drafts"),
            "https://planner.internal/api/activities/drafts"
        );
    }
}
