//! Thin reqwest client for the StreamSure HTTP API.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use streamsure_api::constants::API_PREFIX;
use streamsure_core::models::{AssetResponse, ReviewAction};
use uuid::Uuid;

pub struct ApiClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Reads STREAMSURE_API_URL (default http://localhost:3000) and STREAMSURE_TOKEN.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("STREAMSURE_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let token = std::env::var("STREAMSURE_TOKEN")
            .context("STREAMSURE_TOKEN must be set (see `streamsure token`)")?;
        Ok(Self::new(base_url, token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        Err(anyhow!("{} ({})", message, status))
    }

    pub async fn list_assets(&self) -> Result<Vec<AssetResponse>> {
        let response = self
            .authorized(self.http.get(self.url("/assets")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn get_asset(&self, id: Uuid) -> Result<AssetResponse> {
        let response = self
            .authorized(self.http.get(self.url(&format!("/assets/{}", id))))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn review_asset(
        &self,
        id: Uuid,
        action: ReviewAction,
        notes: Option<String>,
    ) -> Result<AssetResponse> {
        let response = self
            .authorized(self.http.put(self.url(&format!("/assets/{}/review", id))))
            .json(&json!({ "action": action, "notes": notes }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn delete_asset(&self, id: Uuid) -> Result<()> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("/assets/{}", id))))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
