use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Thin authenticated client for the Discord REST API.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    retry_after: f64,
}

impl RestClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, call: &str) -> Result<T> {
        let body = self.send::<()>(Method::GET, path, None, call).await?;
        serde_json::from_str(&body).with_context(|| format!("discord {call} decode failed"))
    }

    pub async fn put<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
        call: &str,
    ) -> Result<T> {
        let body = self.send(Method::PUT, path, Some(payload), call).await?;
        serde_json::from_str(&body).with_context(|| format!("discord {call} decode failed"))
    }

    pub async fn post<B: Serialize + Sync>(&self, path: &str, payload: &B, call: &str) -> Result<()> {
        self.send(Method::POST, path, Some(payload), call).await?;
        Ok(())
    }

    /// Sends one request, sleeping out 429 responses, and returns the response body.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&B>,
        call: &str,
    ) -> Result<String> {
        let url = self.url(path);
        let mut attempts = 0;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .header("Authorization", self.auth_header());
            if let Some(payload) = payload {
                request = request.json(payload);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("discord {call} request failed"))?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                attempts += 1;
                if attempts > MAX_RATE_LIMIT_RETRIES {
                    return Err(anyhow!("discord {call} still rate limited after {attempts} attempts"));
                }
                let retry = response
                    .json::<RateLimitResponse>()
                    .await
                    .ok()
                    .map(|value| value.retry_after)
                    .unwrap_or(1.0);
                warn!(call = %call, retry_after = retry, "discord rate limited");
                tokio::time::sleep(Duration::from_secs_f64(retry.max(0.1))).await;
                continue;
            }

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!("discord {call} failed ({status}): {body}"));
            }

            return Ok(body);
        }
    }
}
