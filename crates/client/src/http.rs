use std::time::{Duration, Instant};

use async_trait::async_trait;
use borealis_core::api::{ApiError, Endpoint, PricingApi, SpaceWeatherApi};
use borealis_core::config::ApiConfig;
use borealis_core::domain::geomag::{DailyGeomag, Portfolio, ThreeDayForecast};
use borealis_core::domain::policy::QuoteRequest;
use borealis_core::domain::quote::QuoteResult;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not build http client: {0}")]
    Build(#[from] reqwest::Error),
    #[error("invalid base url `{0}`: expected http:// or https://")]
    InvalidBaseUrl(String),
}

/// Talks to the backend over JSON/HTTP. Never retries; a failed call is
/// reported once and the caller decides what to do next.
#[derive(Clone)]
pub struct HttpPricingClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for HttpPricingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPricingClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpPricingClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        api_key: Option<SecretString>,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/').to_string();
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: trimmed, timeout, api_key })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ClientError> {
        Self::new(config.base_url.clone(), config.timeout(), config.api_key.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let builder = self.authorize(self.client.get(self.url(endpoint)).query(query));
        self.execute(endpoint, builder).await
    }

    async fn post_json<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self.authorize(self.client.post(self.url(endpoint)).json(body));
        self.execute(endpoint, builder).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let path = endpoint.path();
        let started = Instant::now();
        debug!(event_name = "client.request.sent", endpoint = path, "sending backend request");

        let response =
            builder.send().await.map_err(|error| self.transport_error(path, &error))?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            warn!(
                event_name = "client.request.rejected",
                endpoint = path,
                status = status.as_u16(),
                body = %body,
                "backend returned an error status"
            );
            return Err(ApiError::Status { endpoint: path, status: status.as_u16(), body });
        }

        let text = response.text().await.map_err(|error| self.transport_error(path, &error))?;
        let decoded = serde_json::from_str::<T>(&text)
            .map_err(|error| ApiError::Decode { endpoint: path, message: error.to_string() })?;

        info!(
            event_name = "client.request.completed",
            endpoint = path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend request completed"
        );
        Ok(decoded)
    }

    fn transport_error(&self, endpoint: &'static str, error: &reqwest::Error) -> ApiError {
        if error.is_timeout() {
            warn!(event_name = "client.request.timeout", endpoint, "backend request timed out");
            return ApiError::Timeout { secs: self.timeout.as_secs() };
        }
        warn!(
            event_name = "client.request.failed",
            endpoint,
            error = %error,
            "backend request failed"
        );
        ApiError::Network { endpoint, message: error.to_string() }
    }
}

/// Prefers the `detail` field the backend puts on error responses.
async fn error_body(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => text.trim().to_string(),
        },
        _ => text.trim().to_string(),
    }
}

#[async_trait]
impl PricingApi for HttpPricingClient {
    async fn run_quote(&self, request: &QuoteRequest) -> Result<QuoteResult, ApiError> {
        self.post_json(Endpoint::for_run(request.kind()), request).await
    }
}

#[async_trait]
impl SpaceWeatherApi for HttpPricingClient {
    async fn portfolio(&self) -> Result<Portfolio, ApiError> {
        self.get_json(Endpoint::Portfolio, &[]).await
    }

    async fn daily_geomag(&self, limit: u32) -> Result<DailyGeomag, ApiError> {
        self.get_json(Endpoint::DailyGeomag, &[("limit", limit.to_string())]).await
    }

    async fn forecast_three_day(&self) -> Result<ThreeDayForecast, ApiError> {
        self.get_json(Endpoint::ForecastThreeDay, &[]).await
    }

    async fn health(&self) -> Result<Value, ApiError> {
        self.get_json(Endpoint::Health, &[]).await
    }
}
