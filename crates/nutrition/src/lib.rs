use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://my.smoothiefroot.com/api/fruit";

/// Opaque per-fruit payload returned by the lookup service.
pub type NutritionRecord = serde_json::Value;

#[derive(Debug, Error)]
pub enum NutritionFailure {
    /// The service answered with anything other than `200 OK`.
    #[error("nutrition service answered with status {status}")]
    Status { status: u16 },
    /// The request never produced a usable answer.
    #[error("{0}")]
    Transport(String),
}

impl NutritionFailure {
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

#[async_trait]
pub trait NutritionLookup: Send + Sync {
    async fn fetch_nutrition(&self, search_key: &str) -> Result<NutritionRecord, NutritionFailure>;
}

#[derive(Debug, Error)]
#[error("invalid nutrition base url '{url}': {reason}")]
pub struct InvalidBaseUrl {
    pub url: String,
    pub reason: String,
}

/// HTTP client for `GET {base}/{search_key}`. One attempt per call, with the
/// transport's default timeouts.
#[derive(Clone)]
pub struct NutritionClient {
    http: Client,
    base_url: Url,
}

impl NutritionClient {
    pub fn new(base_url: &str) -> Result<Self, InvalidBaseUrl> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, InvalidBaseUrl> {
        let invalid = |reason: &str| InvalidBaseUrl {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };
        let base_url = Url::parse(base_url.trim()).map_err(|e| invalid(&e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("url cannot carry a path"));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url_for(&self, search_key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(search_key);
        }
        url
    }
}

#[async_trait]
impl NutritionLookup for NutritionClient {
    async fn fetch_nutrition(&self, search_key: &str) -> Result<NutritionRecord, NutritionFailure> {
        let url = self.url_for(search_key);
        let response = self.http.get(url.clone()).send().await.map_err(|e| {
            warn!(%url, error = %e, "nutrition: request failed");
            NutritionFailure::Transport(e.to_string())
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            info!(%url, status = status.as_u16(), "nutrition: status other than 200");
            return Err(NutritionFailure::Status {
                status: status.as_u16(),
            });
        }

        response.json::<NutritionRecord>().await.map_err(|e| {
            warn!(%url, error = %e, "nutrition: undecodable body");
            NutritionFailure::Transport(e.to_string())
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
