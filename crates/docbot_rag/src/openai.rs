use std::time::Duration;

use docbot_core::error::AppError;

/// Connection details shared by the embeddings and chat endpoints of an
/// OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            return Err(AppError::new(
                "PROVIDER_CONFIG_INVALID",
                "API base URL must be http(s)",
            )
            .with_details(format!("base_url={base_url}")));
        }
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::new(
                "PROVIDER_CONFIG_INVALID",
                "API key must not be empty",
            ));
        }
        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn post(&self, path: &str, timeout: Duration) -> ureq::Request {
        ureq::post(&format!("{}/{}", self.base_url, path))
            .timeout(timeout)
            .set("Authorization", &format!("Bearer {}", self.api_key))
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/models", self.base_url);
        let resp = ureq::get(&url)
            .timeout(Duration::from_secs(5))
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .call();

        match resp {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, _)) => Err(AppError::new(
                "PROVIDER_UNHEALTHY",
                "Provider health check failed",
            )
            .with_details(format!("status={status}"))),
            Err(e) => Err(
                AppError::new("PROVIDER_UNREACHABLE", "Failed to reach the provider")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
