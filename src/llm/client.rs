use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::dto::{
    CoverLetterRequest, CoverLetterResponse, KeywordsRequest, KeywordsResponse, SummaryRequest,
    SummaryResponse,
};
use crate::config::LlmConfig;
use crate::errors::AppError;

const KEYWORDS_PATH: &str = "/resume/keywords";
const SUMMARY_PATH: &str = "/resume/summary";
const COVER_LETTER_PATH: &str = "/resume/cover-letter";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider API key is not configured")]
    MissingApiKey,
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Api { status, message } => AppError::Llm { status, message },
            LlmError::Http(e) => {
                let status = if e.is_timeout() { 504 } else { 502 };
                AppError::Llm {
                    status,
                    message: e.to_string(),
                }
            }
            LlmError::MissingApiKey => {
                error!("LLM_API_KEY is not set");
                AppError::Internal(anyhow::anyhow!(LlmError::MissingApiKey))
            }
        }
    }
}

/// Client for the external text-generation service. No retries: a failed
/// call surfaces to the caller as-is.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_key_header: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_key_header: config.api_key_header.clone(),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, LlmError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if self.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(self.api_key_header.as_str(), &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%status, path, "provider returned an error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = response.json::<T>().await?;
        debug!(path, "provider call succeeded");
        Ok(parsed)
    }

    pub async fn extract_keywords(
        &self,
        req: &KeywordsRequest,
    ) -> Result<KeywordsResponse, LlmError> {
        self.post(KEYWORDS_PATH, req).await
    }

    pub async fn summary(&self, req: &SummaryRequest) -> Result<SummaryResponse, LlmError> {
        self.post(SUMMARY_PATH, req).await
    }

    pub async fn cover_letter(
        &self,
        req: &CoverLetterRequest,
    ) -> Result<CoverLetterResponse, LlmError> {
        self.post(COVER_LETTER_PATH, req).await
    }
}
