//! Chat-completion classifier backed by an OpenAI-compatible endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use super::error::ClassifyError;
use super::Classifier;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const PRE_FILTER_PROMPT: &str = "Determine if this email snippet is related to a job application \
(e.g., application confirmation, rejection, interview invite, offer). Return only 'Yes' or 'No'.";

const EXTRACTION_PROMPT: &str = "You are an expert at analyzing job application emails. \
Analyze this email and confirm if it's a job application-related email \
(e.g., confirmation, rejection, interview invite). \
If not, return only: 'Not Job Application'. \
If yes, extract: \
1. Company name (infer from context if not explicit, else 'Unknown'), \
2. Job title (infer from context if not explicit, else 'Unknown'), \
3. Location (if not found, return 'Unknown'), \
4. Status (one of: Applied, Screening, Interviewing, Offer, Declined, Withdrawn). \
Return in this format:\n\
Company: [company name]\n\
Job Title: [job title]\n\
Location: [location]\n\
Status: [status]\n";

/// Classifier over an OpenAI-style `/chat/completions` endpoint.
pub struct OpenAiClassifier {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, ClassifyError> {
        let url = format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::Connection(e.to_string()))?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ClassifyError::RateLimited(format!("status {status}")));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ClassifyError::Auth(format!("status {status}")));
            }
            StatusCode::BAD_REQUEST => {
                return Err(ClassifyError::InvalidRequest(format!("status {status}")));
            }
            s if s.is_server_error() => {
                return Err(ClassifyError::Connection(format!("status {status}")));
            }
            _ => {
                return Err(ClassifyError::UnexpectedResponse(format!(
                    "status {status}"
                )));
            }
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::UnexpectedResponse(e.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                ClassifyError::UnexpectedResponse("no message content in completion".to_string())
            })
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn is_job_related(&self, snippet: &str) -> Result<bool, ClassifyError> {
        let answer = self.chat(PRE_FILTER_PROMPT, snippet, 10).await?;
        let job_related = answer.trim().eq_ignore_ascii_case("yes");
        debug!(job_related, "Pre-filter verdict");
        Ok(job_related)
    }

    async fn classify(&self, content: &str) -> Result<String, ClassifyError> {
        self.chat(EXTRACTION_PROMPT, content, 200).await
    }
}
