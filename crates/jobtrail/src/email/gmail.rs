//! Thin Gmail REST client implementing [`EmailProvider`].
//!
//! Read-only access over the `users/me/messages` endpoints with a bearer
//! token. Token acquisition (OAuth flow, refresh) is outside this client;
//! it is handed a ready access token.

use async_trait::async_trait;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{Duration, TimeZone, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use super::error::FetchError;
use super::{EmailContent, EmailProvider};

pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Gmail REST API client.
pub struct GmailClient {
    http: reqwest::Client,
    access_token: SecretString,
    base_url: String,
}

impl GmailClient {
    pub fn new(access_token: SecretString) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(access_token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            base_url: base_url.into(),
        }
    }

    async fn get_json(&self, path_and_query: &str) -> Result<Value, FetchError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path_and_query
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FetchError::Auth(format!("status {status}")));
            }
            StatusCode::NOT_FOUND => {
                return Err(FetchError::NotFound(format!("status {status}")));
            }
            s if s.is_server_error() => {
                return Err(FetchError::Provider(format!("status {status}")));
            }
            _ => {
                return Err(FetchError::Provider(format!("status {status}")));
            }
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl EmailProvider for GmailClient {
    async fn list_messages(
        &self,
        lookback_hours: Option<u32>,
        max_results: usize,
    ) -> Result<Vec<String>, FetchError> {
        let ids = collect_message_ids(max_results, |page_size, page_token| {
            let query = list_query(lookback_hours, page_size, page_token.as_deref());
            async move { self.get_json(&query).await }
        })
        .await?;

        debug!(count = ids.len(), "Listed candidate messages");
        Ok(ids)
    }

    async fn preview(&self, message_id: &str) -> Result<String, FetchError> {
        let payload = self
            .get_json(&format!("users/me/messages/{message_id}?format=minimal"))
            .await?;
        Ok(payload["snippet"].as_str().unwrap_or_default().to_string())
    }

    async fn fetch(&self, message_id: &str) -> Result<EmailContent, FetchError> {
        let payload = self
            .get_json(&format!("users/me/messages/{message_id}?format=full"))
            .await?;

        let thread_id = payload["threadId"].as_str().map(String::from);
        let timestamp = payload["internalDate"]
            .as_str()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        let from = header_value(&payload["payload"], "From").unwrap_or_default();
        let subject = header_value(&payload["payload"], "Subject").unwrap_or_default();
        let body = extract_body_text(&payload["payload"]).unwrap_or_default();

        Ok(EmailContent {
            text: format!("From: {from}\nSubject: {subject}\n\n{body}"),
            timestamp,
            thread_id,
        })
    }
}

/// Drives the paged listing: keeps requesting pages with the continuation
/// token until the id budget is filled or the pages run out.
async fn collect_message_ids<F, Fut>(
    max_results: usize,
    mut fetch_page: F,
) -> Result<Vec<String>, FetchError>
where
    F: FnMut(usize, Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<Value, FetchError>>,
{
    let mut ids: Vec<String> = Vec::new();
    let mut page_token: Option<String> = None;

    while ids.len() < max_results {
        let payload = fetch_page(max_results - ids.len(), page_token.take()).await?;
        let (page_ids, next_token) = parse_list_page(&payload);
        ids.extend(page_ids);

        match next_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }
    ids.truncate(max_results);
    Ok(ids)
}

/// Path and query for one page of the message listing.
fn list_query(
    lookback_hours: Option<u32>,
    page_size: usize,
    page_token: Option<&str>,
) -> String {
    let mut query = format!("users/me/messages?labelIds=INBOX&maxResults={page_size}");
    if let Some(hours) = lookback_hours {
        query.push_str(&format!("&q={}", after_query(hours)));
    }
    if let Some(token) = page_token {
        query.push_str(&format!("&pageToken={token}"));
    }
    query
}

/// Splits a listing response into its message ids and the continuation
/// token, when the listing has further pages.
fn parse_list_page(payload: &Value) -> (Vec<String>, Option<String>) {
    let ids = payload["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m["id"].as_str().map(String::from))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let next_token = payload["nextPageToken"].as_str().map(String::from);
    (ids, next_token)
}

/// Gmail search term for the lookback window (`after:` takes a date).
fn after_query(lookback_hours: u32) -> String {
    let threshold = Utc::now() - Duration::hours(i64::from(lookback_hours));
    format!("after:{}", threshold.format("%Y/%m/%d"))
}

/// Walks the MIME payload tree for the first `text/plain` part.
fn extract_body_text(payload: &Value) -> Option<String> {
    if payload["mimeType"].as_str() == Some("text/plain") {
        if let Some(data) = payload["body"]["data"].as_str() {
            if let Some(text) = decode_body(data) {
                return Some(text);
            }
        }
    }

    if let Some(parts) = payload["parts"].as_array() {
        for part in parts {
            if let Some(text) = extract_body_text(part) {
                return Some(text);
            }
        }
    }

    None
}

/// Gmail bodies are base64url, with or without padding depending on the part.
fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn header_value(payload: &Value, name: &str) -> Option<String> {
    payload["headers"].as_array()?.iter().find_map(|header| {
        let matches = header["name"]
            .as_str()
            .is_some_and(|n| n.eq_ignore_ascii_case(name));
        if matches {
            header["value"].as_str().map(String::from)
        } else {
            None
        }
    })
}
