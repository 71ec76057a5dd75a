use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::transport::MeetingRef;

/// Request body for creating a bot. Field names follow the bot manager API.
#[derive(Debug, Serialize)]
struct BotRequest<'a> {
    platform: &'a str,
    native_meeting_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bot_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

/// One running bot as reported by the manager.
#[derive(Debug, Clone, Deserialize)]
pub struct BotStatus {
    pub platform: Option<String>,
    #[serde(alias = "native_id")]
    pub native_meeting_id: Option<String>,
    pub status: Option<String>,
}

/// The bot lifecycle service, behind a trait so the engine can be exercised
/// without a live manager.
#[async_trait]
pub trait BotLifecycle {
    /// Ask the manager to send a bot into the meeting. A manager-side `409`
    /// means a bot is already there, which is a distinct condition rather
    /// than a failure.
    async fn request_bot(&self, meeting: &MeetingRef) -> Result<()>;

    async fn stop_bot(&self, meeting: &MeetingRef) -> Result<()>;

    async fn running_bots(&self) -> Result<Vec<BotStatus>>;
}

/// HTTP client for the bot manager.
pub struct BotClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    bot_name: Option<String>,
    language: Option<String>,
}

impl BotClient {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bot_name: config.bot_name.clone(),
            language: config.language.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-Key", key);
        }
        builder
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(Error::BotAlreadyJoined);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::BotService {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl BotLifecycle for BotClient {
    async fn request_bot(&self, meeting: &MeetingRef) -> Result<()> {
        let body = BotRequest {
            platform: &meeting.platform,
            native_meeting_id: &meeting.native_id,
            bot_name: self.bot_name.as_deref(),
            language: self.language.as_deref(),
        };

        let response = self
            .request(reqwest::Method::POST, "/bots")
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        info!("bot requested for {}", meeting.key());
        Ok(())
    }

    async fn stop_bot(&self, meeting: &MeetingRef) -> Result<()> {
        let path = format!("/bots/{}/{}", meeting.platform, meeting.native_id);
        let response = self.request(reqwest::Method::DELETE, &path).send().await?;
        Self::check(response).await?;
        info!("bot stopped for {}", meeting.key());
        Ok(())
    }

    async fn running_bots(&self) -> Result<Vec<BotStatus>> {
        let response = self
            .request(reqwest::Method::GET, "/bots/status")
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}
