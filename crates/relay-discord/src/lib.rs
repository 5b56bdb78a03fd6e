//! Discord adapter (REST, reqwest).
//!
//! Implements the `relay-core` source and transport ports over the Discord
//! HTTP API. No gateway connection is opened.

use std::time::Duration;

use async_trait::async_trait;

mod http;
pub mod webhook;
mod wire;

use relay_core::{
    domain::{ChannelId, WebhookUrl},
    errors::Error,
    messaging::{
        port::{MessageSource, RelayTransport, WebhookHandle},
        types::{FetchQuery, RawMessage, RelayPayload},
    },
    Result,
};

use crate::{http::execute, webhook::DiscordWebhook};

const USER_AGENT: &str = concat!("DiscordBot (relay, ", env!("CARGO_PKG_VERSION"), ")");

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: String,
    /// e.g. `https://discord.com/api/v10`, no trailing slash.
    pub api_base: String,
    pub timeout: Duration,
}

impl DiscordConfig {
    pub fn from_config(cfg: &relay_core::config::Config) -> Self {
        Self {
            token: cfg.discord_token.clone(),
            api_base: cfg.api_base.clone(),
            timeout: cfg.http_timeout,
        }
    }
}

#[derive(Clone)]
pub struct DiscordClient {
    cfg: DiscordConfig,
    http: reqwest::Client,
}

impl DiscordClient {
    pub fn new(cfg: DiscordConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::External(format!("discord client build error: {e}")))?;
        Ok(Self { cfg, http })
    }

    fn messages_url(&self, channel: &ChannelId) -> String {
        format!(
            "{}/channels/{}/messages",
            self.cfg.api_base.trim_end_matches('/'),
            channel
        )
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.cfg.token)
    }
}

#[async_trait]
impl MessageSource for DiscordClient {
    async fn fetch_messages(
        &self,
        channel: &ChannelId,
        query: FetchQuery,
    ) -> Result<Vec<RawMessage>> {
        let url = self.messages_url(channel);
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(after) = query.after {
            params.push(("after", after.to_string()));
        }

        let what = format!("fetch channel {channel}");
        let resp = execute(&what, || {
            self.http
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, self.auth())
                .query(&params)
        })
        .await?;

        let body = resp
            .text()
            .await
            .map_err(|e| Error::External(format!("{what}: body read error: {e}")))?;
        wire::parse_messages(&body).map_err(|e| Error::External(format!("{what}: {e:#}")))
    }
}

#[async_trait]
impl RelayTransport for DiscordClient {
    async fn post_to_channel(&self, channel: &ChannelId, payload: &RelayPayload) -> Result<()> {
        let url = self.messages_url(channel);
        let what = format!("post channel {channel}");
        execute(&what, || {
            self.http
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, self.auth())
                .json(payload)
        })
        .await?;
        Ok(())
    }

    async fn open_webhook(&self, url: &WebhookUrl) -> Result<Box<dyn WebhookHandle>> {
        let hook = DiscordWebhook::open(&self.cfg.api_base, url, self.cfg.timeout)?;
        Ok(Box::new(hook))
    }
}
