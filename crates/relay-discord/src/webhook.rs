use std::{sync::OnceLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;

use relay_core::{
    domain::WebhookUrl,
    errors::Error,
    messaging::{port::WebhookHandle, types::RelayPayload},
    Result,
};

use crate::http::execute;

/// `id` and `token` of a Discord webhook URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookCredentials {
    pub id: String,
    pub token: String,
}

fn webhook_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/webhooks/(?P<id>\d+)/(?P<token>[A-Za-z0-9_.\-]+)/?(?:\?.*)?$")
            .expect("valid regex")
    })
}

pub fn parse_webhook_url(url: &WebhookUrl) -> Result<WebhookCredentials> {
    let caps = webhook_re().captures(url.as_str()).ok_or_else(|| {
        Error::External(format!("not a Discord webhook URL: {}", url.redacted()))
    })?;
    Ok(WebhookCredentials {
        id: caps["id"].to_string(),
        token: caps["token"].to_string(),
    })
}

/// Webhook client scoped to one delivery. Owns its own HTTP client, which
/// `close` drops.
pub struct DiscordWebhook {
    http: Option<reqwest::Client>,
    endpoint: String,
    label: String,
}

impl DiscordWebhook {
    pub fn open(api_base: &str, url: &WebhookUrl, timeout: Duration) -> Result<Self> {
        let creds = parse_webhook_url(url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("webhook client build error: {e}")))?;

        Ok(Self {
            http: Some(http),
            endpoint: format!(
                "{}/webhooks/{}/{}?wait=true",
                api_base.trim_end_matches('/'),
                creds.id,
                creds.token
            ),
            label: url.redacted(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl WebhookHandle for DiscordWebhook {
    async fn send(&mut self, payload: &RelayPayload) -> Result<()> {
        let Some(http) = self.http.as_ref() else {
            return Err(Error::External(format!("webhook {} already closed", self.label)));
        };
        let what = format!("webhook {}", self.label);
        execute(&what, || http.post(&self.endpoint).json(payload)).await?;
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.http.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> WebhookUrl {
        WebhookUrl(s.to_string())
    }

    #[test]
    fn parses_id_and_token() {
        let c = parse_webhook_url(&url(
            "https://discord.com/api/webhooks/123456/AbC_d-e.f",
        ))
        .unwrap();
        assert_eq!(c.id, "123456");
        assert_eq!(c.token, "AbC_d-e.f");

        let c = parse_webhook_url(&url(
            "https://discord.com/api/webhooks/1/tok/?thread_id=5",
        ))
        .unwrap();
        assert_eq!(c.token, "tok");
    }

    #[test]
    fn rejects_incomplete_urls() {
        for bad in [
            "https://discord.com/api/webhooks/",
            "https://discord.com/api/webhooks/abc/tok",
            "https://discord.com/api/webhooks/123",
        ] {
            let err = parse_webhook_url(&url(bad)).unwrap_err();
            assert!(matches!(err, Error::External(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn endpoint_goes_through_api_base() {
        let hook = DiscordWebhook::open(
            "https://discord.com/api/v10/",
            &url("https://discord.com/api/webhooks/7/tok"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            hook.endpoint(),
            "https://discord.com/api/v10/webhooks/7/tok?wait=true"
        );
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let hook = DiscordWebhook::open(
            "http://127.0.0.1:9",
            &url("https://discord.com/api/webhooks/7/tok"),
            Duration::from_secs(1),
        )
        .unwrap();
        let mut hook = Box::new(hook);
        hook.http.take();
        let payload = RelayPayload {
            content: Some("x".to_string()),
            embeds: Vec::new(),
            allowed_mentions: Default::default(),
        };
        assert!(hook.send(&payload).await.is_err());
        hook.close().await.unwrap();
    }
}
