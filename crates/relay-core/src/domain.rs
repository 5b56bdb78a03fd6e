use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Discord's webhook endpoint prefix. Targets starting with it are webhooks.
pub const DEFAULT_WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";

/// Snowflake message id.
///
/// Discord encodes these as decimal strings; internally they are always
/// compared as `u64` so ordering is numeric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(MessageId)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl de::Visitor<'_> for IdVisitor {
            type Value = MessageId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a snowflake as a decimal string or unsigned integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MessageId, E> {
                Ok(MessageId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MessageId, E> {
                u64::try_from(v)
                    .map(MessageId)
                    .map_err(|_| E::custom(format!("negative snowflake: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MessageId, E> {
                v.parse()
                    .map_err(|e| E::custom(format!("invalid snowflake {v:?}: {e}")))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Opaque channel id (also used as the watermark key for a source).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        ChannelId(s.to_string())
    }
}

/// Full webhook URL (contains the webhook token, treat as a secret).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct WebhookUrl(pub String);

impl WebhookUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL with the token segment removed, safe for logs.
    pub fn redacted(&self) -> String {
        let Some(idx) = self.0.find("/webhooks/") else {
            return "<webhook>".to_string();
        };
        let head_end = idx + "/webhooks/".len();
        let rest = &self.0[head_end..];
        let id = rest.split('/').next().unwrap_or_default();
        format!("{}{id}/***", &self.0[..head_end])
    }
}

impl fmt::Debug for WebhookUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WebhookUrl").field(&self.redacted()).finish()
    }
}

/// Where a route delivers to. Resolved once when routes are loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Channel(ChannelId),
    Webhook(WebhookUrl),
}

impl Target {
    /// Webhook iff `raw` starts with `webhook_prefix`; anything else is a channel id.
    pub fn classify(raw: &str, webhook_prefix: &str) -> Self {
        if !webhook_prefix.is_empty() && raw.starts_with(webhook_prefix) {
            Target::Webhook(WebhookUrl(raw.to_string()))
        } else {
            Target::Channel(ChannelId(raw.to_string()))
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Channel(id) => write!(f, "channel:{id}"),
            Target::Webhook(url) => write!(f, "webhook:{}", url.redacted()),
        }
    }
}

/// One configured source -> target pairing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub source: ChannelId,
    pub target: Target,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}
