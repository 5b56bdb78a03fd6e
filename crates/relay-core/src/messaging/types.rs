use serde::{Deserialize, Serialize};

use crate::domain::MessageId;

/// Discord's hard cap on `limit` for a message page.
pub const MAX_FETCH_LIMIT: u8 = 100;

/// A message as fetched from the source channel. Read-only to the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMessage {
    pub id: MessageId,
    pub content: String,
    /// Rich-content blocks, carried through verbatim.
    pub embeds: Vec<serde_json::Value>,
    pub attachments: Vec<Attachment>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Page request against a source channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchQuery {
    /// Only messages strictly newer than this id. `None` = most recent page.
    pub after: Option<MessageId>,
    pub limit: u8,
}

impl FetchQuery {
    pub fn new(after: Option<MessageId>, limit: u8) -> Self {
        Self {
            after,
            limit: limit.clamp(1, MAX_FETCH_LIMIT),
        }
    }
}

/// Mention parsing policy sent with every relayed message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
}

impl AllowedMentions {
    /// No `@everyone`, role or user pings.
    pub fn none() -> Self {
        Self { parse: Vec::new() }
    }
}

/// Target-ready body for one relayed message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RelayPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<serde_json::Value>,
    pub allowed_mentions: AllowedMentions,
}
