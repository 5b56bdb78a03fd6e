//! Discord REST message JSON -> `RawMessage`.

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use relay_core::{
    domain::MessageId,
    messaging::types::{Attachment, RawMessage},
};

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    embeds: Option<Vec<Value>>,
    #[serde(default)]
    attachments: Option<Vec<Attachment>>,
}

/// Parse a `GET /channels/{id}/messages` body.
///
/// Records without a usable id are dropped; nothing could be deduplicated
/// against them.
pub(crate) fn parse_messages(body: &str) -> anyhow::Result<Vec<RawMessage>> {
    let wire: Vec<WireMessage> =
        serde_json::from_str(body).context("message page is not a JSON array of messages")?;

    let mut out = Vec::with_capacity(wire.len());
    for m in wire {
        let Some(raw_id) = m.id else {
            tracing::warn!("dropping message without id");
            continue;
        };
        let id = match serde_json::from_value::<MessageId>(raw_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("dropping message with unusable id: {e}");
                continue;
            }
        };

        out.push(RawMessage {
            id,
            content: m.content.unwrap_or_default(),
            embeds: m.embeds.unwrap_or_default(),
            attachments: m.attachments.unwrap_or_default(),
        });
    }
    Ok(out)
}
