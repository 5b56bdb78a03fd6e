//! RawMessage -> RelayPayload mapping.

use crate::messaging::types::{AllowedMentions, RawMessage, RelayPayload};

/// Destinations reject more than 10 embeds per message.
pub const MAX_EMBEDS: usize = 10;

/// True when there is nothing to relay: blank text, no embeds, no attachments.
pub fn is_empty_message(msg: &RawMessage) -> bool {
    msg.content.trim().is_empty() && msg.embeds.is_empty() && msg.attachments.is_empty()
}

/// Build the outbound body for `msg`.
///
/// Attachment URLs are appended to the trimmed text, one per line. Returns
/// `None` if the result would carry neither content nor embeds.
pub fn build_payload(msg: &RawMessage) -> Option<RelayPayload> {
    let text = msg.content.trim();

    let mut lines: Vec<&str> = Vec::with_capacity(1 + msg.attachments.len());
    if !text.is_empty() {
        lines.push(text);
    }
    lines.extend(
        msg.attachments
            .iter()
            .filter_map(|a| a.url.as_deref())
            .filter(|u| !u.trim().is_empty()),
    );

    let content = if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    };
    let embeds: Vec<serde_json::Value> = msg.embeds.iter().take(MAX_EMBEDS).cloned().collect();

    if content.is_none() && embeds.is_empty() {
        return None;
    }

    Some(RelayPayload {
        content,
        embeds,
        allowed_mentions: AllowedMentions::none(),
    })
}
