use async_trait::async_trait;

use crate::{
    domain::{ChannelId, WebhookUrl},
    messaging::types::{FetchQuery, RawMessage, RelayPayload},
    Result,
};

/// Where relayed messages come from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// One page of messages for `channel`. Order is whatever the backend returns.
    async fn fetch_messages(&self, channel: &ChannelId, query: FetchQuery)
        -> Result<Vec<RawMessage>>;
}

/// Where relayed messages go.
///
/// Channel posts go through the long-lived transport; webhooks get a handle
/// scoped to a single send (see `dispatch`).
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn post_to_channel(&self, channel: &ChannelId, payload: &RelayPayload) -> Result<()>;

    async fn open_webhook(&self, url: &WebhookUrl) -> Result<Box<dyn WebhookHandle>>;
}

/// A webhook client acquired for one delivery. Must be closed after use.
#[async_trait]
pub trait WebhookHandle: Send {
    async fn send(&mut self, payload: &RelayPayload) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;
}
