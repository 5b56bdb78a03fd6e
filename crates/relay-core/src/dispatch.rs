use crate::{
    domain::Target,
    messaging::{port::RelayTransport, types::RelayPayload},
    Result,
};

/// Deliver `payload` to `target`.
///
/// Webhook handles are opened per send and always closed, also when the send
/// fails. A send error takes precedence over a close error.
pub async fn dispatch(
    transport: &dyn RelayTransport,
    target: &Target,
    payload: &RelayPayload,
) -> Result<()> {
    match target {
        Target::Channel(channel) => transport.post_to_channel(channel, payload).await,
        Target::Webhook(url) => {
            let mut handle = transport.open_webhook(url).await?;
            let sent = handle.send(payload).await;
            let closed = handle.close().await;

            sent?;
            if let Err(e) = closed {
                tracing::warn!(
                    webhook = %url.redacted(),
                    "webhook close failed after delivery: {e}"
                );
            }
            Ok(())
        }
    }
}
