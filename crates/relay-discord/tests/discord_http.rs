//! Adapter behaviour against a canned local HTTP server.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use relay_core::{
    domain::{ChannelId, MessageId, WebhookUrl},
    errors::Error,
    messaging::{
        port::{MessageSource, RelayTransport, WebhookHandle},
        types::{AllowedMentions, FetchQuery, RelayPayload},
    },
};
use relay_discord::{DiscordClient, DiscordConfig};

#[derive(Clone, Debug)]
struct Seen {
    method: String,
    target: String,
    authorization: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct Stub {
    responses: Arc<Mutex<VecDeque<(u16, String)>>>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Stub {
    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn start(responses: Vec<(u16, String)>) -> (Stub, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stub = Stub {
        responses: Arc::new(Mutex::new(responses.into())),
        ..Default::default()
    };

    let st = stub.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let st = st.clone();
            tokio::spawn(async move {
                let Some(req) = read_request(&mut sock).await else {
                    return;
                };
                st.seen.lock().unwrap().push(req);
                let (status, body) = st
                    .responses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or((500, "{}".to_string()));
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(reply.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    (stub, format!("http://{addr}/api/v10"))
}

async fn read_request(sock: &mut tokio::net::TcpStream) -> Option<Seen> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        match k.trim().to_ascii_lowercase().as_str() {
            "content-length" => content_length = v.trim().parse().unwrap_or(0),
            "authorization" => authorization = Some(v.trim().to_string()),
            _ => {}
        }
    }

    while buf.len() < header_end + content_length {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(Seen {
        method,
        target,
        authorization,
        body,
    })
}

fn client(api_base: String) -> DiscordClient {
    DiscordClient::new(DiscordConfig {
        token: "secret".to_string(),
        api_base,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn payload(text: &str) -> RelayPayload {
    RelayPayload {
        content: Some(text.to_string()),
        embeds: Vec::new(),
        allowed_mentions: AllowedMentions::none(),
    }
}

#[tokio::test]
async fn fetch_sends_cursor_and_parses_page() {
    let page = json!([
        { "id": "12", "content": "b", "embeds": [], "attachments": [] },
        { "id": "11", "content": "a", "embeds": [], "attachments": [] }
    ]);
    let (stub, base) = start(vec![(200, page.to_string())]).await;

    let msgs = client(base)
        .fetch_messages(&ChannelId::from("100"), FetchQuery::new(Some(MessageId(10)), 100))
        .await
        .unwrap();

    assert_eq!(
        msgs.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![MessageId(12), MessageId(11)]
    );
    let seen = stub.seen();
    assert_eq!(seen[0].method, "GET");
    assert!(seen[0].target.starts_with("/api/v10/channels/100/messages?"));
    assert!(seen[0].target.contains("limit=100"));
    assert!(seen[0].target.contains("after=10"));
    assert_eq!(seen[0].authorization.as_deref(), Some("Bot secret"));
}

#[tokio::test]
async fn fetch_without_watermark_has_no_after() {
    let (stub, base) = start(vec![(200, "[]".to_string())]).await;

    let msgs = client(base)
        .fetch_messages(&ChannelId::from("100"), FetchQuery::new(None, 100))
        .await
        .unwrap();

    assert!(msgs.is_empty());
    assert!(!stub.seen()[0].target.contains("after="));
}

#[tokio::test]
async fn channel_post_disables_mentions() {
    let (stub, base) = start(vec![(200, "{}".to_string())]).await;

    client(base)
        .post_to_channel(&ChannelId::from("200"), &payload("@everyone hi"))
        .await
        .unwrap();

    let seen = stub.seen();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].target, "/api/v10/channels/200/messages");
    let body: Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(
        body,
        json!({ "content": "@everyone hi", "allowed_mentions": { "parse": [] } })
    );
}

#[tokio::test]
async fn webhook_send_goes_to_execute_endpoint_without_bot_auth() {
    let (stub, base) = start(vec![(200, "{}".to_string())]).await;
    let discord = client(base);

    let mut hook = discord
        .open_webhook(&WebhookUrl(
            "https://discord.com/api/webhooks/77/tok-en".to_string(),
        ))
        .await
        .unwrap();
    hook.send(&payload("hi")).await.unwrap();
    hook.close().await.unwrap();

    let seen = stub.seen();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].target, "/api/v10/webhooks/77/tok-en?wait=true");
    assert!(seen[0].authorization.is_none());
}

#[tokio::test]
async fn rate_limit_is_retried_once() {
    let (stub, base) = start(vec![
        (429, r#"{"message":"slow down","retry_after":0.01,"global":false}"#.to_string()),
        (200, "{}".to_string()),
    ])
    .await;

    client(base)
        .post_to_channel(&ChannelId::from("200"), &payload("x"))
        .await
        .unwrap();
    assert_eq!(stub.seen().len(), 2);
}

#[tokio::test]
async fn second_rate_limit_surfaces_as_transport_error() {
    let rl = r#"{"retry_after":0.01}"#.to_string();
    let (_stub, base) = start(vec![(429, rl.clone()), (429, rl)]).await;

    let err = client(base)
        .post_to_channel(&ChannelId::from("200"), &payload("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { status: 429, .. }));
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let (_stub, base) = start(vec![(403, r#"{"message":"Missing Access"}"#.to_string())]).await;

    let err = client(base)
        .fetch_messages(&ChannelId::from("100"), FetchQuery::new(None, 10))
        .await
        .unwrap_err();
    match err {
        Error::Transport { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("Missing Access"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
