//! Integration tests for the notification WebSocket
//!
//! The handshake and server frames are handled directly over a TCP stream;
//! the server never fragments or masks the small text frames read here.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{TestApp, account_id};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

struct Stream {
    tcp: TcpStream,
    buffer: Vec<u8>,
}

impl Stream {
    /// Read until at least `len` bytes are buffered
    async fn fill(&mut self, len: usize) {
        let mut chunk = [0u8; 1024];
        while self.buffer.len() < len {
            let read = timeout(READ_TIMEOUT, self.tcp.read(&mut chunk))
                .await
                .expect("timed out waiting for the server")
                .unwrap();
            assert!(read > 0, "connection closed by server");
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }

    fn take(&mut self, len: usize) -> Vec<u8> {
        self.buffer.drain(..len).collect()
    }

    /// Next server text frame as JSON
    async fn next_json(&mut self) -> Value {
        self.fill(2).await;
        let header = self.take(2);
        assert_eq!(header[0], 0x81, "expected a final text frame");
        let len = match header[1] & 0x7f {
            126 => {
                self.fill(2).await;
                let bytes = self.take(2);
                u16::from_be_bytes([bytes[0], bytes[1]]) as usize
            }
            127 => {
                self.fill(8).await;
                let bytes: [u8; 8] = self.take(8).try_into().unwrap();
                u64::from_be_bytes(bytes) as usize
            }
            short => short as usize,
        };
        self.fill(len).await;
        serde_json::from_slice(&self.take(len)).unwrap()
    }
}

/// Send the upgrade request and return the response status with the open stream
async fn open(app: &TestApp, token: &str) -> (u16, Stream) {
    let host = app.url.trim_start_matches("http://");
    let mut tcp = TcpStream::connect(host).await.unwrap();
    let request = format!(
        "GET /api/v1/ws/notifications?token={token} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
    );
    tcp.write_all(request.as_bytes()).await.unwrap();

    let mut stream = Stream {
        tcp,
        buffer: Vec::new(),
    };
    let head_end = loop {
        if let Some(pos) = stream.buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let wanted = stream.buffer.len() + 1;
        stream.fill(wanted).await;
    };
    let head = String::from_utf8(stream.take(head_end)).unwrap();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    (status, stream)
}

#[tokio::test]
async fn invalid_tokens_are_refused_before_upgrade() {
    let app = TestApp::spawn().await;

    let (status, stream) = open(&app, "not-a-jwt").await;
    assert_eq!(status, 401);
    drop(stream);

    app.shutdown().await;
}

#[tokio::test]
async fn stream_only_carries_the_callers_account() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("listener@example.com").await;
    let (_, other_session) = app.signup("neighbour@example.com").await;
    let mine = account_id(&session);
    let theirs = account_id(&other_session);

    let (status, mut stream) = open(&app, &token).await;
    assert_eq!(status, 101);

    // The subscription starts after the handshake; wait until it is live
    let hub = &app.state.notifications;
    let mut attempts = 0;
    while hub.publish(theirs, "integration.synced", json!({ "secret": true })) == 0 {
        attempts += 1;
        assert!(attempts < 200, "stream never subscribed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    hub.publish(theirs, "billing.plan_changed", json!({ "plan": "growth" }));
    hub.publish(mine, "team.member_joined", json!({ "email": "new@example.com" }));

    let frame = stream.next_json().await;
    assert_eq!(frame["account_id"], mine.to_string());
    assert_eq!(frame["kind"], "team.member_joined");
    assert_eq!(frame["payload"]["email"], "new@example.com");

    drop(stream);

    app.shutdown().await;
}
