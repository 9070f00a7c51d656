//! Shared fixtures for the integration suite.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use tagwatch::event::ReaderEvent;
use tagwatch::settings::{GatewayConfig, ReaderConfig};
use tagwatch::sink::MemorySink;
use tagwatch::verifier::{AuthChallenge, Verdict, Verifier};
use tagwatch::{FixedClock, Gateway};

// ==========================
// GATEWAY FACTORIES
// ==========================

/// Config pointing at the given feed, credentials `user`/`pass`.
pub fn feed_config(base_url: &str) -> GatewayConfig {
    GatewayConfig::for_reader(ReaderConfig {
        base_url: base_url.to_string(),
        username: "user".to_string(),
        password: "pass".to_string(),
    })
}

/// Gateway with a deterministic clock, the given verifier, and an
/// inspectable in-memory sink.
pub fn gateway_at(
    base_url: &str,
    clock: Arc<FixedClock>,
    verifier: Arc<dyn Verifier>,
) -> (Gateway, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let gateway = Gateway::with_parts(feed_config(base_url), clock, verifier, sink.clone());
    (gateway, sink)
}

/// Gateway for tests that inject events directly and never connect.
pub fn gateway_offline(
    clock: Arc<FixedClock>,
    verifier: Arc<dyn Verifier>,
) -> (Gateway, Arc<MemorySink>) {
    gateway_at("http://127.0.0.1:9", clock, verifier)
}

// ==========================
// VERIFIER FIXTURES
// ==========================

/// Verifier returning a fixed verdict and recording every challenge it sees.
pub struct RecordingVerifier {
    verdict: Verdict,
    calls: Mutex<Vec<AuthChallenge>>,
}

impl RecordingVerifier {
    pub fn with_verdict(verdict: Verdict) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn authentic() -> Arc<Self> {
        Self::with_verdict(Verdict::authentic("verified"))
    }

    pub fn rejecting(detail: &str) -> Arc<Self> {
        Self::with_verdict(Verdict::rejected(detail))
    }

    pub fn calls(&self) -> Vec<AuthChallenge> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Verifier for RecordingVerifier {
    async fn verify(&self, challenge: &AuthChallenge) -> Verdict {
        self.calls.lock().unwrap().push(challenge.clone());
        self.verdict.clone()
    }
}

// ==========================
// EVENT BUILDERS
// ==========================

/// A complete, valid tag-inventory event.
pub fn valid_event(tid: &str, epc: &str, message: &str, response: &str) -> ReaderEvent {
    event_with_payload_tid(tid, epc, message, response, Some(tid))
}

/// A valid event whose authentication payload carries its own tag id (or
/// omits it when `payload_tid` is `None`).
pub fn event_with_payload_tid(
    tid: &str,
    epc: &str,
    message: &str,
    response: &str,
    payload_tid: Option<&str>,
) -> ReaderEvent {
    let mut payload = json!({"messageHex": message, "responseHex": response});
    if let Some(id) = payload_tid {
        payload["tidHex"] = json!(id);
    }
    serde_json::from_value(json!({
        "eventType": "tagInventory",
        "tagInventoryEvent": {
            "tidHex": tid,
            "epcHex": epc,
            "tagAuthenticationResponse": payload,
        },
    }))
    .unwrap()
}

/// A tag-inventory event with no authentication payload at all.
pub fn event_missing_payload(tid: &str, epc: &str) -> ReaderEvent {
    serde_json::from_value(json!({
        "eventType": "tagInventory",
        "tagInventoryEvent": {"tidHex": tid, "epcHex": epc},
    }))
    .unwrap()
}

/// A tag-inventory event whose tag responded with an empty string.
pub fn event_empty_response(tid: &str) -> ReaderEvent {
    serde_json::from_value(json!({
        "eventType": "tagInventory",
        "tagInventoryEvent": {
            "tidHex": tid,
            "tagAuthenticationResponse": {"messageHex": "AABB", "responseHex": ""},
        },
    }))
    .unwrap()
}

/// An event of a type the pipeline ignores.
pub fn heartbeat_event() -> ReaderEvent {
    serde_json::from_value(json!({"eventType": "heartbeat"})).unwrap()
}

// ==========================
// NDJSON FEED FIXTURE
// ==========================

/// Minimal one-connection HTTP server emitting an NDJSON body.
///
/// Serves exactly one request: reads the request head, writes a status line
/// plus the configured lines, then either closes (EOF terminates the feed)
/// or holds the connection open until released/dropped.
pub struct FeedServer {
    addr: SocketAddr,
    release: Option<oneshot::Sender<()>>,
    request: Arc<Mutex<String>>,
}

impl FeedServer {
    /// Serve the lines and close the connection.
    pub async fn serve(lines: Vec<String>) -> Self {
        Self::start("200 OK", lines, false).await
    }

    /// Serve the lines, then keep the connection open until released.
    pub async fn serve_open(lines: Vec<String>) -> Self {
        Self::start("200 OK", lines, true).await
    }

    /// Refuse the stream request with the given status line.
    pub async fn reject(status: &'static str) -> Self {
        Self::start(status, Vec::new(), false).await
    }

    async fn start(status: &'static str, lines: Vec<String>, hold_open: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let request = Arc::new(Mutex::new(String::new()));
        let request_out = request.clone();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let (mut socket, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };

            let mut head = Vec::new();
            let mut chunk = [0u8; 512];
            loop {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        head.extend_from_slice(&chunk[..n]);
                        if head.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }
            *request_out.lock().unwrap() = String::from_utf8_lossy(&head).to_string();

            let header = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/x-ndjson\r\nconnection: close\r\n\r\n"
            );
            if socket.write_all(header.as_bytes()).await.is_err() {
                return;
            }
            for line in &lines {
                if socket.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                    return;
                }
            }
            let _ = socket.flush().await;

            if hold_open {
                // Dropping the FeedServer (or calling release) ends this.
                let _ = release_rx.await;
            }
        });

        Self {
            addr,
            release: Some(release_tx),
            request,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Close a held-open connection.
    pub fn release(&mut self) {
        if let Some(tx) = self.release.take() {
            let _ = tx.send(());
        }
    }

    /// The raw request head the client sent.
    pub fn request_head(&self) -> String {
        self.request.lock().unwrap().clone()
    }
}

// ==========================
// POLLING
// ==========================

/// Poll `cond` until it holds, panicking after a couple of seconds.
pub async fn wait_for(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
