//! `WsLogSubscriber`: concrete [`LogSubscriber`] for EVM nodes using a
//! JSON-RPC WebSocket subscription (`eth_subscribe("logs", ...)`).
//!
//! Each call to `subscribe_logs` opens its own connection, sends
//! `eth_subscribe`, and waits for the subscription id before returning, so
//! an unreachable node or a rejected filter fails the call itself. After
//! that a background task forwards matching `eth_subscription`
//! notifications. When the consumer drops the stream the task sends
//! `eth_unsubscribe` and a close frame.
//!
//! # Usage
//! ```no_run
//! use chainlogs_stream::ws_listener::WsLogSubscriber;
//!
//! let subscriber = WsLogSubscriber::new("wss://mainnet.infura.io/ws/v3/YOUR_KEY");
//! ```

use async_trait::async_trait;
use chainlogs_core::{
    error::{StreamError, TransportError},
    log::{LogFilter, LogRecord},
    source::{LogSubscriber, RawLogStream},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::rpc::{JsonRpcRequest, RpcId, RpcMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIBE_ID: u64 = 1;
const UNSUBSCRIBE_ID: u64 = 2;

/// EVM WebSocket log subscriber.
///
/// No reconnection: a dropped connection ends the stream with an error and
/// the caller decides whether to subscribe again.
#[derive(Debug, Clone)]
pub struct WsLogSubscriber {
    url: String,
    handshake_timeout: Duration,
    buffer: usize,
}

impl WsLogSubscriber {
    /// Create a subscriber for the given WebSocket URL (`ws://` or `wss://`).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handshake_timeout: Duration::from_secs(30),
            buffer: 512,
        }
    }

    /// Create a subscriber from `node.ws_url`, using the request timeout for
    /// the connect + subscribe handshake.
    pub fn from_config(node: &NodeConfig) -> Result<Self, StreamError> {
        let url = node.ws_url.as_deref().ok_or_else(|| StreamError::ConnectionFailed {
            url: String::new(),
            reason: "no WebSocket endpoint configured".into(),
        })?;
        Ok(Self::new(url).with_handshake_timeout(node.request_timeout()))
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LogSubscriber for WsLogSubscriber {
    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<RawLogStream, StreamError> {
        let handshake = open_subscription(&self.url, filter);
        let (ws, subscription_id) = tokio::time::timeout(self.handshake_timeout, handshake)
            .await
            .map_err(|_| StreamError::ConnectionFailed {
                url: self.url.clone(),
                reason: format!(
                    "handshake timed out after {}ms",
                    self.handshake_timeout.as_millis()
                ),
            })??;

        let (tx, mut rx) = mpsc::channel(self.buffer);
        tokio::spawn(run_subscription(self.url.clone(), ws, subscription_id, tx));

        Ok(Box::pin(futures::stream::poll_fn(move |cx| rx.poll_recv(cx))))
    }
}

// ─── Handshake ────────────────────────────────────────────────────────────────

async fn open_subscription(
    url: &str,
    filter: &LogFilter,
) -> Result<(WsStream, String), StreamError> {
    let connection_failed = |reason: String| StreamError::ConnectionFailed {
        url: url.to_string(),
        reason,
    };

    info!(url, "connecting to WebSocket");
    let (mut ws, _) = connect_async(url)
        .await
        .map_err(|e| connection_failed(e.to_string()))?;

    let request = JsonRpcRequest::new(
        SUBSCRIBE_ID,
        "eth_subscribe",
        vec![json!("logs"), filter.to_rpc_object(false)],
    );
    let text =
        serde_json::to_string(&request).map_err(|e| StreamError::Subscribe(e.to_string()))?;
    ws.send(Message::Text(text))
        .await
        .map_err(|e| connection_failed(e.to_string()))?;

    while let Some(msg) = ws.next().await {
        match msg.map_err(|e| connection_failed(e.to_string()))? {
            Message::Text(text) => {
                let reply: RpcMessage = serde_json::from_str(&text)
                    .map_err(|e| StreamError::Subscribe(format!("invalid reply: {e}")))?;
                if reply.id != Some(RpcId::Number(SUBSCRIBE_ID)) {
                    continue;
                }
                if let Some(err) = reply.error {
                    return Err(StreamError::Subscribe(err.to_string()));
                }
                return match reply.result {
                    Some(Value::String(id)) => {
                        info!(url, subscription = %id, "log subscription active");
                        Ok((ws, id))
                    }
                    other => Err(StreamError::Subscribe(format!(
                        "unexpected subscription id: {other:?}"
                    ))),
                };
            }
            Message::Ping(data) => {
                ws.send(Message::Pong(data))
                    .await
                    .map_err(|e| connection_failed(e.to_string()))?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Err(StreamError::Subscribe(
        "connection closed before the subscription was confirmed".into(),
    ))
}

// ─── Forwarding loop ──────────────────────────────────────────────────────────

async fn run_subscription(
    url: String,
    ws: WsStream,
    subscription_id: String,
    tx: mpsc::Sender<Result<LogRecord, StreamError>>,
) {
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            _ = tx.closed() => {
                unsubscribe(&mut write, &subscription_id).await;
                break;
            }
            msg = read.next() => {
                let outcome = match msg {
                    None => Err(StreamError::Closed),
                    Some(Err(e)) => Err(StreamError::Transport(e.to_string())),
                    Some(Ok(Message::Text(text))) => parse_notification(&text, &subscription_id),
                    Some(Ok(Message::Ping(data))) => write
                        .send(Message::Pong(data))
                        .await
                        .map(|_| None)
                        .map_err(|e| StreamError::Transport(e.to_string())),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "close frame from node");
                        Err(StreamError::Closed)
                    }
                    Some(Ok(_)) => Ok(None),
                };

                match outcome {
                    Ok(Some(log)) => {
                        if tx.send(Ok(log)).await.is_err() {
                            unsubscribe(&mut write, &subscription_id).await;
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(url = %url, error = %err, "log subscription failed");
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                }
            }
        }
    }

    info!(url = %url, subscription = %subscription_id, "log subscription loop ended");
}

async fn unsubscribe(write: &mut SplitSink<WsStream, Message>, subscription_id: &str) {
    let request =
        JsonRpcRequest::new(UNSUBSCRIBE_ID, "eth_unsubscribe", vec![json!(subscription_id)]);
    if let Ok(text) = serde_json::to_string(&request) {
        if let Err(e) = write.send(Message::Text(text)).await {
            debug!(error = %e, "eth_unsubscribe not delivered");
        }
    }
    let _ = write.send(Message::Close(None)).await;
    debug!(subscription = %subscription_id, "unsubscribed");
}

// ─── Message parsing ─────────────────────────────────────────────────────────

/// Parse one text frame received after the subscription is established.
///
/// Returns the log for a notification on `subscription_id`, `None` for
/// anything unrelated, and an error for JSON-RPC errors or malformed frames.
fn parse_notification(
    text: &str,
    subscription_id: &str,
) -> Result<Option<LogRecord>, StreamError> {
    let msg: RpcMessage = serde_json::from_str(text)
        .map_err(|e| StreamError::Transport(format!("invalid message: {e}")))?;

    if let Some(err) = msg.error {
        return Err(TransportError::Rpc(err).into());
    }
    if msg.method.as_deref() != Some("eth_subscription") {
        return Ok(None);
    }
    let Some(params) = msg.params else {
        return Ok(None);
    };
    if params.subscription != subscription_id {
        return Ok(None);
    }

    serde_json::from_value(params.result)
        .map(Some)
        .map_err(|e| StreamError::Transport(format!("malformed log notification: {e}")))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
