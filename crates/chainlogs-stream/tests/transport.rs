//! HTTP and WebSocket transports against local single-connection servers.

mod common;

use chainlogs_core::{
    error::{QueryError, StreamError},
    log::LogFilter,
    source::LogSource,
};
use chainlogs_stream::{
    HistoricalQuery, HttpLogSource, LiveSubscriber, SubscriptionItem, WsLogSubscriber,
};
use common::*;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
    time::timeout,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

const WAIT: Duration = Duration::from_secs(5);

// ─── HTTP ─────────────────────────────────────────────────────────────────────

/// Accept one HTTP request, answer with `reply` as the JSON-RPC body, and
/// return the request body.
async fn http_once(reply: Value) -> (String, JoinHandle<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request: Value = serde_json::from_slice(&buf[header_end..header_end + length]).unwrap();

        let mut body = reply;
        body["jsonrpc"] = json!("2.0");
        body["id"] = request["id"].clone();
        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (url, server)
}

#[tokio::test]
async fn http_query_sends_eth_get_logs_and_decodes() {
    let logs = vec![transfer(0x64, 1, 2, 10), transfer(0x65, 3, 4, 20)];
    let (url, server) = http_once(json!({ "result": logs })).await;

    let source = HttpLogSource::new(url, WAIT).unwrap();
    let query = HistoricalQuery::new(std::sync::Arc::new(source), erc20());
    let filter = LogFilter::new()
        .address(token())
        .event_signature(transfer_topic())
        .from_block(0x64u64)
        .to_block(0x65u64);

    let outcome = query.run(&filter).await.unwrap();
    assert_eq!(outcome.events.len(), 2);
    assert_eq!(outcome.events[1].field("value").and_then(|v| v.as_u128()), Some(20));

    let request = server.await.unwrap();
    assert_eq!(request["method"], "eth_getLogs");
    assert_eq!(request["params"][0]["fromBlock"], "0x64");
    assert_eq!(request["params"][0]["toBlock"], "0x65");
    assert_eq!(
        request["params"][0]["topics"][0],
        json!(transfer_topic())
    );
}

#[tokio::test]
async fn http_range_limit_error_is_classified() {
    let (url, server) = http_once(json!({
        "error": { "code": -32005, "message": "query returned more than 10000 results" }
    }))
    .await;

    let source = HttpLogSource::new(url, WAIT).unwrap();
    let query = HistoricalQuery::new(std::sync::Arc::new(source), erc20());

    let err = query
        .run(&LogFilter::new().from_block(0u64).to_block(10_000_000u64))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::RangeTooLarge { .. }));
    server.await.unwrap();
}

#[tokio::test]
async fn http_block_number_parses_quantity() {
    let (url, server) = http_once(json!({ "result": "0x121eac0" })).await;
    let source = HttpLogSource::new(url, WAIT).unwrap();

    assert_eq!(source.block_number().await.unwrap(), 0x121eac0);
    assert_eq!(server.await.unwrap()["method"], "eth_blockNumber");
}

// ─── WebSocket ────────────────────────────────────────────────────────────────

/// Accept one WebSocket client, confirm its `eth_subscribe` as `0xfeed`, push
/// `logs` as notifications, then record every method the client sends until
/// it closes.
async fn ws_node(logs: Vec<Value>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        let mut methods = Vec::new();

        let subscribe: Value = match ws.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected eth_subscribe, got {other:?}"),
        };
        methods.push(subscribe["method"].as_str().unwrap_or_default().to_string());
        assert_eq!(subscribe["params"][0], "logs");

        let reply = json!({ "jsonrpc": "2.0", "id": subscribe["id"], "result": "0xfeed" });
        ws.send(Message::Text(reply.to_string())).await.unwrap();

        for log in logs {
            let note = json!({
                "jsonrpc": "2.0",
                "method": "eth_subscription",
                "params": { "subscription": "0xfeed", "result": log }
            });
            ws.send(Message::Text(note.to_string())).await.unwrap();
        }

        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Text(text) => {
                    let req: Value = serde_json::from_str(&text).unwrap();
                    methods.push(req["method"].as_str().unwrap_or_default().to_string());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        methods
    });

    (url, server)
}

#[tokio::test]
async fn ws_subscription_decodes_and_unsubscribes_on_drop() {
    let logs = vec![
        serde_json::to_value(transfer(1, 1, 2, 5)).unwrap(),
        serde_json::to_value(transfer(2, 3, 4, 6)).unwrap(),
    ];
    let (url, server) = ws_node(logs).await;

    let live = LiveSubscriber::new(std::sync::Arc::new(WsLogSubscriber::new(url)), erc20());
    let filter = LogFilter::new().event_signature(transfer_topic());
    let mut handle = live.subscribe(&filter).await.unwrap();

    for expected in [5u128, 6] {
        match timeout(WAIT, handle.next()).await.unwrap() {
            Some(SubscriptionItem::Event(event)) => {
                assert_eq!(event.field("value").and_then(|v| v.as_u128()), Some(expected));
            }
            other => panic!("expected event, got {other:?}"),
        }
    }
    drop(handle);

    let methods = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(methods, vec!["eth_subscribe", "eth_unsubscribe"]);
}

#[tokio::test]
async fn ws_rejected_subscription_fails_subscribe() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        if let Some(Ok(Message::Text(text))) = ws.next().await {
            let req: Value = serde_json::from_str(&text).unwrap();
            let reply = json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "error": { "code": -32601, "message": "subscriptions not supported" }
            });
            let _ = ws.send(Message::Text(reply.to_string())).await;
        }
    });

    let live = LiveSubscriber::new(std::sync::Arc::new(WsLogSubscriber::new(url)), erc20());
    let err = live.subscribe(&LogFilter::new()).await.err().unwrap();
    assert!(matches!(err, StreamError::Subscribe(ref m) if m.contains("not supported")));
}
