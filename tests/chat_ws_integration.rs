//! Integration tests for the chat WebSocket endpoint.
//!
//! Each test spins up the Axum router on a random port, connects via
//! tokio-tungstenite, and exercises the real WS contract.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use trading_chat::channels::chat_routes;
use trading_chat::conversation::{Collector, Slot, TERMINATED_MESSAGE};
use trading_chat::error::DispatchError;
use trading_chat::pipeline::{AnalysisConfig, DispatchRequest, PipelineResult, PipelineRunner};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

type Ws = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Stub runner that records tickers and answers with a fixed decision.
#[derive(Default)]
struct StubRunner {
    tickers: Mutex<Vec<String>>,
}

#[async_trait]
impl PipelineRunner for StubRunner {
    fn name(&self) -> &str {
        "stub"
    }

    async fn run(&self, request: &DispatchRequest) -> Result<PipelineResult, DispatchError> {
        self.tickers.lock().unwrap().push(request.ticker.clone());
        Ok(PipelineResult {
            raw_decision: format!(
                "{} rounds of debate. FINAL TRANSACTION PROPOSAL: **BUY**",
                request.config.max_debate_rounds
            ),
            recommendation: String::new(),
        })
    }
}

/// Start an Axum server on a random port, return (port, runner).
async fn start_server() -> (u16, Arc<StubRunner>) {
    let runner = Arc::new(StubRunner::default());
    let collector = Arc::new(Collector::new(runner.clone(), AnalysisConfig::default()));
    let app = chat_routes(collector);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, runner)
}

async fn connect(port: u16) -> Ws {
    let (ws, _resp) = connect_async(format!("ws://127.0.0.1:{port}/ws/chat"))
        .await
        .expect("WS connect failed");
    ws
}

/// Parse a WS text frame into a serde_json::Value.
fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

async fn recv_json(ws: &mut Ws) -> Value {
    let msg = ws.next().await.unwrap().unwrap();
    parse_ws_json(&msg)
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn answer(ws: &mut Ws, content: &str) -> Value {
    send_json(ws, json!({"type": "message", "content": content})).await;
    recv_json(ws).await
}

const TSLA_INPUTS: [&str; 6] = ["tsla", "today", "market, news", "2", "fast-model", "deep-model"];

#[tokio::test]
async fn connect_receives_opening_prompt() {
    timeout(TEST_TIMEOUT, async {
        let (port, _runner) = start_server().await;
        let mut ws = connect(port).await;

        let json = recv_json(&mut ws).await;
        assert_eq!(json["type"], "prompt");
        assert!(json["content"].as_str().unwrap().ends_with(Slot::Ticker.prompt()));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_conversation_dispatches_once() {
    timeout(TEST_TIMEOUT, async {
        let (port, runner) = start_server().await;
        let mut ws = connect(port).await;
        recv_json(&mut ws).await;

        let mut replies = Vec::new();
        for input in TSLA_INPUTS {
            replies.push(answer(&mut ws, input).await);
        }

        for (reply, slot) in replies.iter().zip(&Slot::ALL[1..]) {
            assert_eq!(reply["type"], "response");
            assert_eq!(reply["content"], slot.prompt());
            assert_eq!(reply["phase"], slot.to_string());
        }

        let last = replies.last().unwrap();
        assert_eq!(last["phase"], "terminated");
        let content = last["content"].as_str().unwrap();
        assert!(content.starts_with("✅ Final Trading Decision for TSLA:"), "{content}");
        assert!(content.contains("2 rounds of debate"));
        assert!(content.ends_with("📌 Recommendation: BUY"));

        // Further input is absorbed.
        let after = answer(&mut ws, "again").await;
        assert_eq!(after["content"], TERMINATED_MESSAGE);
        assert_eq!(after["phase"], "terminated");

        assert_eq!(*runner.tickers.lock().unwrap(), vec!["TSLA".to_string()]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_depth_stays_on_same_step() {
    timeout(TEST_TIMEOUT, async {
        let (port, runner) = start_server().await;
        let mut ws = connect(port).await;
        recv_json(&mut ws).await;

        for input in &TSLA_INPUTS[..3] {
            answer(&mut ws, input).await;
        }
        let reply = answer(&mut ws, "deep").await;
        assert_eq!(reply["phase"], "research_depth");
        assert!(reply["content"].as_str().unwrap().ends_with(Slot::ResearchDepth.prompt()));

        let reply = answer(&mut ws, "1").await;
        assert_eq!(reply["phase"], "quick_model");
        assert!(runner.tickers.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sessions_are_independent() {
    timeout(TEST_TIMEOUT, async {
        let (port, runner) = start_server().await;
        let mut first = connect(port).await;
        let mut second = connect(port).await;
        recv_json(&mut first).await;
        recv_json(&mut second).await;

        answer(&mut first, "aapl").await;
        answer(&mut first, "2024-01-02").await;

        // Second session still starts at the ticker.
        let reply = answer(&mut second, "msft").await;
        assert_eq!(reply["phase"], "analysis_date");

        for input in ["fundamentals", "1", "q", "d"] {
            answer(&mut first, input).await;
        }
        assert_eq!(*runner.tickers.lock().unwrap(), vec!["AAPL".to_string()]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn restart_resets_conversation() {
    timeout(TEST_TIMEOUT, async {
        let (port, _runner) = start_server().await;
        let mut ws = connect(port).await;
        recv_json(&mut ws).await;

        for input in TSLA_INPUTS {
            answer(&mut ws, input).await;
        }

        send_json(&mut ws, json!({"type": "restart"})).await;
        let json = recv_json(&mut ws).await;
        assert_eq!(json["type"], "prompt");

        let reply = answer(&mut ws, "eth").await;
        assert_eq!(reply["phase"], "analysis_date");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_frame_returns_error_without_advancing() {
    timeout(TEST_TIMEOUT, async {
        let (port, _runner) = start_server().await;
        let mut ws = connect(port).await;
        recv_json(&mut ws).await;

        ws.send(Message::Text("not json".into())).await.unwrap();
        let json = recv_json(&mut ws).await;
        assert_eq!(json["type"], "error");

        let reply = answer(&mut ws, "btc").await;
        assert_eq!(reply["phase"], "analysis_date");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_endpoint_reports_runner() {
    timeout(TEST_TIMEOUT, async {
        let (port, _runner) = start_server().await;

        let body: Value = reqwest::get(format!("http://127.0.0.1:{port}/api/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["runner"], "stub");
    })
    .await
    .expect("test timed out");
}
