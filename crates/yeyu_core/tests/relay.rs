use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use yeyu_core::{
    ChatMessage, CompletionClient, CompletionProvider, ProviderConfig, RelayError, SparkWsClient,
    SparkWsConfig,
};

async fn spawn_upstream() -> String {
    let router = Router::new()
        .route("/ok", post(reply_ok))
        .route("/denied", post(reply_denied))
        .route("/not-json", post(|| async { "hello" }))
        .route("/no-choices", post(|| async { Json(json!({"id": "x"})) }))
        .route("/stream", post(reply_stream));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Answers "X" only when auth, user agent and provider settings are right.
async fn reply_ok(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer test-key");
    let agent_ok = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        == Some("HappyBlog/1.0");
    let body_ok = body["stream"] == json!(false)
        && body["temperature"] == json!(0.7)
        && body["messages"][0]["role"] == json!("user");
    if !(authorized && agent_ok && body_ok) {
        return (StatusCode::BAD_REQUEST, "unexpected request").into_response();
    }

    let content = if body["model"] == json!("pro") && body["user"].is_string() {
        "spark:X"
    } else {
        "X"
    };
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"total_tokens": 3}
    }))
    .into_response()
}

async fn reply_denied() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"message": "nope", "code": "invalid_api_key"}})),
    )
        .into_response()
}

async fn reply_stream() -> Response {
    // The second delta is split mid-line across chunks.
    let chunks = vec![
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":",
        "{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
    ];
    let stream = futures::stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, std::io::Error>(Bytes::from(chunk))),
    );
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(stream))
        .unwrap()
}

fn client(provider: CompletionProvider, url: String, key: Option<&str>) -> CompletionClient {
    CompletionClient::new(ProviderConfig {
        provider,
        api_url: url,
        api_key: key.map(str::to_string),
    })
    .unwrap()
}

fn conversation() -> Vec<ChatMessage> {
    vec![ChatMessage::user("hi")]
}

#[tokio::test]
async fn non_streaming_reply_is_relayed() {
    let base = spawn_upstream().await;
    let reply = client(CompletionProvider::Gpt, format!("{base}/ok"), Some("test-key"))
        .complete(&conversation())
        .await
        .unwrap();

    assert_eq!(reply.content, "X");
    assert_eq!(reply.model.as_deref(), Some("gpt-4.1-mini"));
    assert_eq!(reply.usage, Some(json!({"total_tokens": 3})));
    assert!(chrono::DateTime::parse_from_rfc3339(&reply.timestamp).is_ok());
}

#[tokio::test]
async fn spark_http_adds_user_field() {
    let base = spawn_upstream().await;
    let reply = client(CompletionProvider::SparkHttp, format!("{base}/ok"), Some("test-key"))
        .complete(&conversation())
        .await
        .unwrap();
    assert_eq!(reply.content, "spark:X");
    assert_eq!(reply.model.as_deref(), Some("pro"));
}

#[tokio::test]
async fn upstream_status_is_carried_with_auth_hint() {
    let base = spawn_upstream().await;
    let err = client(CompletionProvider::Gpt, format!("{base}/denied"), Some("test-key"))
        .complete(&conversation())
        .await
        .unwrap_err();

    match err {
        RelayError::UpstreamStatus { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("authentication failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn bad_upstream_bodies_are_classified() {
    let base = spawn_upstream().await;
    let not_json = client(CompletionProvider::Gpt, format!("{base}/not-json"), Some("k"))
        .complete(&conversation())
        .await
        .unwrap_err();
    assert!(matches!(not_json, RelayError::Format(_)));

    let no_choices = client(CompletionProvider::Gpt, format!("{base}/no-choices"), Some("k"))
        .complete(&conversation())
        .await
        .unwrap_err();
    assert!(matches!(no_choices, RelayError::MalformedResponse(_)));
}

#[tokio::test]
async fn missing_key_fails_before_any_call() {
    // Port 9 is never served in tests; a call would surface as Transport.
    let err = client(CompletionProvider::Gpt, "http://127.0.0.1:9/x".to_string(), None)
        .complete(&conversation())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::NotConfigured("GPT_API_KEY")));
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn streaming_relays_deltas_until_done() {
    let base = spawn_upstream().await;
    let stream = client(CompletionProvider::Gpt, format!("{base}/stream"), Some("k"))
        .stream(&conversation())
        .await
        .unwrap();

    let chunks: Vec<String> = stream
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(chunks, vec!["Hel", "lo"]);
}

#[tokio::test]
async fn streaming_surfaces_upstream_status_up_front() {
    let base = spawn_upstream().await;
    let err = client(CompletionProvider::SparkHttp, format!("{base}/denied"), Some("k"))
        .stream(&conversation())
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 401);
}

enum SparkScript {
    Reply,
    ErrorCode,
    AbnormalClose,
}

async fn spawn_spark(script: SparkScript) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let request = socket.next().await.unwrap().unwrap().into_text().unwrap();
        let request: Value = serde_json::from_str(&request).unwrap();
        let asked = request["payload"]["message"]["text"][0]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let app_id = request["header"]["app_id"].as_str().unwrap_or_default().to_string();

        match script {
            SparkScript::Reply => {
                let first = json!({
                    "header": {"code": 0, "status": 1},
                    "payload": {"choices": {"text": [{"content": format!("{app_id}:")}]}}
                });
                let last = json!({
                    "header": {"code": 0, "status": 2},
                    "payload": {"choices": {"text": [{"content": asked}]}}
                });
                socket.send(Message::Text(first.to_string())).await.unwrap();
                socket.send(Message::Text(last.to_string())).await.unwrap();
            }
            SparkScript::ErrorCode => {
                let frame = json!({"header": {"code": 10013, "message": "input rejected"}});
                socket.send(Message::Text(frame.to_string())).await.unwrap();
            }
            SparkScript::AbnormalClose => {
                socket
                    .close(Some(CloseFrame {
                        code: CloseCode::Error,
                        reason: "boom".into(),
                    }))
                    .await
                    .unwrap();
            }
        }
        while let Some(Ok(_)) = socket.next().await {}
    });
    format!("ws://{addr}/v3.1/chat")
}

fn spark_client(host_url: String) -> SparkWsClient {
    SparkWsClient::new(SparkWsConfig {
        host_url,
        app_id: Some("app-1".to_string()),
        api_key: Some("key".to_string()),
        api_secret: Some("secret".to_string()),
    })
}

fn spark_conversation() -> Vec<ChatMessage> {
    vec![ChatMessage::user("first"), ChatMessage::user("last one")]
}

#[tokio::test]
async fn spark_ws_accumulates_fragments() {
    let url = spawn_spark(SparkScript::Reply).await;
    let reply = spark_client(url).chat(&spark_conversation()).await.unwrap();
    assert_eq!(reply, "app-1:last one");
}

#[tokio::test]
async fn spark_ws_error_code_fails() {
    let url = spawn_spark(SparkScript::ErrorCode).await;
    let err = spark_client(url)
        .chat(&spark_conversation())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Upstream(ref message) if message == "input rejected"));
}

#[tokio::test]
async fn spark_ws_abnormal_close_is_a_connection_error() {
    let url = spawn_spark(SparkScript::AbnormalClose).await;
    let err = spark_client(url)
        .chat(&spark_conversation())
        .await
        .unwrap_err();
    match err {
        RelayError::Connection(message) => assert!(message.contains("1011")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn spark_ws_requires_credentials() {
    let client = SparkWsClient::new(SparkWsConfig {
        host_url: "ws://127.0.0.1:9/chat".to_string(),
        app_id: Some("app".to_string()),
        api_key: None,
        api_secret: Some("secret".to_string()),
    });
    let err = client.chat(&spark_conversation()).await.unwrap_err();
    assert!(matches!(err, RelayError::NotConfigured("SPARK_API_KEY")));
}
