use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use smartdecision_ai::{
    provider::{ChunkSink, Choice, ChoiceMessage},
    AiError, ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatProvider,
    ProviderRegistry, ProviderSettings,
};
use smartdecision_core::configs::ProviderKind;
use smartdecision_server::{api::app_router, build_state_with_registry, config::Config};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const USER: &str = "user-1";

/// Answers "pong", streamed as "po" + "ng".
struct PongProvider;

#[async_trait]
impl ChatProvider for PongProvider {
    fn name(&self) -> &str {
        "pong"
    }

    async fn complete(
        &self,
        _request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AiError> {
        Ok(ChatCompletionResponse {
            choices: vec![Choice {
                message: Some(ChoiceMessage {
                    role: Some("assistant".into()),
                    content: Some("pong".into()),
                }),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    async fn stream_complete(
        &self,
        _request: ChatCompletionRequest,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<(), AiError> {
        for part in ["po", "ng"] {
            on_chunk(ChatCompletionChunk {
                choices: vec![Choice {
                    delta: Some(ChoiceMessage {
                        role: None,
                        content: Some(part.into()),
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            })?;
        }
        Ok(())
    }
}

async fn build_test_router() -> (Router, TempDir) {
    let tmp = tempdir().unwrap();
    let config = Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        db_path: tmp.path().join("test.db").to_string_lossy().to_string(),
        cors_allow: vec!["*".to_string()],
        request_timeout: Duration::from_secs(30),
        upload_dir: tmp.path().join("uploads").to_string_lossy().to_string(),
        ingest_workers: 2,
        providers: ProviderSettings::default(),
    };
    let registry =
        ProviderRegistry::new().with_provider(ProviderKind::DeepSeek, Arc::new(PongProvider));
    let state = build_state_with_registry(&config, registry).await.unwrap();
    (app_router(state, &config), tmp)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let (status, bytes) = send(app, builder.body(body).unwrap()).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn multipart_upload(file_name: &str, content: &str, user: &str) -> Request<Body> {
    let boundary = "sd-test-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n--{boundary}--\r\n"
    );
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/knowledge/upload")
        .header("x-user-id", user)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn healthz_works() {
    let (app, _tmp) = build_test_router().await;
    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/api/v1/healthz")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let (app, _tmp) = build_test_router().await;
    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/api/v1/ai/configs")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "UNAUTHORIZED");

    let (status, _) = call(&app, Method::GET, "/api/v1/ai/configs", "   ", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn default_config_lifecycle() {
    let (app, _tmp) = build_test_router().await;

    let (status, configs) = call(&app, Method::GET, "/api/v1/ai/configs", USER, None).await;
    assert_eq!(status, StatusCode::OK);
    let configs = configs.as_array().unwrap().clone();
    assert_eq!(configs.len(), 2);
    assert_eq!(configs.iter().filter(|c| c["isDefault"] == true).count(), 1);

    let (_, default) = call(&app, Method::GET, "/api/v1/ai/configs/default", USER, None).await;
    assert_eq!(default["provider"], "deepseek");
    let default_id = default["id"].as_str().unwrap().to_string();
    let other_id = configs
        .iter()
        .find(|c| c["id"] != default["id"])
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let uri = format!("/api/v1/ai/configs/{default_id}");
    let (status, error) = call(&app, Method::DELETE, &uri, USER, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "CANNOT_DELETE_DEFAULT");

    let (status, promoted) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/ai/configs/{other_id}"),
        USER,
        Some(json!({ "isDefault": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["isDefault"], true);

    let (status, _) = call(&app, Method::DELETE, &uri, USER, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, &uri, USER, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let (app, _tmp) = build_test_router().await;
    let (status, error) = call(
        &app,
        Method::POST,
        "/api/v1/ai/configs",
        USER,
        Some(json!({
            "modelName": "deepseek-chat",
            "temperature": 1.5,
            "maxTokens": 100,
            "provider": "deepseek"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn chat_creates_and_manages_session() {
    let (app, _tmp) = build_test_router().await;
    let message = "Should I move to a bigger flat closer to the office?";

    let (status, reply) = call(
        &app,
        Method::POST,
        "/api/v1/chat",
        USER,
        Some(json!({ "message": message })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["message"]["content"], "pong");
    assert_eq!(reply["message"]["role"], "assistant");
    let session_id = reply["sessionId"].as_str().unwrap().to_string();

    let (_, sessions) = call(&app, Method::GET, "/api/v1/chat/sessions", USER, None).await;
    assert_eq!(sessions["total"], 1);
    let expected_title: String = message.chars().take(30).collect();
    assert_eq!(sessions["items"][0]["title"], expected_title.as_str());
    assert_eq!(sessions["items"][0]["lastMessage"], "pong");

    let messages_uri = format!("/api/v1/chat/sessions/{session_id}/messages");
    let (_, messages) = call(&app, Method::GET, &messages_uri, USER, None).await;
    assert_eq!(messages["total"], 2);
    assert_eq!(messages["pageSize"], 20);
    assert_eq!(messages["items"][0]["role"], "user");
    assert_eq!(messages["items"][1]["role"], "assistant");

    let (status, _) = call(&app, Method::GET, &messages_uri, "someone-else", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let session_uri = format!("/api/v1/chat/sessions/{session_id}");
    let (status, renamed) = call(
        &app,
        Method::PUT,
        &session_uri,
        USER,
        Some(json!({ "title": "  Moving  " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Moving");

    let (status, _) = call(&app, Method::DELETE, &session_uri, USER, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, &messages_uri, USER, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_with_unconfigured_provider_fails() {
    let (app, _tmp) = build_test_router().await;
    let (_, configs) = call(&app, Method::GET, "/api/v1/ai/configs", USER, None).await;
    let kimi_id = configs
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["provider"] == "kimi")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, error) = call(
        &app,
        Method::POST,
        "/api/v1/chat",
        USER,
        Some(json!({ "message": "hi", "configId": kimi_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "UNKNOWN_PROVIDER");
}

#[tokio::test]
async fn chat_stream_sends_chunks_then_done() {
    let (app, _tmp) = build_test_router().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/chat/stream")
        .header("x-user-id", USER)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "message": "ping" }).to_string()))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let events: Vec<Value> = String::from_utf8(body)
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], json!({ "content": "po", "done": false }));
    assert_eq!(events[1], json!({ "content": "ng", "done": false }));
    assert_eq!(events[2]["done"], true);
    let session_id = events[2]["sessionId"].as_str().unwrap();

    let (_, messages) = call(
        &app,
        Method::GET,
        &format!("/api/v1/chat/sessions/{session_id}/messages"),
        USER,
        None,
    )
    .await;
    assert_eq!(messages["items"][1]["content"], "pong");
}

#[tokio::test]
async fn blank_stream_message_is_rejected() {
    let (app, _tmp) = build_test_router().await;
    let (status, error) = call(
        &app,
        Method::POST,
        "/api/v1/chat/stream",
        USER,
        Some(json!({ "message": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn knowledge_upload_is_ingested() {
    let (app, _tmp) = build_test_router().await;

    let (status, body) = send(&app, multipart_upload("Notes.TXT", "hello knowledge", USER)).await;
    assert_eq!(status, StatusCode::CREATED);
    let file: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(file["fileType"], "txt");
    assert!(file.get("filePath").is_none());
    let file_uri = format!("/api/v1/knowledge/{}", file["id"].as_str().unwrap());

    let mut detail = Value::Null;
    for _ in 0..100 {
        let (_, current) = call(&app, Method::GET, &file_uri, USER, None).await;
        if current["status"] == "completed" {
            detail = current;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["chunkCount"], 1);

    let (_, page) = call(&app, Method::GET, "/api/v1/knowledge", USER, None).await;
    assert_eq!(page["total"], 1);

    let (status, _) = call(&app, Method::GET, &file_uri, "someone-else", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, &file_uri, USER, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, &file_uri, USER, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn knowledge_upload_rejects_unsupported_type() {
    let (app, _tmp) = build_test_router().await;
    let (status, body) = send(&app, multipart_upload("script.exe", "MZ", USER)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], "INVALID_INPUT");
}
