//! OpenAi against an in-process stand-in for the chat completions endpoint.

use ai_client::{AiError, Completion, CompletionRequest, OpenAi};
use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1")
}

#[tokio::test]
async fn returns_first_choice_text() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["model"], "gpt-4o-mini");
            assert_eq!(body["messages"][0]["role"], "user");
            assert_eq!(body["response_format"]["type"], "json_schema");
            Json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  {\"ok\": true} " } }]
            }))
        }),
    );
    let base = serve(router).await;

    #[derive(serde::Deserialize, schemars::JsonSchema)]
    struct Pong {
        ok: bool,
    }

    let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(base);
    let reply: Pong = ai_client::extract(&ai, CompletionRequest::new().user("ping"))
        .await
        .unwrap();
    assert!(reply.ok);
}

#[tokio::test]
async fn non_success_status_is_api_error() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let base = serve(router).await;

    let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(base);
    let err = ai
        .complete(CompletionRequest::new().user("ping"))
        .await
        .unwrap_err();
    match err {
        AiError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_is_empty_response() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({ "choices": [] })) }),
    );
    let base = serve(router).await;

    let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(base);
    let err = ai
        .complete(CompletionRequest::new().user("ping"))
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::EmptyResponse));
}

#[tokio::test]
async fn unreachable_endpoint_is_network_error() {
    let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url("http://127.0.0.1:9/v1");
    let err = ai
        .complete(CompletionRequest::new().user("ping"))
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Network(_)));
}
