use std::time::Duration;

use appbuild::{BuildRequest, BuildStatus, BuildType};
use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use buildclient::{poll_until_terminal, ClientError, GatewayClient, PollConfig, PollOutcome};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

async fn create(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["appName"].is_null() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "errors": ["App name is required"]})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "buildId": "Abc123_-Xyz9",
            "providerJobId": "eas-1",
            "status": "queued",
            "message": "Build started successfully on Expo Cloud"
        })),
    )
}

async fn status(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    match id.as_str() {
        "missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "Build not found"})),
        ),
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": "Internal server error"})),
        ),
        _ => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "id": id,
                "providerJobId": "eas-1",
                "status": "finished",
                "websiteUrl": "https://example.com",
                "appName": "Example",
                "packageName": "com.example.app",
                "buildType": "apk",
                "startedAt": "2026-01-01T00:00:00Z",
                "duration": "0m 30s",
                "downloadUrl": "https://expo.dev/artifacts/eas/x.apk",
                "logs": [
                    {
                        "timestamp": "2026-01-01T00:00:00Z",
                        "message": "Build queued on Expo EAS",
                        "type": "info"
                    }
                ]
            })),
        ),
    }
}

async fn spawn_gateway() -> String {
    let app = Router::new()
        .route("/api/build", post(create))
        .route("/api/build/:id", get(status));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn starts_a_build() {
    let client = GatewayClient::new(spawn_gateway().await);
    let req =
        BuildRequest::new("https://example.com", "Example", "com.example.app", BuildType::Apk);

    let started = client.start_build(&req).await.unwrap();

    assert_eq!(started.build_id, "Abc123_-Xyz9");
    assert_eq!(started.provider_job_id, "eas-1");
    assert_eq!(started.status, BuildStatus::Queued);
}

#[tokio::test]
async fn surfaces_validation_errors() {
    let client = GatewayClient::new(spawn_gateway().await);
    let req = BuildRequest {
        app_name: None,
        ..BuildRequest::new("https://example.com", "x", "com.example.app", BuildType::Apk)
    };

    match client.start_build(&req).await {
        Err(ClientError::Validation(errors)) => assert_eq!(errors, vec!["App name is required"]),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn maps_status_responses() {
    let client = GatewayClient::new(spawn_gateway().await);

    let view = client.build_status("Abc123_-Xyz9").await.unwrap();
    assert_eq!(view.status, BuildStatus::Finished);
    assert_eq!(view.logs.len(), 1);
    assert!(!view.status_unavailable);

    assert!(matches!(client.build_status("missing").await, Err(ClientError::NotFound(_))));
    match client.build_status("broken").await {
        Err(e @ ClientError::Api { status: 500, .. }) => assert!(e.is_transient()),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn polls_gateway_to_completion() {
    let client = GatewayClient::new(spawn_gateway().await);
    let config = PollConfig {
        interval: Duration::from_millis(10),
        max_attempts: 3,
    };

    let cancel = CancellationToken::new();
    let outcome = poll_until_terminal(&client, "Abc123_-Xyz9", &config, &cancel, |_| {})
        .await
        .unwrap();

    match outcome {
        PollOutcome::Terminal(view) => {
            assert_eq!(view.download_url.as_deref(), Some("https://expo.dev/artifacts/eas/x.apk"))
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
