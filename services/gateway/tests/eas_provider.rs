use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use appbuild::{BuildSpec, BuildStatus, BuildType};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use gateway::{
    config::EasCredentials,
    provider::{BuildProvider, ProviderError},
    provider_eas::EasProvider,
};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

fn remember_auth(rec: &Recorded, headers: &HeaderMap) {
    if let Some(v) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        rec.auth.lock().unwrap().push(v.to_string());
    }
}

async fn create(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    remember_auth(&rec, &headers);
    if body["projectId"] == "forbidden" {
        return (StatusCode::FORBIDDEN, Json(json!({"errors": [{"message": "no access"}]})));
    }
    rec.bodies.lock().unwrap().push(body);
    (StatusCode::OK, Json(json!({"data": {"id": "eas-42", "status": "new"}})))
}

async fn fetch(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    remember_auth(&rec, &headers);
    match id.as_str() {
        "eas-42" => (
            StatusCode::OK,
            Json(json!({"data": {
                "id": "eas-42",
                "status": "FINISHED",
                "artifacts": {"buildUrl": "https://expo.dev/artifacts/eas/42.apk"},
                "completedAt": "2026-03-01T10:00:00Z"
            }})),
        ),
        "eas-err" => (
            StatusCode::OK,
            Json(json!({"data": {
                "id": "eas-err",
                "status": "errored",
                "error": {"message": "Gradle failed"}
            }})),
        ),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            (StatusCode::OK, Json(json!({"data": {"id": "slow", "status": "new"}})))
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({"errors": [{"message": "not found"}]}))),
    }
}

async fn spawn_eas() -> (String, Recorded) {
    let rec = Recorded::default();
    let app = Router::new()
        .route("/v2/builds", post(create))
        .route("/v2/builds/:id", get(fetch))
        .with_state(rec.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), rec)
}

fn provider(base: &str, project_id: &str, timeout: Duration) -> EasProvider {
    let creds = EasCredentials {
        token: "tok-123".into(),
        project_id: project_id.into(),
    };
    EasProvider::new(base.to_string(), creds, timeout).unwrap()
}

fn spec(build_type: BuildType) -> BuildSpec {
    BuildSpec {
        website_url: "https://example.com".into(),
        app_name: "Example".into(),
        package_name: "com.example.app".into(),
        build_type,
    }
}

#[tokio::test]
async fn create_sends_profile_and_env() {
    let (base, rec) = spawn_eas().await;
    let eas = provider(&base, "proj-1", Duration::from_secs(5));

    let job = eas.create_build(&spec(BuildType::Aab)).await.unwrap();
    assert_eq!(job.id, "eas-42");
    assert_eq!(job.snapshot().unwrap().status, BuildStatus::Queued);

    let bodies = rec.bodies.lock().unwrap();
    let body = &bodies[0];
    assert_eq!(body["projectId"], "proj-1");
    assert_eq!(body["platform"], "android");
    assert_eq!(body["profile"], "production");
    assert_eq!(body["metadata"]["credentialsSource"], "remote");
    assert_eq!(
        body["env"],
        json!({
            "APP_NAME": "Example",
            "APP_PACKAGE": "com.example.app",
            "WEBSITE_URL": "https://example.com"
        })
    );
    assert_eq!(rec.auth.lock().unwrap()[0], "Bearer tok-123");
}

#[tokio::test]
async fn rejection_carries_status_and_body() {
    let (base, _rec) = spawn_eas().await;
    let eas = provider(&base, "forbidden", Duration::from_secs(5));

    match eas.create_build(&spec(BuildType::Apk)).await {
        Err(ProviderError::Rejected {
            status,
            status_text,
            body,
        }) => {
            assert_eq!(status, 403);
            assert_eq!(status_text, "Forbidden");
            assert!(body.contains("no access"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn get_maps_artifacts_and_errors() {
    let (base, _rec) = spawn_eas().await;
    let eas = provider(&base, "proj-1", Duration::from_secs(5));

    let done = eas.get_build("eas-42").await.unwrap().snapshot().unwrap();
    assert_eq!(done.status, BuildStatus::Finished);
    assert_eq!(done.artifact_url.as_deref(), Some("https://expo.dev/artifacts/eas/42.apk"));
    assert!(done.completed_at.is_some());

    let failed = eas.get_build("eas-err").await.unwrap().snapshot().unwrap();
    assert_eq!(failed.status, BuildStatus::Error);
    assert_eq!(failed.error_message.as_deref(), Some("Gradle failed"));

    assert!(matches!(eas.get_build("gone").await, Err(ProviderError::NotFound(_))));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let (base, _rec) = spawn_eas().await;
    let eas = provider(&base, "proj-1", Duration::from_millis(200));

    let err = eas.get_build("slow").await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout));
    assert!(err.is_transient());
}
