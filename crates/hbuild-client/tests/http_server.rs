//! Drives `HttpBuildServer` against a local axum server.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;

use hbuild_client::{
    BuildServer, BuildSubmitter, FetchError, HttpBuildServer, LogStreamResponse, SubmitError,
};
use hbuild_core::{BuildTarget, PackageType};

#[derive(Default)]
struct Seen {
    builds: Vec<serde_json::Value>,
    last_event_ids: Vec<Option<String>>,
}

type Shared = Arc<Mutex<Seen>>;

async fn packages() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "packages": [
            {"name": "libfoo", "type": "source"},
            {"name": "gcc", "type": "tool", "stages": [
                {"stage_name": "pass1", "name": "gcc[pass1]", "package": "gcc"}
            ]}
        ]
    }))
}

async fn graph() -> Json<serde_json::Value> {
    Json(serde_json::json!({"nodes": ["a", "b"], "edges": [{"source": "a", "dest": "b"}]}))
}

async fn history() -> Json<serde_json::Value> {
    Json(serde_json::json!({"past_jobs": [
        {"id": 7, "runner": "local", "packages": ["a"], "created_at": "1700000000"}
    ]}))
}

async fn status(Path(name): Path<String>) -> Response {
    if name == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"detail": "missing is not a system, tool, or source package"})),
        )
            .into_response();
    }
    Json(serde_json::json!({"return_code": 2})).into_response()
}

/// Snapshot for `plain`, event stream for everything else.
async fn log(
    State(seen): State<Shared>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if name == "plain" {
        return Json(serde_json::json!({"logs": [
            {"id": 2, "package": "plain", "stage": "build", "log": "b", "created_at": ""},
            {"id": 1, "package": "plain", "stage": "build", "log": "a", "created_at": ""}
        ]}))
        .into_response();
    }
    if name == "garbage" {
        return "not json".into_response();
    }
    seen.lock().unwrap().last_event_ids.push(
        headers
            .get("last-event-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
    );
    let after: u64 = query.get("after").and_then(|a| a.parse().ok()).unwrap_or(0);
    let events = (after + 1..=after + 2).map(move |id| {
        let payload = serde_json::json!({
            "id": id, "package": name, "stage": "build", "log": format!("line {id}\n"), "created_at": ""
        });
        Ok::<_, Infallible>(
            Event::default()
                .id(id.to_string())
                .event("log")
                .data(payload.to_string()),
        )
    });
    Sse::new(futures::stream::iter(events)).into_response()
}

async fn build(State(seen): State<Shared>, Json(body): Json<serde_json::Value>) -> Response {
    let name = body["packages"][0]["name"].as_str().unwrap_or_default().to_string();
    seen.lock().unwrap().builds.push(body);
    if name == "nope" {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"detail": "Package nope does not exist or is not available."})),
        )
            .into_response();
    }
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"message": "Building packages"})),
    )
        .into_response()
}

async fn spawn_server() -> (String, Shared) {
    let seen: Shared = Arc::default();
    let app = Router::new()
        .route("/api/packages", get(packages))
        .route("/api/graph", get(graph))
        .route("/api/history", get(history))
        .route("/api/status/{name}", get(status))
        .route("/api/log/{name}", get(log))
        .route("/api/build", post(build))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

fn client(base: &str) -> HttpBuildServer {
    HttpBuildServer::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetches_typed_endpoints() {
    let (base, _) = spawn_server().await;
    let server = client(&base);

    let list = server.packages().await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.get("libfoo").unwrap().package_type, PackageType::Source);

    let graph = server.graph().await.unwrap();
    assert_eq!(graph.nodes, vec!["a", "b"]);

    let history = server.history().await.unwrap();
    assert_eq!(history.past_jobs[0].created_at, 1_700_000_000);

    let rc = server.return_code("gcc").await.unwrap();
    assert_eq!(rc.return_code, 2);
    assert!(!rc.succeeded());
}

#[tokio::test]
async fn http_errors_are_typed() {
    let (base, _) = spawn_server().await;
    let server = client(&base);

    let err = server.return_code("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    let err = server.logs("garbage").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let server = client(&format!("http://{addr}"));
    let err = server.packages().await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "{err}");
}

#[tokio::test]
async fn stream_request_falls_back_to_snapshot() {
    let (base, _) = spawn_server().await;
    let server = client(&base);
    match server.stream_logs("plain", None).await.unwrap() {
        LogStreamResponse::Snapshot(snapshot) => assert_eq!(snapshot.logs.len(), 2),
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_request_resumes_from_cursor() {
    let (base, seen) = spawn_server().await;
    let server = client(&base);
    let resp = server.stream_logs("libfoo", Some(5)).await.unwrap();
    let LogStreamResponse::Stream(stream) = resp else {
        panic!("expected event stream");
    };
    let body: Vec<u8> = stream
        .map(|chunk| chunk.unwrap().to_vec())
        .concat()
        .await;
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("id: 6"));
    assert!(text.contains("event: log"));
    assert!(text.contains("line 7"));
    assert_eq!(
        seen.lock().unwrap().last_event_ids,
        vec![Some("5".to_string())]
    );
}

#[tokio::test]
async fn submit_accepts_only_202() {
    let (base, seen) = spawn_server().await;
    let submitter = BuildSubmitter::new(Arc::new(client(&base)));
    let list = client(&base).packages().await.unwrap();

    let accepted = submitter
        .submit_package(list.get("libfoo").unwrap())
        .await
        .unwrap();
    assert_eq!(accepted.request.build_to, BuildTarget::Build);
    assert_eq!(
        seen.lock().unwrap().builds[0],
        serde_json::json!({"build_to": "build", "packages": [{"name": "libfoo", "stage": null}]})
    );

    let mut nope = list.get("libfoo").unwrap().clone();
    nope.name = "nope".into();
    let err = submitter.submit_package(&nope).await.unwrap_err();
    assert!(matches!(err, SubmitError::Rejected { status: 404, .. }));
    assert_eq!(seen.lock().unwrap().builds.len(), 2);
}
