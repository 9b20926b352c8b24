use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use kb_core::persist::save_index;
use kb_core::{build, BuildOptions, SourceDoc};
use kb_server::{router, AppState};
use serde_json::Value;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const TOKEN: &str = "secret";

fn write_tiny_index(path: &Path) {
    let index = build(
        vec![
            SourceDoc::new("a.txt", "Urusobanuro rwasomwe muri a.txt", "ubuzima bwiza"),
            SourceDoc::new("b.txt", "Urusobanuro rwasomwe muri b.txt", "amashuri meza"),
            SourceDoc::new("c.txt", "Urusobanuro rwasomwe muri c.txt", "ubuzima n'amashuri"),
        ],
        &BuildOptions::default(),
    );
    save_index(path, &index).unwrap();
}

fn app(path: &Path) -> Router {
    router(AppState::load(path, Some(TOKEN.to_string())).unwrap())
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn reload(token: &str) -> Request<Body> {
    Request::post("/reload").header("X-ADMIN-TOKEN", token).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.json");
    write_tiny_index(&path);

    let (status, json) = call(app(&path), get("/search?q=ubuzima%20bwiza&k=5")).await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["document_id"], "a.txt");
    assert_eq!(arr[1]["document_id"], "c.txt");
    assert!(arr[0]["score"].as_f64().unwrap() > arr[1]["score"].as_f64().unwrap());
    assert_eq!(json["total_hits"], 2);

    let (_, json) = call(app(&path), get("/search?q=ubuzima&k=1")).await;
    assert_eq!(json["results"].as_array().unwrap().len(), 1);

    let (_, json) = call(app(&path), get("/search?q=inka")).await;
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_index_then_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.json");
    let app = app(&path);

    let (status, _) = call(app.clone(), get("/search?q=ubuzima")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, json) = call(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["documents"].is_null());

    let (status, _) = call(app.clone(), reload(TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    write_tiny_index(&path);
    let (status, _) = call(app.clone(), reload("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, json) = call(app.clone(), reload(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["documents"], 3);

    let (status, json) = call(app, get("/search?q=amashuri")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn failed_reload_keeps_serving_previous_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.json");
    write_tiny_index(&path);
    let app = app(&path);

    std::fs::write(&path, "{ not json").unwrap();
    let (status, _) = call(app.clone(), reload(TOKEN)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, json) = call(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["documents"], 3);
    let (status, json) = call(app, get("/search?q=ubuzima")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn k_is_clamped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.json");
    let docs = (0..150).map(|i| SourceDoc::new(format!("{i}.txt"), "", format!("inka {i}")));
    save_index(&path, &build(docs, &BuildOptions::default())).unwrap();
    let app = app(&path);

    let (status, json) = call(app.clone(), get("/search?q=inka&k=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"].as_array().unwrap().len(), 1);

    let (_, json) = call(app.clone(), get("/search?q=inka&k=1000")).await;
    assert_eq!(json["results"].as_array().unwrap().len(), 100);

    let (_, json) = call(app, get("/search?q=inka")).await;
    assert_eq!(json["results"].as_array().unwrap().len(), 6);
}

#[test]
fn corrupt_index_fails_startup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.json");
    std::fs::write(&path, "[]").unwrap();
    assert!(AppState::load(&path, None).is_err());
}
