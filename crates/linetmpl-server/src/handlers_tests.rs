//! Tests for handlers module

use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::routes::create_router;

const PATTERN: &str = "/[.日期]/[.车牌]_[.序号].jpg";

/// Templates directory holding `1.tpl`, a broken template and a subdirectory.
fn test_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("1.tpl"), PATTERN).expect("write 1.tpl");
    std::fs::write(dir.path().join("broken.tpl"), "a[range .x]b").expect("write broken.tpl");
    std::fs::create_dir(dir.path().join("dir.tpl")).expect("create dir.tpl");
    dir
}

fn test_app(dir: &TempDir) -> Router {
    create_router(AppState::new(
        dir.path(),
        vec!["日期".to_string(), "车牌".to_string(), "序号".to_string()],
    ))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    let json = serde_json::from_slice(&body).expect("json body");
    (status, json)
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_returns_json() {
    let response = health_check().await;

    assert_eq!(response.0.status, "healthy");
    assert_eq!(response.0.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_route() {
    let dir = test_dir();
    let (status, json) = get_json(test_app(&dir), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

// ============================================================================
// Tree Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_get_tree_wraps_tree_in_data() {
    let dir = test_dir();
    let (status, json) = get_json(test_app(&dir), "/1").await;

    assert_eq!(status, StatusCode::OK);
    let nodes = json["data"]["nodes"].as_array().expect("nodes array");
    // "/" [.日期] "/" [.车牌] "_" [.序号] ".jpg"
    assert_eq!(nodes.len(), 7);
    assert_eq!(nodes[0]["nodeType"], "TEXT");
    assert_eq!(nodes[0]["text"], "/");
    assert_eq!(nodes[1]["nodeType"], "ACTION");
    assert_eq!(nodes[1]["pos"], 2);
    assert_eq!(nodes[1]["line"], 1);
    let command = &nodes[1]["pipe"]["cmds"][0];
    assert_eq!(command["nodeType"], "COMMAND");
    assert_eq!(command["args"][0]["nodeType"], "FIELD");
    assert_eq!(command["args"][0]["ident"][0], "日期");
    assert_eq!(nodes[6]["text"], ".jpg");
}

#[tokio::test]
async fn test_get_tree_decodes_with_editor_envelope() {
    let dir = test_dir();
    let (status, body) = get(test_app(&dir), "/1").await;

    assert_eq!(status, StatusCode::OK);
    let tree = linetmpl_editor::decode_envelope(&body).expect("decode tree");
    assert_eq!(tree.to_template_string(), PATTERN);
}

#[tokio::test]
async fn test_get_tree_missing_template() {
    let dir = test_dir();
    let (status, json) = get_json(test_app(&dir), "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NotFound");
    assert_eq!(json["error"]["message"], "template nope not found");
}

#[tokio::test]
async fn test_get_tree_parse_error() {
    let dir = test_dir();
    let (status, json) = get_json(test_app(&dir), "/broken").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "ParseError");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(
        message.contains("unsupported control structure \"range\""),
        "unexpected message: {message}"
    );
}

#[tokio::test]
async fn test_get_tree_read_error_hides_details() {
    let dir = test_dir();
    let (status, json) = get_json(test_app(&dir), "/dir").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "InternalError");
    assert_eq!(json["error"]["message"], "template dir could not be read");
}

#[tokio::test]
async fn test_get_tree_rejects_traversal() {
    let dir = test_dir();
    let (status, json) = get_json(test_app(&dir), "/..%2F1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "ValidationError");
}

#[test]
fn test_validate_name() {
    assert!(validate_name("1").is_ok());
    assert!(validate_name("file-name.v2").is_ok());
    assert!(validate_name("").is_err());
    assert!(validate_name("..").is_err());
    assert!(validate_name("a/b").is_err());
    assert!(validate_name("a\\b").is_err());
}

// ============================================================================
// Editor Page Tests
// ============================================================================

#[tokio::test]
async fn test_get_editor_renders_controls() {
    let dir = test_dir();
    let (status, body) = get(test_app(&dir), "/1/editor").await;

    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("class=\"inline-editor flex-inline\""));
    assert_eq!(html.matches("<select").count(), 3);
    assert!(html.contains("value=\"车牌\" selected>车牌</option>"));
}

#[tokio::test]
async fn test_get_editor_preview_shows_pattern() {
    let dir = test_dir();
    let (status, body) = get(test_app(&dir), "/1/editor?preview=true").await;

    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains(PATTERN));
}

#[tokio::test]
async fn test_get_editor_missing_template() {
    let dir = test_dir();
    let (status, _) = get(test_app(&dir), "/nope/editor").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
