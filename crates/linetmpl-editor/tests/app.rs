// SPDX-License-Identifier: Apache-2.0 OR MIT
use linetmpl_editor::{
    render_html, App, Control, EditorError, EditorEvent, HttpTreeSource, DEFAULT_PATTERN,
};
use linetmpl_engine::Template;
use reqwest::Url;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_with_tree() -> MockServer {
    let server = MockServer::start().await;
    let tree = Template::parse_str("1", DEFAULT_PATTERN).unwrap().tree();
    Mock::given(method("GET"))
        .and(path("/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": tree })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn demo_app_starts_empty_then_loads_tree() {
    let server = server_with_tree().await;
    let source = HttpTreeSource::new(Url::parse(&server.uri()).unwrap());
    let mut app = App::demo(source);

    assert!(app.editor().controls().is_empty());
    assert!(render_html(app.editor()).ends_with(&format!("</div>{DEFAULT_PATTERN}</div>")));

    app.mount().await.expect("tree loads");
    let controls = app.editor().controls();
    assert_eq!(controls.len(), 15);
    let selects = controls
        .iter()
        .filter(|c| matches!(c, Control::FieldSelect { .. }))
        .count();
    assert_eq!(selects, 7);
}

#[tokio::test]
async fn edits_after_mount_change_local_tree_only() {
    let server = server_with_tree().await;
    let source = HttpTreeSource::new(Url::parse(&server.uri()).unwrap());
    let mut app = App::demo(source);
    app.mount().await.unwrap();

    assert!(app.dispatch(EditorEvent::TextChanged {
        index: 14,
        value: ".png".into()
    }));
    assert!(app.dispatch(EditorEvent::NodeRemoved { index: 13 }));
    let tree = app.editor().tree().unwrap();
    assert!(tree.to_template_string().ends_with("[.违法代码]_.png"));

    // The pattern prop is static unless preview is on.
    assert_eq!(app.editor().pattern(), DEFAULT_PATTERN);
}

#[tokio::test]
async fn missing_template_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "NotFound", "message": "template 1 not found"}
        })))
        .mount(&server)
        .await;

    let source = HttpTreeSource::new(Url::parse(&server.uri()).unwrap());
    let mut app = App::demo(source);
    let err = app.mount().await.unwrap_err();
    assert!(matches!(err, EditorError::Status { status: 404, .. }));
    assert!(app.editor().controls().is_empty());
}
