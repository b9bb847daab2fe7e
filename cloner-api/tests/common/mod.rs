//! Common test utilities and helpers for cloner-api tests
//!
//! Builds an app over a temporary workspace root with fake git and editor
//! implementations, and wraps request plumbing.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use cloner_api::{create_app, AppState, ProgressMode, StreamSettings};
use cloner_provisioner::test_utils::{FakeEditor, FakeVcs};
use cloner_provisioner::{ProgressHub, Provisioner, WorkspaceLocator};
use tempfile::TempDir;
use tower::ServiceExt;

pub const SOURCE: &str = "https://example.com/team/project.git";

/// A test app plus handles to its fakes and its workspace root.
pub struct TestClient {
    pub app: Router,
    pub root: TempDir,
    pub vcs: FakeVcs,
    pub editor: FakeEditor,
    pub hub: ProgressHub,
}

impl TestClient {
    pub fn new(vcs: FakeVcs, editor: FakeEditor, mode: ProgressMode) -> Self {
        let root = TempDir::new().expect("Failed to create workspace root");
        let hub = ProgressHub::new();
        let provisioner = Provisioner::builder(
            WorkspaceLocator::new(root.path()),
            Arc::new(vcs.clone()),
            SOURCE,
        )
        .hub(hub.clone())
        .build();

        let state = AppState::new(
            provisioner,
            Arc::new(editor.clone()),
            StreamSettings {
                mode,
                milestone_interval: Duration::from_secs(1),
                wait_limit: Duration::from_secs(30),
            },
        );

        Self {
            app: create_app(state),
            root,
            vcs,
            editor,
            hub,
        }
    }

    /// Live progress, succeeding clone, working editor.
    pub fn default_client() -> Self {
        Self::new(FakeVcs::succeeding(), FakeEditor::new(), ProgressMode::Live)
    }

    pub async fn send_request(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send_request(request).await
    }

    pub async fn post_form(&self, uri: &str, body: &str) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_request(request).await
    }
}

/// Helper to extract a JSON body from an axum response
pub async fn extract_json_body<T>(response: Response<Body>) -> T
where
    T: serde::de::DeserializeOwned,
{
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    serde_json::from_slice(&body).expect("Failed to deserialize JSON")
}

/// Helper to extract a text body from an axum response
pub async fn extract_text_body(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    String::from_utf8(body.to_vec()).expect("Body is not UTF-8")
}

/// The `data:` payloads of a server-sent event stream body.
pub fn sse_data(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .map(|data| data.to_string())
        .collect()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get("location")
        .expect("Missing location header")
        .to_str()
        .unwrap()
        .to_string()
}
