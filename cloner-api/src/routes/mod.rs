pub mod health;
pub mod stream;
pub mod workspaces;

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// `username` as sent in query strings and form bodies.
#[derive(Debug, Default, Deserialize)]
pub struct UsernameParams {
    pub username: Option<String>,
}

impl UsernameParams {
    /// The username, or `None` when absent or empty.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(workspaces::routes())
        .merge(stream::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
