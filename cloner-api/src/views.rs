use askama::Template;
use axum::response::Html;
use tracing::error;

use crate::error::ApiError;

pub const PAGE_TITLE: &str = "GitHub Repository Cloner";

/// The single page: the username form, or the workspace view when a
/// username is set. An error banner is shown when `error` is non-empty.
#[derive(Template, Default)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub username: String,
    pub workspace: String,
    pub cloned: bool,
    pub error: String,
}

impl IndexTemplate {
    pub fn home() -> Self {
        Self {
            title: PAGE_TITLE.to_string(),
            ..Self::default()
        }
    }

    pub fn workspace(username: &str, workspace: String, cloned: bool) -> Self {
        Self {
            title: PAGE_TITLE.to_string(),
            username: username.to_string(),
            workspace,
            cloned,
            error: String::new(),
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            title: PAGE_TITLE.to_string(),
            error: message,
            ..Self::default()
        }
    }
}

pub fn render(template: &IndexTemplate) -> Result<Html<String>, ApiError> {
    template.render().map(Html).map_err(|e| {
        error!("Template render error: {}", e);
        ApiError::Internal(format!("Template render error: {}", e))
    })
}
