use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use cloner_provisioner::WorkspaceId;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult, PageError},
    routes::UsernameParams,
    state::AppState,
    views::{render, IndexTemplate},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/check-workspace", get(check_workspace))
        .route("/workspace", get(workspace_view))
        .route("/clone", get(redirect_home).post(clone_workspace))
        .route("/open", get(redirect_home).post(open_workspace))
}

fn workspace_url(id: &WorkspaceId) -> String {
    format!("/workspace?username={}", id)
}

fn parse_page_id(params: &UsernameParams) -> Result<WorkspaceId, PageError> {
    let raw = params.username().ok_or_else(PageError::missing_username)?;
    Ok(WorkspaceId::parse(raw)?)
}

async fn redirect_home() -> Redirect {
    Redirect::to("/")
}

/// Home page; with a username it doubles as the workspace view.
async fn index(
    State(state): State<AppState>,
    Query(params): Query<UsernameParams>,
) -> Result<Response, PageError> {
    if params.username().is_none() {
        return Ok(render(&IndexTemplate::home()).into_response());
    }
    workspace_view(State(state), Query(params)).await
}

/// Existence check used by the client before it starts a clone.
async fn check_workspace(
    State(state): State<AppState>,
    Query(params): Query<UsernameParams>,
) -> ApiResult<Json<Value>> {
    let raw = params
        .username()
        .ok_or_else(|| ApiError::BadRequest("Username is required".to_string()))?;
    let id = WorkspaceId::parse(raw)?;

    let exists = state.provisioner.exists(&id);
    Ok(Json(json!({ "exists": exists })))
}

async fn workspace_view(
    State(state): State<AppState>,
    Query(params): Query<UsernameParams>,
) -> Result<Response, PageError> {
    if params.username().is_none() {
        return Ok(render(&IndexTemplate::home()).into_response());
    }
    let id = parse_page_id(&params)?;

    let locator = state.provisioner.locator();
    let page = IndexTemplate::workspace(
        id.as_str(),
        locator.path_for(&id).display().to_string(),
        locator.exists(&id),
    );
    Ok(render(&page).into_response())
}

async fn clone_workspace(
    State(state): State<AppState>,
    Form(params): Form<UsernameParams>,
) -> Result<Redirect, PageError> {
    let id = parse_page_id(&params)?;

    info!(workspace = %id, "Clone requested");
    let outcome = state.provisioner.provision(&id).await?;
    info!(workspace = %id, outcome = ?outcome, "Clone request finished");

    Ok(Redirect::to(&workspace_url(&id)))
}

async fn open_workspace(
    State(state): State<AppState>,
    Form(params): Form<UsernameParams>,
) -> Result<Redirect, PageError> {
    let id = parse_page_id(&params)?;

    if !state.provisioner.exists(&id) {
        return Err(PageError::new(
            StatusCode::NOT_FOUND,
            format!("Failed to open editor: workspace {} is not provisioned", id),
        ));
    }

    let path = state.provisioner.locator().path_for(&id);
    info!(workspace = %id, path = %path.display(), "Opening workspace in editor");
    state
        .editor
        .open(&path)
        .await
        .map_err(|e| PageError::editor(&e))?;

    Ok(Redirect::to(&format!("/?username={}", id)))
}
