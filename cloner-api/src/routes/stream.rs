use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use cloner_provisioner::{live_milestones, scripted_milestones, WorkspaceId};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use tracing::{debug, info};

use crate::{
    config::ProgressMode,
    error::{ApiError, ApiResult},
    routes::UsernameParams,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/stream", get(stream_progress))
}

/// Server-sent milestones for one client session.
///
/// Each milestone is one `data:` event. The stream ends after the final
/// milestone; a client disconnect drops it, which stops any further output.
async fn stream_progress(
    State(state): State<AppState>,
    Query(params): Query<UsernameParams>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let raw = params
        .username()
        .ok_or_else(|| ApiError::BadRequest("Username is required".to_string()))?;
    let id = WorkspaceId::parse(raw)?;

    let settings = state.streams;
    info!(workspace = %id, mode = ?settings.mode, "Progress stream opened");

    let milestones: BoxStream<'static, String> = match settings.mode {
        ProgressMode::Scripted => scripted_milestones(settings.milestone_interval).boxed(),
        ProgressMode::Live => {
            live_milestones(state.provisioner.hub(), &id, settings.wait_limit).boxed()
        }
    };

    let events = milestones.map(move |milestone| {
        debug!(workspace = %id, milestone = %milestone, "Sending milestone");
        Ok(Event::default().data(milestone))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
