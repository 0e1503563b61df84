//! Server-Sent Events for live moderation progress

use crate::auth::AuthSubject;
use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use streamsure_moderation::EventFilter;

#[utoipa::path(
    get,
    path = "/api/v0/events",
    tag = "moderation",
    params(
        ("token" = Option<String>, Query, description = "Bearer token for EventSource clients")
    ),
    responses(
        (status = 200, description = "Event stream of `progress` and `completion` events", content_type = "text/event-stream")
    ),
    security(("bearer_auth" = []))
)]
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Administrators watch every asset, everyone else only their own uploads.
    let filter = if subject.is_admin() {
        EventFilter::All
    } else {
        EventFilter::Owner(subject.id)
    };
    tracing::debug!(subject_id = %subject.id, ?filter, "Event subscriber connected");

    let stream = state
        .events
        .subscribe_stream(filter)
        .filter_map(|event| async move {
            Event::default()
                .event(event.kind())
                .json_data(&event)
                .ok()
                .map(Ok)
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
