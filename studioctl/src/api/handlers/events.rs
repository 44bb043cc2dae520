use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::warn;

use crate::{AppState, auth::CurrentActor, events::ReservationEvent};

/// Live reservation changes as server-sent events
#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    summary = "Subscribe to reservation events",
    description = "Streams every committed reservation state change (created, approved, \
                   cancelled) as `reservation` SSE events",
    responses(
        (status = 200, description = "SSE stream of ReservationEvent payloads", body = ReservationEvent),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn stream_events(
    State(state): State<AppState>,
    _actor: CurrentActor,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|item| async move {
        match item {
            Ok(event) => match Event::default().event("reservation").json_data(&event) {
                Ok(sse_event) => Some(Ok(sse_event)),
                Err(err) => {
                    warn!(error = %err, "failed to serialize reservation event");
                    None
                }
            },
            // A slow subscriber dropped events; the stream continues from
            // the live edge.
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "event subscriber lagged");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
