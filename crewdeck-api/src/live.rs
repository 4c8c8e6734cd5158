use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/vas/{va_id}/stream", get(va_stream))
}

/// Live operations feed for one airline. Every subscriber sits on the same
/// broadcast channel; events for other airlines are filtered out here.
async fn va_stream(
    State(state): State<AppState>,
    Path(va_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.va_id() == va_id => serde_json::to_string(&event)
                .ok()
                .map(|data| Ok(Event::default().event("ops").data(data))),
            // Wrong airline, or this receiver lagged behind; keep streaming.
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
