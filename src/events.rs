use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::state::AppState;

/// `GET /events`: long-lived server-sent-event stream. Subscribes to the
/// change bus on connect and emits one `data: update` frame per signal.
/// Dropping the connection drops the receiver, which is the unsubscription;
/// the subscriber set cannot grow past the set of open connections.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("event stream connected");
    let changes = BroadcastStream::new(state.control.subscribe());
    // A lagged receiver lost only content-free signals, so the lag marker
    // itself is emitted as one coalesced update frame.
    let frames = changes.map(|_| Ok::<_, Infallible>(Event::default().data("update")));
    Sse::new(frames).keep_alive(KeepAlive::default())
}
