//! Server-Sent Events endpoint for live reload.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};

use super::registry::{RELOAD_DATA, Subscription};
use crate::state::AppState;

/// Interval for SSE comment frames. Comments carry no event, but a failed
/// write lets the server notice clients that went away.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Handle `GET /livereload`.
///
/// Registers the connection and holds it open. The stream yields one
/// `data: update` frame when the next broadcast happens and then stays idle
/// until the client disconnects.
pub(crate) async fn livereload_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let subscription = state.registry.subscribe();
    tracing::debug!(clients = state.registry.len(), "Live reload client connected");

    let sse = Sse::new(reload_stream(subscription))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL));

    ([(header::CONNECTION, "keep-alive")], sse)
}

/// Turn a subscription into an endless SSE event stream.
fn reload_stream(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(subscription.into_receiver(), |mut receiver| async move {
        receiver
            .recv()
            .await
            .map(|_| (Ok(Event::default().data(RELOAD_DATA)), receiver))
    })
    .chain(stream::pending())
}
