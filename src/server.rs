use axum::extract::{DefaultBodyLimit, State};
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::state::{AppState, Permissions};
use crate::{assets, auth, download, events, storage, upload};

/// Builds the complete route table. Everything except the allow-listed
/// paths sits behind the session guard; the upload route additionally has
/// its body limit disabled.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(assets::index))
        .route("/style.css", get(assets::style))
        .route("/app.js", get(assets::script))
        .route("/logo", get(assets::logo))
        .route("/login", get(assets::login).post(auth::login))
        .route("/permissions", get(permissions))
        .route("/events", get(events::stream))
        .route("/list", get(storage::list))
        .route("/files/{*path}", get(download::download))
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::disable()),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth::guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /permissions`: lets the client UI adapt to the current flags
/// instead of probing with requests that would fail.
async fn permissions(State(state): State<AppState>) -> Json<Permissions> {
    Json(state.control.permissions())
}
