use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::assets;
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "auth";

/// Paths reachable without a session: the login flow needs its own assets,
/// and an unauthenticated client must still be able to observe connectivity
/// through the event stream and the permission flags.
const PUBLIC_PATHS: &[&str] = &[
    "/login",
    "/style.css",
    "/app.js",
    "/logo",
    "/events",
    "/permissions",
];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Session guard run on every request. A missing or stale cookie never
/// produces a bare error: the response body becomes the login page instead
/// of the requested resource.
pub async fn guard(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }
    let authorized = jar
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value() == state.control.pin())
        .unwrap_or(false);
    if authorized {
        return next.run(req).await;
    }
    debug!(path = req.uri().path(), "unauthenticated request, serving login page");
    assets::login_page(None).into_response()
}

#[derive(Deserialize)]
struct LoginForm {
    pin: String,
}

/// `POST /login`. On a match, the session cookie is set to the PIN itself;
/// the session stays valid exactly as long as the PIN does.
pub async fn login(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> Response {
    let submitted = extract_pin(&body);
    if !submitted.is_empty() && submitted == state.control.pin() {
        info!("client authenticated");
        let cookie = Cookie::build((AUTH_COOKIE, submitted))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        (jar.add(cookie), Redirect::to("/")).into_response()
    } else {
        warn!("login attempt with wrong PIN");
        (
            StatusCode::UNAUTHORIZED,
            assets::login_page(Some("Incorrect PIN")),
        )
            .into_response()
    }
}

/// The PIN arrives either as a `pin` form field or as a raw text body.
fn extract_pin(body: &[u8]) -> String {
    if let Ok(form) = serde_urlencoded::from_bytes::<LoginForm>(body) {
        return form.pin;
    }
    String::from_utf8_lossy(body).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_pin_from_form_body() {
        assert_eq!(extract_pin(b"pin=1234"), "1234");
        assert_eq!(extract_pin(b"pin=0042&other=x"), "0042");
    }

    #[test]
    fn extracts_pin_from_raw_body() {
        assert_eq!(extract_pin(b"1234"), "1234");
        assert_eq!(extract_pin(b"  5678\n"), "5678");
    }

    #[test]
    fn login_path_and_assets_are_public() {
        for path in ["/login", "/style.css", "/app.js", "/logo", "/events", "/permissions"] {
            assert!(is_public_path(path), "{path} should be public");
        }
        assert!(!is_public_path("/"));
        assert!(!is_public_path("/list"));
        assert!(!is_public_path("/files/a.txt"));
        assert!(!is_public_path("/upload"));
    }
}
