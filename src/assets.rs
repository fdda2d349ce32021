use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use mime_guess::from_path;
use rust_embed::RustEmbed;

use crate::error::AppError;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// Injected into the logo SVG so the browser renders it in the accent color.
const LOGO_TINT: &str =
    "<style>path,circle,rect,polygon,ellipse{fill:#00cbff !important;}</style>";

pub async fn index() -> Result<Html<String>, AppError> {
    Ok(Html(load_text("index.html")?))
}

pub async fn style() -> Result<Response, AppError> {
    serve("style.css")
}

pub async fn script() -> Result<Response, AppError> {
    serve("app.js")
}

pub async fn login() -> Html<String> {
    login_page(None)
}

/// `GET /logo`: the embedded SVG with the tint style injected before the
/// closing tag (appended if the markup has none).
pub async fn logo() -> Result<Response, AppError> {
    let svg = load_text("logo.svg")?;
    let recolored = if svg.contains("</svg>") {
        svg.replace("</svg>", &format!("{LOGO_TINT}</svg>"))
    } else {
        format!("{svg}{LOGO_TINT}")
    };
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], recolored).into_response())
}

/// Login page with the `{{ERROR}}` placeholder substituted.
pub fn login_page(error: Option<&str>) -> Html<String> {
    let page = load_text("login.html")
        .map(|page| page.replace("{{ERROR}}", error.unwrap_or("")))
        .unwrap_or_else(|_| "<h1>Login</h1><p>UI assets unavailable.</p>".to_string());
    Html(page)
}

fn serve(name: &str) -> Result<Response, AppError> {
    let asset = Assets::get(name).ok_or(AppError::NotFound)?;
    let mime = from_path(name).first_or_octet_stream();
    Ok((
        [(header::CONTENT_TYPE, mime.as_ref())],
        asset.data.into_owned(),
    )
        .into_response())
}

fn load_text(name: &str) -> Result<String, AppError> {
    let asset = Assets::get(name).ok_or(AppError::NotFound)?;
    String::from_utf8(asset.data.into_owned())
        .map_err(|_| AppError::Internal(format!("asset {name} is not valid UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_assets_are_present() {
        for name in ["index.html", "login.html", "style.css", "app.js", "logo.svg"] {
            assert!(Assets::get(name).is_some(), "missing asset {name}");
        }
    }

    #[test]
    fn login_page_substitutes_error_placeholder() {
        let page = login_page(Some("Incorrect PIN"));
        assert!(page.0.contains("Incorrect PIN"));
        assert!(!page.0.contains("{{ERROR}}"));

        let clean = login_page(None);
        assert!(!clean.0.contains("{{ERROR}}"));
        assert!(!clean.0.contains("Incorrect PIN"));
    }

    #[tokio::test]
    async fn logo_is_served_as_svg() {
        let response = logo().await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    }

    #[test]
    fn logo_markup_has_a_closing_tag_for_tint_injection() {
        let svg = load_text("logo.svg").unwrap();
        assert!(svg.contains("</svg>"));
        let recolored = svg.replace("</svg>", &format!("{LOGO_TINT}</svg>"));
        assert!(recolored.contains(LOGO_TINT));
    }
}
