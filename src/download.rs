use std::path::Path;
use std::process::Stdio;

use axum::body::Body;
use axum::extract::{Path as RoutePath, State};
use axum::http::header;
use axum::response::Response;
use futures_util::StreamExt;
use mime_guess::from_path;
use percent_encoding::{percent_encode, NON_ALPHANUMERIC};
use tokio::fs::{self, File};
use tokio::process::Command;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

// 1MB read buffer for large transfers.
const CHUNK_SIZE: usize = 1024 * 1024;

/// `GET /files/{*path}`: streams a file, or a zip of the directory when the
/// path resolves to one.
pub async fn download(
    State(state): State<AppState>,
    RoutePath(path): RoutePath<String>,
) -> Result<Response, AppError> {
    if !state.control.read_allowed() {
        return Err(AppError::Forbidden);
    }
    let target = state.storage.resolve(&path)?;
    let meta = fs::metadata(&target).await?;
    if meta.is_dir() {
        stream_archive(&target).await
    } else {
        stream_file(&target, meta.len()).await
    }
}

async fn stream_file(path: &Path, size: u64) -> Result<Response, AppError> {
    let file = File::open(path).await?;
    let stream = ReaderStream::with_capacity(file, CHUNK_SIZE);
    let mime = from_path(path).first_or_octet_stream();
    info!(path = %path.display(), size, "serving file");
    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, size.to_string())
        .body(Body::from_stream(stream))
        .map_err(|err| AppError::Internal(err.to_string()))
}

/// Pipes `zip -r -q - <name>` (cwd: the directory's parent) into the
/// response body. No temporary archive on disk, no buffering of the whole
/// archive in memory; stderr is discarded. A spawn failure turns into a 500
/// before any bytes are sent.
async fn stream_archive(dir: &Path) -> Result<Response, AppError> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("archive")
        .to_string();
    let parent = dir.parent().ok_or(AppError::Forbidden)?;

    let mut child = Command::new("zip")
        .args(["-r", "-q", "-"])
        .arg(&name)
        .current_dir(parent)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| AppError::Internal(format!("failed to start zip: {err}")))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Internal("zip stdout unavailable".into()))?;

    info!(dir = %dir.display(), "streaming zip archive");

    // The body stream owns the child: when the client disconnects the stream
    // is dropped, the subprocess is killed, and the runtime reaps it.
    let stream = ReaderStream::with_capacity(stdout, CHUNK_SIZE).map(move |chunk| {
        let _keepalive = &child;
        chunk
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&format!("{name}.zip")),
        )
        .body(Body::from_stream(stream))
        .map_err(|err| AppError::Internal(err.to_string()))
}

/// RFC 5987 Content-Disposition with both the escaped plain name and the
/// UTF-8 encoded variant.
fn content_disposition(name: &str) -> String {
    let encoded = percent_encode(name.as_bytes(), NON_ALPHANUMERIC);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        name.replace('"', "\\\""),
        encoded
    )
}
