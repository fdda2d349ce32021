use std::path::Path;

use axum::body::Body;
use axum::extract::{Query, State};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UploadQuery {
    /// Desired relative path; may contain `/` separators for folder uploads.
    pub name: String,
}

/// `POST /upload?name=<rel>`: streams the request body straight to disk,
/// creating intermediate directories as needed. The body limit is disabled
/// on this route, so the transfer size is effectively unbounded.
///
/// A mid-stream failure leaves the partial file on disk; there is no
/// rollback. Concurrent uploads to the same name are not serialized and
/// the last writer wins at the file-handle level.
pub async fn upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Body,
) -> Result<&'static str, AppError> {
    if !state.control.write_allowed() {
        return Err(AppError::Forbidden);
    }
    if query.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    let target = state.storage.resolve(&query.name)?;

    state.control.set_busy(true);
    let outcome = receive(&target, body).await;
    state.control.set_busy(false);

    match outcome {
        Ok(written) => {
            info!(name = %query.name, bytes = written, "upload complete");
            state.control.notify();
            Ok("OK")
        }
        Err(err) => {
            warn!(name = %query.name, error = %err, "upload failed");
            Err(err)
        }
    }
}

async fn receive(target: &Path, body: Body) -> Result<u64, AppError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut file = File::create(target).await?;
    let mut stream = body.into_data_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| AppError::Internal(err.to_string()))?;
        if chunk.is_empty() {
            continue;
        }
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
