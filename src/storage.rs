use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use axum::extract::{Query, State};
use axum::Json;
use humansize::{format_size, DECIMAL};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// The single directory tree the server is allowed to touch. Every
/// caller-supplied path is resolved against it before any filesystem call.
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    File,
}

/// One row of a directory listing, recomputed live on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: String,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a relative path (empty meaning the root itself) to an absolute
    /// path inside the storage root. Any `..` segment, absolute path, or
    /// resolution escaping the root is rejected before touching the
    /// filesystem.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, AppError> {
        let rel = rel.trim_start_matches('/');
        let candidate = Path::new(rel);
        if candidate.is_absolute()
            || candidate
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(AppError::Forbidden);
        }
        let joined = self.root.join(candidate);
        if !joined.starts_with(&self.root) {
            return Err(AppError::Forbidden);
        }
        Ok(joined)
    }

    /// Lists the immediate children of a directory. Hidden (dot-prefixed)
    /// entries are skipped; folders sort before files, each group
    /// case-insensitively ascending.
    pub async fn list(&self, rel: &str) -> Result<Vec<FileEntry>, AppError> {
        let dir = self.resolve(rel)?;
        let mut reader = fs::read_dir(&dir).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await?;
            let (kind, size) = if meta.is_dir() {
                (EntryKind::Folder, "--".to_string())
            } else {
                (EntryKind::File, format_size(meta.len(), DECIMAL))
            };
            entries.push(FileEntry { name, kind, size });
        }
        entries.sort_by(compare_entries);
        debug!(path = rel, count = entries.len(), "listed directory");
        Ok(entries)
    }
}

fn compare_entries(a: &FileEntry, b: &FileEntry) -> Ordering {
    match (a.kind, b.kind) {
        (EntryKind::Folder, EntryKind::File) => Ordering::Less,
        (EntryKind::File, EntryKind::Folder) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub path: String,
}

/// `GET /list?path=<rel>`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileEntry>>, AppError> {
    if !state.control.read_allowed() {
        return Err(AppError::Forbidden);
    }
    Ok(Json(state.storage.list(&query.path).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resolve_rejects_parent_segments() {
        let storage = Storage::new(PathBuf::from("/srv/drop"));
        assert!(matches!(
            storage.resolve("../secret"),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            storage.resolve("a/../../b"),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn resolve_strips_leading_slashes() {
        let storage = Storage::new(PathBuf::from("/srv/drop"));
        let resolved = storage.resolve("/notes.txt").unwrap();
        assert_eq!(resolved, Path::new("/srv/drop/notes.txt"));
        let resolved = storage.resolve("//etc/passwd").unwrap();
        assert!(resolved.starts_with("/srv/drop"));
    }

    #[test]
    fn resolve_maps_nested_paths_under_root() {
        let storage = Storage::new(PathBuf::from("/srv/drop"));
        let resolved = storage.resolve("sub/dir/file.bin").unwrap();
        assert!(resolved.starts_with("/srv/drop"));
        assert!(resolved.ends_with("sub/dir/file.bin"));
    }

    #[test]
    fn resolve_empty_path_is_the_root() {
        let storage = Storage::new(PathBuf::from("/srv/drop"));
        assert_eq!(storage.resolve("").unwrap(), storage.root());
    }

    #[tokio::test]
    async fn list_skips_hidden_and_orders_folders_first() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("b.txt"), b"bb").unwrap();
        std::fs::write(temp.path().join("A.txt"), b"a").unwrap();
        std::fs::write(temp.path().join(".hidden"), b"x").unwrap();
        std::fs::create_dir(temp.path().join("z")).unwrap();

        let storage = Storage::new(temp.path().to_path_buf());
        let entries = storage.list("").await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["z", "A.txt", "b.txt"]);
        assert_eq!(entries[0].kind, EntryKind::Folder);
        assert_eq!(entries[0].size, "--");
        assert_eq!(entries[1].kind, EntryKind::File);
    }

    #[tokio::test]
    async fn list_of_missing_directory_is_an_error() {
        let temp = tempdir().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        assert!(storage.list("nope").await.is_err());
    }

    #[test]
    fn entries_serialize_with_type_field() {
        let entry = FileEntry {
            name: "notes.txt".into(),
            kind: EntryKind::File,
            size: "5 B".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["name"], "notes.txt");
    }
}
