//! LAN file drop server.
//!
//! Exposes a single directory over HTTP so browsers on the local network can
//! upload and download files. Clients authenticate with a 4-digit PIN shown
//! on the host, live change notifications go out over server-sent events,
//! and directory downloads are zipped on the fly.
//!
//! The crate is a library so a desktop shell can embed the server: build an
//! [`AppState`], keep a clone of its [`Control`] handle to flip permissions,
//! regenerate the PIN or watch the busy flag, and serve [`router`] on a
//! listener of its choosing. The `filedrop` binary is a headless runner
//! around the same pieces.

pub mod assets;
pub mod auth;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod server;
pub mod state;
pub mod storage;
pub mod upload;

pub use error::AppError;
pub use server::router;
pub use state::{AppState, Control, Permissions};
pub use storage::{EntryKind, FileEntry, Storage};
