use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

/// CLI arguments and environment configuration.
#[derive(Parser, Debug)]
#[command(name = "filedrop", version, about = "Share a folder over the local network")]
pub struct Args {
    /// TCP port to listen on.
    #[arg(short, long, env = "FILEDROP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind.
    #[arg(short, long, env = "FILEDROP_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Directory to share. Defaults to a FileDrop folder inside the user's
    /// downloads directory; created on startup if missing.
    #[arg(short, long, env = "FILEDROP_ROOT")]
    pub root: Option<PathBuf>,
}

impl Args {
    pub fn storage_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(default_root)
    }
}

fn default_root() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("FileDrop")
}
