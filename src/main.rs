use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use filedrop::config::Args;
use filedrop::{router, AppState, Control, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let root = args.storage_root();
    tokio::fs::create_dir_all(&root)
        .await
        .with_context(|| format!("failed to create storage root {}", root.display()))?;
    let storage = Arc::new(Storage::new(root.clone()));

    let control = Control::new();
    info!(pin = %control.pin(), "session PIN");

    let state = AppState {
        storage,
        control: control.clone(),
    };

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(root = %root.display(), "serving on http://{addr}");
    if let Some(ip) = local_ip() {
        info!("reachable on the LAN at http://{ip}:{}", args.port);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedrop=info,tower_http=info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("received termination signal, shutting down");
}

// Best-effort LAN address for the startup banner. The connect call never
// sends a packet; it only selects the outbound interface.
fn local_ip() -> Option<IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    match addr.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(addr.ip()),
        _ => None,
    }
}
