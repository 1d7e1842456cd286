//! Signal handling for the command-line host
//!
//! `run` keeps scripts enabled until SIGTERM, SIGINT or Ctrl+C.

use tokio::signal;
use tracing::{info, warn};

/// Wait for shutdown signal (SIGTERM, SIGINT, or Ctrl+C)
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                signal::ctrl_c().await.ok();
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, disabling scripts...");
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, disabling scripts...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, disabling scripts..."),
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    }
}
