//! OS signal handling.

use crate::lifecycle::shutdown::Shutdown;

/// Wait for Ctrl-C, then trigger `shutdown`.
///
/// Returns early without triggering if the shutdown fires from elsewhere.
pub async fn shutdown_on_ctrl_c(shutdown: Shutdown) {
    let mut rx = shutdown.subscribe();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => {
                    tracing::info!("Ctrl-C received");
                    shutdown.trigger();
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
            }
        }
        _ = rx.recv() => {}
    }
}
