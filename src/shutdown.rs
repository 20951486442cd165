use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

/// Stops the continuous poll loop on SIGINT/SIGTERM
///
/// The in-flight tick always runs to completion; the loop checks the signal
/// between ticks.
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
    receiver: watch::Receiver<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self { sender, receiver }
    }

    /// Receiver handed to the loop
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.receiver.clone()
    }

    /// Request shutdown programmatically
    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }

    /// Install signal handlers that trigger shutdown
    pub fn install_signal_handlers(&self) -> Result<()> {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("Shutdown signal received, finishing current tick");
            let _ = sender.send(true);
        });
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
