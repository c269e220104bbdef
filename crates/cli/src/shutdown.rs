use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Turns SIGINT/SIGTERM into cancellation of the running import.
///
/// The first signal cancels the token: the executor stops reading, drops the
/// batch it was assembling and commits what it already wrote. A second signal
/// exits at once with [`ExitCode::ShutdownRequested`], leaving PostgreSQL to
/// roll back the open transaction.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancel: CancellationToken,
    requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn register_handlers(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let name = next_signal().await;
            info!(signal = name, "Stopping import after the current record, signal again to quit now");
            this.request();

            let name = next_signal().await;
            warn!(signal = name, "Second signal, exiting without committing");
            std::process::exit(ExitCode::ShutdownRequested.as_i32());
        });
    }

    fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Waits for SIGINT or SIGTERM and returns its name. A handler that cannot be
/// installed never fires.
async fn next_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Process exit status: 0 completed, 1 fatal error, 130 interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    ShutdownRequested = 130,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_cancels_every_clone() {
        let shutdown = ShutdownCoordinator::new(CancellationToken::new());
        let token = shutdown.cancel_token();
        let clone = shutdown.clone();

        assert!(!shutdown.is_shutdown_requested());
        clone.request();

        assert!(shutdown.is_shutdown_requested());
        assert!(token.is_cancelled());
    }
}
