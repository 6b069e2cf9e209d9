// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Signal handler state
pub struct SignalHandler {
    /// Fired once when SIGTERM or SIGINT arrives
    pub shutdown: Arc<Notify>,
    /// Whether shutdown has been requested
    pub shutdown_requested: AtomicBool,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(Notify::new()),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    /// Record the request and wake the accept loop.
    ///
    /// `notify_one` stores a permit, so a loop that is not parked on
    /// `notified()` at this instant still sees it.
    pub fn request_shutdown(&self, source: &str) {
        if self.shutdown_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        logger::log_info(&format!("[SIGNAL] {source} received, initiating graceful shutdown"));
        self.shutdown.notify_one();
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Start signal handlers (Unix only)
///
/// A handler that cannot be registered is logged and skipped; the other
/// one still works.
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let register = |kind: SignalKind, name: &str| match signal(kind) {
            Ok(s) => Some(s),
            Err(e) => {
                logger::log_error(&format!("Failed to register {name} handler: {e}"));
                None
            }
        };
        let mut sigterm = register(SignalKind::terminate(), "SIGTERM");
        let mut sigint = register(SignalKind::interrupt(), "SIGINT");

        logger::log_info(&format!(
            "[SIGNAL] SIGTERM/SIGINT trigger graceful shutdown (pid {})",
            std::process::id()
        ));

        tokio::select! {
            Some(()) = recv(sigterm.as_mut()) => handler.request_shutdown("SIGTERM"),
            Some(()) = recv(sigint.as_mut()) => handler.request_shutdown("SIGINT"),
            else => logger::log_warning("Signal streams closed, shutdown only via process kill"),
        }
    });
}

/// Wait on an optional signal stream; an unregistered one never fires
#[cfg(unix)]
async fn recv(signal: Option<&mut tokio::signal::unix::Signal>) -> Option<()> {
    match signal {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}

/// Non-Unix fallback, only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => handler.request_shutdown("Ctrl+C"),
            Err(e) => logger::log_error(&format!("Failed to listen for Ctrl+C: {e}")),
        }
    });
}
