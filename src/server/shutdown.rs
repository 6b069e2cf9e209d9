// Graceful shutdown module
// Waits for in-flight connections once the listener has stopped accepting

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until `conn_counter` reaches zero or `grace` elapses.
///
/// Returns the number of connections still open when it gave up.
pub async fn drain_connections(conn_counter: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let active = conn_counter.load(Ordering::SeqCst);
        if active == 0 || tokio::time::Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(POLL_INTERVAL.min(grace)).await;
    }
}
