//! Common test utilities shared across integration tests.

use std::future::Future;
use std::time::Duration;

/// Configuration text for an engine with one fast job.
///
/// The tick interval is short so firing-related tests stay quick.
pub fn sample_config(name: &str, auto_start: bool) -> String {
    format!(
        "engine.name={}\n\
         engine.tickMillis=20\n\
         schedhub.autoStart={}\n\
         job.heartbeat.schedule=* * * * * *\n\
         job.heartbeat.description=Heartbeat job\n\
         listener.audit=logging\n",
        name, auto_start
    )
}

/// Minimal configuration text with no jobs.
pub fn minimal_config(name: &str) -> String {
    format!("engine.name={}\n", name)
}

/// Poll until `cond` returns true.
///
/// More reliable than fixed sleeps since timing can vary. Polls every 10ms
/// and panics if the timeout is reached first.
pub async fn wait_for<F, Fut>(mut cond: F, timeout: Duration, what: &str)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    loop {
        if cond().await {
            return;
        }
        if start.elapsed() > timeout {
            panic!("Timeout waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
