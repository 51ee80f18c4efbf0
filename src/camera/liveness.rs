use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

/// How often the background probe re-checks the camera, and how long it
/// waits for a single connect attempt before giving up.
const PROBE_INTERVAL: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Best-effort liveness flag for `GET /health`. A TCP connect to the
/// camera's host:port is not an ONVIF handshake, only a cheap signal that
/// something is listening; the health endpoint itself never blocks on it.
#[derive(Clone)]
pub struct LivenessProbe {
    connected: Arc<AtomicBool>,
}

impl LivenessProbe {
    pub fn new() -> Self {
        Self { connected: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Spawn the periodic probe against `camera_host:camera_port`. Runs
    /// until the process exits; a failed connect just leaves the flag
    /// false until the next tick.
    pub fn spawn(&self, camera_host: String, camera_port: u16) {
        let connected = self.connected.clone();
        tokio::spawn(async move {
            let addr = format!("{camera_host}:{camera_port}");
            loop {
                let reachable = matches!(timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await, Ok(Ok(_)));
                connected.store(reachable, Ordering::Relaxed);
                tokio::time::sleep(PROBE_INTERVAL).await;
            }
        });
    }
}

impl Default for LivenessProbe {
    fn default() -> Self {
        Self::new()
    }
}
