//! TCP connect prober

use std::time::Duration;

use tokio::net::TcpStream;

use crate::domain::entities::ProbeRequest;
use crate::domain::repository::PortProber;

/// Probes by completing a TCP handshake, then closing without I/O
#[derive(Debug, Clone)]
pub struct TcpPortProber {
    timeout: Duration,
}

impl TcpPortProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TcpPortProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl PortProber for TcpPortProber {
    async fn probe(&self, request: &ProbeRequest) -> bool {
        let addr = (request.target.as_str(), request.port.get());

        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            // Error detail stays in operator logs only
            Ok(Err(e)) => {
                tracing::debug!(host = %request.target, port = request.port.get(), error = %e, "Probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(host = %request.target, port = request.port.get(), "Probe timed out");
                false
            }
        }
    }
}
