use socket2::SockRef;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration, Instant};

use super::{ProbeFailure, Prober};
use crate::timestamp::{Checkpoints, DialAttempt, ProbeTimings};

/// Reachability probe: the whole probe is the TCP dial.
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

impl Prober for TcpProber {
    async fn probe(&mut self, addr: &str) -> Result<ProbeTimings, ProbeFailure> {
        let start = Instant::now();
        let conn = timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ProbeFailure::Timeout)?
            .map_err(|e| ProbeFailure::Dial(e.to_string()))?;
        let end = Instant::now();

        // reset on close, no TIME_WAIT left behind per probe
        if let Err(e) = SockRef::from(&conn).set_linger(Some(Duration::ZERO)) {
            tracing::debug!("set_linger on {} failed: {}", addr, e);
        }
        drop(conn);

        let checkpoints = Checkpoints {
            request_start: Some(start),
            request_end: Some(end),
            dials: vec![DialAttempt { start, end: Some(end) }],
        };
        Ok(checkpoints.finish())
    }
}
