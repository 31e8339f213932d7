use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

use crate::timestamp::ProbeTimings;

pub mod dial;
pub mod http;
pub mod resolver;
pub mod tcp_connect;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    #[default]
    Http,
    TcpConnect,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Http => "http",
            ProbeKind::TcpConnect => "tcp_connect",
        }
    }
}

/// Why an endpoint was marked unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Resolution or connection establishment failed.
    Dial(String),
    /// The connection was up but the exchange failed (TLS, write, read, bad target).
    Request(String),
    /// The probe ran out of time.
    Timeout,
}

impl ProbeFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            ProbeFailure::Dial(_) => "dial",
            ProbeFailure::Request(_) => "request",
            ProbeFailure::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Dial(msg) => write!(f, "dial failed: {msg}"),
            ProbeFailure::Request(msg) => write!(f, "request failed: {msg}"),
            ProbeFailure::Timeout => f.write_str("timed out"),
        }
    }
}

impl std::error::Error for ProbeFailure {}

/// Outcome recorded for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Measurement {
    Available(ProbeTimings),
    Unavailable(ProbeFailure),
}

impl Measurement {
    pub fn timings(&self) -> Option<&ProbeTimings> {
        match self {
            Measurement::Available(timings) => Some(timings),
            Measurement::Unavailable(_) => None,
        }
    }

    pub fn duration(&self) -> Option<tokio::time::Duration> {
        self.timings().map(ProbeTimings::total)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Measurement::Available(_))
    }
}

impl From<Result<ProbeTimings, ProbeFailure>> for Measurement {
    fn from(outcome: Result<ProbeTimings, ProbeFailure>) -> Self {
        match outcome {
            Ok(timings) => Measurement::Available(timings),
            Err(failure) => Measurement::Unavailable(failure),
        }
    }
}

/// Something that can measure one endpoint at a time.
///
/// `&mut self` keeps a single instance from running two probes at once.
pub trait Prober {
    fn probe(
        &mut self,
        target: &str,
    ) -> impl Future<Output = Result<ProbeTimings, ProbeFailure>> + Send;
}
