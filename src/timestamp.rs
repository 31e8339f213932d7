use tokio::time::{Duration, Instant};

/// One connection attempt seen by the dial layer. `end` stays unset when the
/// attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialAttempt {
    pub start: Instant,
    pub end: Option<Instant>,
}

impl DialAttempt {
    pub fn span(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }
}

/// Timing checkpoints of a single probe.
///
/// A fresh value is built for every probe; nothing here outlives the probe it
/// was recorded for. The dial happens inside the round trip, so the expected
/// order is `request_start <= connection_start <= connection_end <= request_end`.
#[derive(Debug, Clone, Default)]
pub struct Checkpoints {
    pub request_start: Option<Instant>,
    pub request_end: Option<Instant>,
    pub dials: Vec<DialAttempt>,
}

impl Checkpoints {
    pub fn started_at(request_start: Instant) -> Self {
        Self {
            request_start: Some(request_start),
            ..Self::default()
        }
    }

    pub fn connection_start(&self) -> Option<Instant> {
        self.dials.first().map(|d| d.start)
    }

    pub fn connection_end(&self) -> Option<Instant> {
        self.dials.iter().rev().find_map(|d| d.end)
    }

    /// True when a dial was started during this probe but never finished.
    pub fn dial_incomplete(&self) -> bool {
        self.dials.iter().any(|d| d.end.is_none())
    }

    /// Request start to request end.
    ///
    /// Panics if either checkpoint is missing: asking for a duration before the
    /// probe completed is a bug, not a runtime condition.
    pub fn total(&self) -> Duration {
        let (Some(start), Some(end)) = (self.request_start, self.request_end) else {
            panic!("total duration requested before the request checkpoints were set: {self:?}");
        };
        assert!(end >= start, "request ended before it started: {self:?}");
        end - start
    }

    /// Sum of completed dial spans, `None` when no dial completed (the
    /// connection came out of the pool).
    pub fn connection(&self) -> Option<Duration> {
        let mut spans = self.dials.iter().filter_map(DialAttempt::span).peekable();
        spans.peek()?;
        Some(spans.sum())
    }

    /// Checks the ordering invariant and freezes the checkpoints into timings.
    pub fn finish(self) -> ProbeTimings {
        let total = self.total();
        let connection_span = (self.connection_start(), self.connection_end());
        if let (Some(conn_start), Some(conn_end)) = connection_span {
            let request_start = self.request_start.unwrap_or(conn_start);
            let request_end = self.request_end.unwrap_or(conn_end);
            assert!(
                request_start <= conn_start && conn_start <= conn_end && conn_end <= request_end,
                "dial span escapes the request span: {self:?}"
            );
        }
        let connection = match self.connection() {
            Some(spent) => Connection::Fresh(spent),
            None => Connection::Reused,
        };
        ProbeTimings {
            total,
            connection,
            status: None,
            version: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    /// A new connection was dialed; time spent dialing.
    Fresh(Duration),
    /// No dial happened during the probe.
    Reused,
}

/// Immutable result of one successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTimings {
    pub total: Duration,
    pub connection: Connection,
    pub status: Option<u16>,
    pub version: Option<String>,
}

impl ProbeTimings {
    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn connection_duration(&self) -> Option<Duration> {
        match self.connection {
            Connection::Fresh(spent) => Some(spent),
            Connection::Reused => None,
        }
    }

    /// Time not spent dialing. Equal to the total when the connection was reused.
    pub fn request_processing(&self) -> Duration {
        match self.connection {
            Connection::Fresh(spent) => self
                .total
                .checked_sub(spent)
                .unwrap_or_else(|| panic!("connection time exceeds total: {self:?}")),
            Connection::Reused => self.total,
        }
    }

    pub fn with_response(mut self, status: u16, version: impl Into<String>) -> Self {
        self.status = Some(status);
        self.version = Some(version.into());
        self
    }
}
