use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::{Layer, Service};

use crate::timestamp::DialAttempt;

#[derive(Debug, Default)]
struct DialLog {
    epoch: u64,
    attempts: Vec<DialAttempt>,
}

/// Shared sink for dial checkpoints.
///
/// Records are scoped to an epoch opened by [`DialRecorder::begin_probe`]. A
/// dial that completes after its probe was closed belongs to an old epoch and
/// is dropped instead of showing up in the next probe.
#[derive(Debug, Clone, Default)]
pub struct DialRecorder {
    log: Arc<Mutex<DialLog>>,
}

#[derive(Debug, Clone, Copy)]
struct DialTicket {
    epoch: u64,
    index: usize,
}

impl DialRecorder {
    fn lock(&self) -> MutexGuard<'_, DialLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a new epoch and forgets whatever the previous one recorded.
    pub fn begin_probe(&self) -> u64 {
        let mut log = self.lock();
        log.epoch += 1;
        log.attempts.clear();
        log.epoch
    }

    /// Closes `epoch` and hands back its attempts. Empty if the epoch is no
    /// longer current.
    pub fn finish_probe(&self, epoch: u64) -> Vec<DialAttempt> {
        let mut log = self.lock();
        if log.epoch != epoch {
            return Vec::new();
        }
        log.epoch += 1;
        std::mem::take(&mut log.attempts)
    }

    fn dial_started(&self) -> DialTicket {
        let mut log = self.lock();
        log.attempts.push(DialAttempt {
            start: Instant::now(),
            end: None,
        });
        DialTicket {
            epoch: log.epoch,
            index: log.attempts.len() - 1,
        }
    }

    fn dial_finished(&self, ticket: DialTicket) {
        let end = Instant::now();
        let mut log = self.lock();
        if log.epoch != ticket.epoch {
            tracing::debug!("dropping dial record from closed probe epoch {}", ticket.epoch);
            return;
        }
        if let Some(attempt) = log.attempts.get_mut(ticket.index) {
            attempt.end = Some(end);
        }
    }
}

/// Layer placed on the client's connector so every new connection is timed.
#[derive(Debug, Clone)]
pub struct DialTimingLayer {
    recorder: DialRecorder,
}

impl DialTimingLayer {
    pub fn new(recorder: DialRecorder) -> Self {
        Self { recorder }
    }
}

impl<S> Layer<S> for DialTimingLayer {
    type Service = DialTiming<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DialTiming {
            inner,
            recorder: self.recorder.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DialTiming<S> {
    inner: S,
    recorder: DialRecorder,
}

impl<S, R> Service<R> for DialTiming<S>
where
    S: Service<R>,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, target: R) -> Self::Future {
        let recorder = self.recorder.clone();
        let ticket = recorder.dial_started();
        let connecting = self.inner.call(target);
        Box::pin(async move {
            let conn = connecting.await?;
            recorder.dial_finished(ticket);
            Ok(conn)
        })
    }
}
