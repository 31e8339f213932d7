use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use anyhow::Result;

pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval_ms: u64) -> Result<Self> {
        if interval_ms == 0 {
            anyhow::bail!("scheduler interval must be greater than zero");
        }
        Ok(Self {
            interval: Duration::from_millis(interval_ms),
        })
    }

    /// Runs `job` once per tick until `shutdown` carries `true` or its sender
    /// goes away. The first tick fires one interval after start. A shutdown
    /// that is ready together with a tick wins.
    pub async fn run<J, F>(&self, mut job: J, mut shutdown: watch::Receiver<bool>) -> Result<()>
    where
        J: FnMut(Instant) -> F,
        F: std::future::Future<Output = ()>,
    {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            if *shutdown.borrow_and_update() {
                return Ok(());
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                at = ticker.tick() => job(at).await,
            }
        }
    }
}

/// Background task logging a tick while a batch is running.
pub struct Heartbeat {
    stop: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl Heartbeat {
    pub fn spawn(interval_ms: u64) -> Result<Self> {
        let scheduler = Scheduler::new(interval_ms)?;
        let started = Instant::now();
        let (stop, shutdown) = watch::channel(false);
        let task = tokio::spawn(async move {
            scheduler
                .run(
                    |at| async move {
                        tracing::info!("tick at +{:.3}s", (at - started).as_secs_f64());
                    },
                    shutdown,
                )
                .await
        });
        Ok(Self { stop, task })
    }

    /// Signals shutdown without waiting on any receiver and joins the task.
    pub async fn stop(self) -> Result<()> {
        self.stop.send_replace(true);
        self.task.await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Scheduler::new(0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_shutdown() {
        let scheduler = Scheduler::new(1_000).unwrap();
        let ticks = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);

        let counter = ticks.clone();
        let task = tokio::spawn(async move {
            scheduler
                .run(
                    move |_| {
                        let counter = counter.clone();
                        async move {
                            counter.fetch_add(1, Ordering::SeqCst);
                        }
                    },
                    rx,
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        tx.send_replace(true);
        task.await.unwrap().unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_stops_the_loop() {
        let scheduler = Scheduler::new(60_000).unwrap();
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(async move { scheduler.run(|_| async {}, rx).await });

        drop(tx);

        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn already_stopped_never_ticks() {
        let scheduler = Scheduler::new(10).unwrap();
        let (_tx, rx) = watch::channel(true);
        let mut ran = false;

        scheduler.run(|_| { ran = true; async {} }, rx).await.unwrap();

        assert!(!ran);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_stops_cleanly() {
        let heartbeat = Heartbeat::spawn(1_000).unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        heartbeat.stop().await.unwrap();
    }
}
