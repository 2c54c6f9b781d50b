//! Periodic job runner.
//!
//! A `Scheduler` pulls ticks from a `Ticker` and runs one `ScheduledJob`
//! per tick. Each run is its own task: an error or a panic is logged and the
//! next tick runs as usual. There is no retry inside a tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{error, info};

/// Source of ticks. Returning `false` ends the schedule.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self) -> bool;
}

/// Ticks on a fixed period using tokio's timer.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// First tick fires immediately, then every `period`.
    pub fn immediate(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    /// First tick fires after one full `period`.
    pub fn delayed(period: Duration) -> Self {
        Self::starting_at(Instant::now() + period, period)
    }

    fn starting_at(start: Instant, period: Duration) -> Self {
        let mut interval = time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn run(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    Failed,
    Panicked,
}

pub struct Scheduler<T> {
    ticker: T,
    job: Arc<dyn ScheduledJob>,
}

impl<T: Ticker + 'static> Scheduler<T> {
    pub fn new(ticker: T, job: Arc<dyn ScheduledJob>) -> Self {
        Self { ticker, job }
    }

    /// Runs until the ticker is exhausted.
    pub async fn run(self) {
        let (_keep_open, shutdown) = oneshot::channel();
        self.run_until(shutdown).await;
    }

    /// Runs until the ticker is exhausted or `shutdown` resolves. A job that
    /// is already running is allowed to finish first.
    async fn run_until(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut tick = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                more = self.ticker.tick() => {
                    if !more {
                        break;
                    }
                }
            }
            tick += 1;
            run_job(Arc::clone(&self.job), tick).await;
        }
        info!("Scheduler for {} stopped", self.job.name());
    }

    /// Runs the scheduler in the background until the handle shuts it down.
    /// Dropping the handle also stops it.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.run_until(shutdown_rx));
        SchedulerHandle { shutdown_tx, task }
    }
}

/// One tick: runs `job` in its own task so a panic stays contained.
async fn run_job(job: Arc<dyn ScheduledJob>, tick: u64) -> TickOutcome {
    let name = job.name().to_string();
    info!("Running scheduled {name} (tick {tick})");

    match tokio::spawn(async move { job.run().await }).await {
        Ok(Ok(())) => {
            info!("Scheduled {name} completed successfully");
            TickOutcome::Completed
        }
        Ok(Err(e)) => {
            error!("Scheduled {name} failed: {e:#}");
            TickOutcome::Failed
        }
        Err(e) => {
            error!("Scheduled {name} panicked: {e}");
            TickOutcome::Panicked
        }
    }
}

pub struct SchedulerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops future ticks and waits for an in-flight job to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}
